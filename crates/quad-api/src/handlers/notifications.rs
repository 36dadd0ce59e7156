//! Handlers for `/notifications` — per-identity inbox.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;

use quad_core::store::FacilityStore;

use crate::{AppState, auth::CurrentUser, error::ApiError};

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub limit: Option<usize>,
}

/// `GET /notifications[?limit=N]` — unread first, newest first.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let notifications = state
    .store
    .list_notifications(
      user.identity.identity_id,
      params.limit.unwrap_or(DEFAULT_LIMIT),
    )
    .await
    .map_err(ApiError::store)?;
  let unread = state
    .store
    .unread_notification_count(user.identity.identity_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "notifications": notifications, "unread": unread })))
}

/// `POST /notifications/{id}/read` — owner only; 404 otherwise.
pub async fn mark_read<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(notification_id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let marked = state
    .store
    .mark_notification_read(notification_id, user.identity.identity_id)
    .await
    .map_err(ApiError::store)?;
  if !marked {
    return Err(ApiError::NotFound(format!(
      "notification {notification_id} not found"
    )));
  }
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /notifications/read-all`
pub async fn read_all<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let updated = state
    .store
    .mark_all_notifications_read(user.identity.identity_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "updated": updated })))
}

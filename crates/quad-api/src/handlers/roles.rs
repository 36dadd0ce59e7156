//! Handlers for `/roles/requests` — the role-change approval queue.

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;

use quad_core::{
  identity::Role,
  lifecycle,
  request::{Decision, RoleChangeRequest},
  store::FacilityStore,
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// `GET /roles/requests` — manager/admin only.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Vec<RoleChangeRequest>>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  user.require(Role::PRIVILEGED)?;
  let requests = state
    .store
    .list_role_requests()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(requests))
}

/// `POST /roles/requests/{id}/approve`
pub async fn approve<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(request_id): Path<i64>,
) -> Result<Json<RoleChangeRequest>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let request = lifecycle::decide_role_change(
    state.store.as_ref(),
    &user.profile,
    request_id,
    Decision::Approve,
    None,
  )
  .await?;
  tracing::info!(request_id, approver = user.identity.identity_id, "role request approved");
  Ok(Json(request))
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectBody {
  pub reason: Option<String>,
}

/// `POST /roles/requests/{id}/reject` — body: `{"reason":"..."}` (optional).
pub async fn reject<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(request_id): Path<i64>,
  body: Option<Json<RejectBody>>,
) -> Result<Json<RoleChangeRequest>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let reason = body.and_then(|Json(b)| b.reason);
  let request = lifecycle::decide_role_change(
    state.store.as_ref(),
    &user.profile,
    request_id,
    Decision::Reject,
    reason,
  )
  .await?;
  Ok(Json(request))
}

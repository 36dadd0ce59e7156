//! Handlers for `/admin` — the admin-only read surface.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use quad_core::{
  identity::Role,
  store::{AdminStats, FacilityStore},
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// `GET /admin/users` — every identity with its capability profile.
pub async fn users<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Value>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  user.require(&[Role::Admin])?;
  let users: Vec<Value> = state
    .store
    .list_identity_profiles()
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .map(|(identity, profile)| {
      json!({ "identity": identity, "profile": profile })
    })
    .collect();
  Ok(Json(json!({ "users": users })))
}

/// `GET /admin/stats` — role headcounts, fault load and queue depth.
pub async fn stats<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<AdminStats>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  user.require(&[Role::Admin])?;
  let stats = state.store.admin_stats().await.map_err(ApiError::store)?;
  Ok(Json(stats))
}

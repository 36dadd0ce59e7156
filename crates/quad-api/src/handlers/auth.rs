//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | Body: `{"email":..,"password":..}` |
//! | `POST` | `/auth/login` | Same body; 401 on bad credentials |
//! | `GET`  | `/auth/me` | Bearer token required |
//! | `POST` | `/auth/role` | Role selection / role-change request |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use quad_core::{
  identity::Role,
  lifecycle::{self, RoleChange, RoleChangeOutcome},
  store::FacilityStore,
};

use crate::{
  AppState,
  auth::{self, CurrentUser},
  error::ApiError,
};

#[derive(Debug, Deserialize)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<Credentials>,
) -> Result<Response, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if !body.email.contains('@') {
    return Err(ApiError::BadRequest("a valid email is required".into()));
  }
  if body.password.len() < 8 {
    return Err(ApiError::BadRequest(
      "password must be at least 8 characters".into(),
    ));
  }

  if state
    .store
    .find_identity_by_email(&body.email)
    .await
    .map_err(ApiError::store)?
    .is_some()
  {
    return Err(ApiError::Conflict("email is already registered".into()));
  }

  let hash = auth::hash_password(&body.password)?;
  let identity = state
    .store
    .create_identity(&body.email, &hash, false)
    .await
    .map_err(ApiError::store)?;
  state
    .store
    .ensure_profile(identity.identity_id)
    .await
    .map_err(ApiError::store)?;

  let token = state
    .tokens
    .issue(identity.identity_id)
    .map_err(ApiError::store)?;

  tracing::info!(identity_id = identity.identity_id, "registered identity");
  Ok(
    (
      StatusCode::CREATED,
      Json(json!({ "token": token, "identity": identity })),
    )
      .into_response(),
  )
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<Credentials>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let identity = state
    .store
    .find_identity_by_email(&body.email)
    .await
    .map_err(ApiError::store)?;

  // Same answer whether the email or the password is wrong.
  let Some(identity) = identity else {
    return Err(ApiError::Unauthenticated("invalid credentials".into()));
  };
  if !auth::verify_password(&body.password, &identity.password_hash) {
    return Err(ApiError::Unauthenticated("invalid credentials".into()));
  }

  let token = state
    .tokens
    .issue(identity.identity_id)
    .map_err(ApiError::store)?;

  Ok(Json(json!({ "token": token, "identity": identity })))
}

/// `GET /auth/me`
pub async fn me<S>(
  _state: State<AppState<S>>,
  user: CurrentUser,
) -> Json<serde_json::Value>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Json(json!({ "identity": user.identity, "profile": user.profile }))
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
  pub role:            Role,
  #[serde(default)]
  pub reason:          String,
  pub manager_subtype: Option<String>,
}

/// `POST /auth/role` — select or request a role.
///
/// Immediate grants answer 200 with the updated profile; everything else
/// queues a request and answers 202.
pub async fn set_role<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<RoleBody>,
) -> Result<Response, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let outcome = lifecycle::submit_role_change(
    state.store.as_ref(),
    &user.identity,
    &user.profile,
    RoleChange {
      role:            body.role,
      reason:          body.reason,
      manager_subtype: body.manager_subtype,
    },
  )
  .await?;

  Ok(match outcome {
    RoleChangeOutcome::Applied(profile) => (
      StatusCode::OK,
      Json(json!({ "status": "applied", "profile": profile })),
    )
      .into_response(),
    RoleChangeOutcome::Queued(request) => (
      StatusCode::ACCEPTED,
      Json(json!({ "status": "queued", "request": request })),
    )
      .into_response(),
  })
}

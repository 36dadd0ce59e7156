//! Handlers for `/bookings` — room-booking requests and their decisions.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Deserialize;

use quad_core::{
  approval, gateway,
  identity::Role,
  request::{Decision, NewRoomBookingRequest, RoomBookingRequest},
  store::FacilityStore,
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// `POST /bookings` — students and lecturers only; always queued.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(input): Json<NewRoomBookingRequest>,
) -> Result<Response, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let booking = gateway::submit_booking(
    state.store.as_ref(),
    &user.identity,
    &user.profile,
    input,
  )
  .await?;
  Ok((StatusCode::CREATED, Json(booking)).into_response())
}

/// `GET /bookings` — managers/admins see every booking, everyone else
/// only their own.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Vec<RoomBookingRequest>>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let owner = if user.profile.role.is_privileged() {
    None
  } else {
    Some(user.identity.identity_id)
  };
  let bookings = state
    .store
    .list_bookings(owner)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(bookings))
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveBody {
  /// Room to assign instead of the one the booking asked for.
  pub resource_id: Option<i64>,
}

/// `POST /bookings/{id}/approve` — body: `{"resource_id":<id>}` (optional).
pub async fn approve<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(booking_id): Path<i64>,
  body: Option<Json<ApproveBody>>,
) -> Result<Json<RoomBookingRequest>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  user.require(Role::PRIVILEGED)?;
  let assigned = body.and_then(|Json(b)| b.resource_id);
  let booking = approval::decide_booking(
    state.store.as_ref(),
    &user.profile,
    booking_id,
    Decision::Approve,
    assigned,
    None,
  )
  .await?;
  tracing::info!(booking_id, approver = user.identity.identity_id, "booking approved");
  Ok(Json(booking))
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectBody {
  pub reason: Option<String>,
}

/// `POST /bookings/{id}/reject`
pub async fn reject<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(booking_id): Path<i64>,
  body: Option<Json<RejectBody>>,
) -> Result<Json<RoomBookingRequest>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let reason = body.and_then(|Json(b)| b.reason);
  let booking = approval::decide_booking(
    state.store.as_ref(),
    &user.profile,
    booking_id,
    Decision::Reject,
    None,
    reason,
  )
  .await?;
  Ok(Json(booking))
}

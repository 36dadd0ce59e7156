//! The approval processor — applies or discards queued requests.
//!
//! Every decide operation is single-writer, single-transition: the store
//! moves a request from pending to a terminal state at most once, and the
//! coupled side-effect writes (resource fields, availability flag) happen
//! in the same transaction. A second decision fails with `AlreadyDecided`.

use crate::{
  Error, Result,
  identity::{CapabilityProfile, Role},
  lifecycle::require_role,
  notify::NewNotification,
  request::{Decision, ResourceUpdateRequest, RoomBookingRequest},
  resource::ManagedResource,
  store::{Decide, FacilityStore},
};

/// Decide a pending resource-update request.
///
/// On approval the proposed values are copied onto the target resource —
/// created from the proposal when the request targets a resource that does
/// not exist yet. On rejection the target is untouched and the reason is
/// recorded.
pub async fn decide_resource_update<S: FacilityStore>(
  store: &S,
  approver: &CapabilityProfile,
  request_id: i64,
  decision: Decision,
  rejection_reason: Option<String>,
) -> Result<(ResourceUpdateRequest, Option<ManagedResource>)> {
  require_role(approver, Role::PRIVILEGED)?;

  match store
    .decide_update_request(request_id, decision, approver.identity_id, rejection_reason)
    .await
    .map_err(Error::store)?
  {
    Decide::Applied(outcome) => Ok(outcome),
    Decide::NotFound => Err(Error::RequestNotFound(request_id)),
    Decide::AlreadyDecided => Err(Error::AlreadyDecided(request_id)),
  }
}

/// Decide a pending room-booking request.
///
/// On approval the assigned room (an explicit `assigned_resource`, or the
/// one already referenced by the booking) always ends up unavailable. The
/// requester is notified of either outcome.
pub async fn decide_booking<S: FacilityStore>(
  store: &S,
  approver: &CapabilityProfile,
  booking_id: i64,
  decision: Decision,
  assigned_resource: Option<i64>,
  rejection_reason: Option<String>,
) -> Result<RoomBookingRequest> {
  require_role(approver, Role::PRIVILEGED)?;

  if let Some(id) = assigned_resource
    && store.get_resource(id).await.map_err(Error::store)?.is_none()
  {
    return Err(Error::ResourceNotFound(id));
  }

  let booking = match store
    .decide_booking(
      booking_id,
      decision,
      approver.identity_id,
      assigned_resource,
      rejection_reason.clone(),
    )
    .await
    .map_err(Error::store)?
  {
    Decide::Applied(booking) => booking,
    Decide::NotFound => return Err(Error::RequestNotFound(booking_id)),
    Decide::AlreadyDecided => return Err(Error::AlreadyDecided(booking_id)),
  };

  let notification = match decision {
    Decision::Approve => NewNotification::new(
      booking.requested_by,
      "Room Request Approved",
      format!(
        "Your request for a {} on {} has been approved.",
        booking.kind, booking.date
      ),
      Some("/room-requests"),
    ),
    Decision::Reject => NewNotification::new(
      booking.requested_by,
      "Room Request Rejected",
      format!(
        "Your request for a {} on {} was rejected{}",
        booking.kind,
        booking.date,
        match rejection_reason.as_deref() {
          Some(reason) if !reason.is_empty() => format!(": {reason}"),
          _ => ".".to_string(),
        }
      ),
      Some("/room-requests"),
    ),
  };
  store
    .create_notification(notification)
    .await
    .map_err(Error::store)?;

  Ok(booking)
}

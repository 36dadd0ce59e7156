//! The mutation gateway — the dual-path write policy.
//!
//! Every writable resource goes through the same decision: privileged
//! callers mutate directly, everyone else gets a pending request queued
//! for approval. Callers always learn which path ran.

use crate::{
  Error, Result,
  identity::{CapabilityProfile, Identity, Role},
  lifecycle::require_role,
  notify::fan_out,
  request::{
    NewResourceUpdateRequest, NewRoomBookingRequest, ResourceUpdateRequest,
    RoomBookingRequest,
  },
  resource::{ManagedResource, ResourceKind, ResourceWrite},
  store::FacilityStore,
};

/// The two observably different results of a gated mutation.
#[derive(Debug, Clone)]
pub enum MutationOutcome<T, R> {
  /// The caller was privileged; the mutation was applied directly.
  Applied(T),
  /// The mutation was queued as a pending request for later approval.
  Queued(R),
}

// ─── Resource writes ─────────────────────────────────────────────────────────

/// Write to a managed resource through the dual-path policy.
///
/// Managers and admins apply directly — creating the resource from the
/// payload when `target` is absent. Everyone else gets a pending
/// [`ResourceUpdateRequest`] that captures the full proposed write
/// (including name/capacity, so approval can create a missing target).
pub async fn write_resource<S: FacilityStore>(
  store: &S,
  caller: &CapabilityProfile,
  kind: ResourceKind,
  target: Option<i64>,
  write: ResourceWrite,
) -> Result<MutationOutcome<ManagedResource, ResourceUpdateRequest>> {
  if write.is_empty() {
    return Err(Error::InvalidInput("empty resource write".into()));
  }

  if caller.role.is_privileged() {
    let resource = match target {
      Some(id) => match store
        .update_resource(id, write)
        .await
        .map_err(Error::store)?
      {
        Some(resource) => resource,
        None => return Err(Error::ResourceNotFound(id)),
      },
      None => {
        if write.name.as_deref().unwrap_or("").is_empty() {
          return Err(Error::InvalidInput("resource name is required".into()));
        }
        store
          .create_resource(kind, write)
          .await
          .map_err(Error::store)?
      }
    };
    return Ok(MutationOutcome::Applied(resource));
  }

  // Unprivileged path: verify an explicit target exists, then queue.
  if let Some(id) = target
    && store.get_resource(id).await.map_err(Error::store)?.is_none()
  {
    return Err(Error::ResourceNotFound(id));
  }

  let request = store
    .create_update_request(NewResourceUpdateRequest {
      resource_id: target,
      kind,
      requested_by: caller.identity_id,
      proposed: write,
    })
    .await
    .map_err(Error::store)?;

  Ok(MutationOutcome::Queued(request))
}

// ─── Bookings ────────────────────────────────────────────────────────────────

/// Submit a room-booking request.
///
/// Only students and lecturers create bookings; the booking itself is
/// always queued — approval is a manager/admin operation. Every
/// manager/admin is notified of the new request.
pub async fn submit_booking<S: FacilityStore>(
  store: &S,
  identity: &Identity,
  caller: &CapabilityProfile,
  input: NewRoomBookingRequest,
) -> Result<RoomBookingRequest> {
  require_role(caller, Role::BOOKERS)?;

  if input.end_time <= input.start_time {
    return Err(Error::InvalidInput(
      "booking end time must be after start time".into(),
    ));
  }
  if let Some(id) = input.resource_id
    && store.get_resource(id).await.map_err(Error::store)?.is_none()
  {
    return Err(Error::ResourceNotFound(id));
  }

  let kind = input.kind;
  let date = input.date;
  let booking = store
    .create_booking(identity.identity_id, input)
    .await
    .map_err(Error::store)?;

  fan_out(
    store,
    Role::PRIVILEGED,
    "New Room Request",
    &format!("{} requested a {kind} for {date}.", identity.email),
    Some("/request-approvals"),
  )
  .await?;

  Ok(booking)
}

//! The role lifecycle state machine.
//!
//! Roles only ever change here: either a superuser direct grant or an
//! approved [`RoleChangeRequest`](crate::request::RoleChangeRequest).
//! Everything else in the system reads roles, never writes them.

use crate::{
  Error, Result,
  identity::{CapabilityProfile, Identity, Role},
  notify::{NewNotification, fan_out},
  request::{Decision, NewRoleChangeRequest, RoleChangeRequest},
  store::{Decide, FacilityStore},
};

// ─── Guard ───────────────────────────────────────────────────────────────────

/// The single role guard every gated operation goes through.
/// Returns `Forbidden` unless the profile's role is in `allowed`.
pub fn require_role(profile: &CapabilityProfile, allowed: &[Role]) -> Result<()> {
  if allowed.contains(&profile.role) {
    Ok(())
  } else {
    Err(Error::Forbidden(format!(
      "role {} lacks the capability for this operation",
      profile.role
    )))
  }
}

// ─── Submission ──────────────────────────────────────────────────────────────

/// A role change proposed by the identity itself.
#[derive(Debug, Clone)]
pub struct RoleChange {
  pub role:            Role,
  pub reason:          String,
  pub manager_subtype: Option<String>,
}

/// What happened to a submitted role change.
#[derive(Debug, Clone)]
pub enum RoleChangeOutcome {
  /// The role was granted immediately; no request was queued.
  Applied(CapabilityProfile),
  /// A pending request was created; the role is unchanged until approval.
  Queued(RoleChangeRequest),
}

/// Submit a role change for `identity`, currently holding `profile`.
///
/// Policy, evaluated in order:
/// 1. a superuser requesting `admin` is granted immediately;
/// 2. an identity already holding a confirmed non-student role may not
///    change roles again (duplicate pending submissions surface as the
///    "pending" conflict instead);
/// 3. first-time selection of `student` applies immediately — it is the
///    lowest privilege and needs no approval;
/// 4. a duplicate pending (identity, role) submission is rejected, not
///    queued twice;
/// 5. otherwise a pending request is created and every manager/admin is
///    notified.
pub async fn submit_role_change<S: FacilityStore>(
  store: &S,
  identity: &Identity,
  profile: &CapabilityProfile,
  change: RoleChange,
) -> Result<RoleChangeOutcome> {
  // Rule 1: superuser self-grant of admin bypasses the queue.
  if change.role == Role::Admin && identity.is_superuser {
    let profile = store
      .set_role(identity.identity_id, Role::Admin, None)
      .await
      .map_err(Error::store)?;
    return Ok(RoleChangeOutcome::Applied(profile));
  }

  // Rule 2: confirmed non-student roles are locked.
  if profile.role != Role::Student {
    let pending = store
      .has_pending_role_request(identity.identity_id, change.role)
      .await
      .map_err(Error::store)?;
    if pending {
      return Err(Error::DuplicatePending { role: change.role });
    }
    return Err(Error::RoleLocked(profile.role));
  }

  // Rule 3: student self-assignment is immediate.
  if change.role == Role::Student {
    let profile = store
      .set_role(identity.identity_id, Role::Student, None)
      .await
      .map_err(Error::store)?;
    return Ok(RoleChangeOutcome::Applied(profile));
  }

  // Rule 4: at most one outstanding request per role per identity.
  if store
    .has_pending_role_request(identity.identity_id, change.role)
    .await
    .map_err(Error::store)?
  {
    return Err(Error::DuplicatePending { role: change.role });
  }

  // Rule 5: queue and fan out.
  if let Some(subtype) = change.manager_subtype.as_deref() {
    store
      .set_manager_subtype(identity.identity_id, subtype)
      .await
      .map_err(Error::store)?;
  }

  let created = store
    .create_role_request(NewRoleChangeRequest {
      identity_id:     identity.identity_id,
      requested_role:  change.role,
      manager_subtype: change.manager_subtype.clone(),
      reason:          change.reason,
    })
    .await
    .map_err(Error::store)?;
  let Some(request) = created else {
    // Lost the race against an identical submission.
    return Err(Error::DuplicatePending { role: change.role });
  };

  fan_out(
    store,
    Role::PRIVILEGED,
    "New Role Request",
    &format!("{} requested to be a {}.", identity.email, change.role),
    Some("/manager-requests"),
  )
  .await?;

  Ok(RoleChangeOutcome::Queued(request))
}

// ─── Decision ────────────────────────────────────────────────────────────────

/// Decide a pending role-change request.
///
/// The approver must hold manager or admin. The pending→terminal flip and
/// (on approval) the profile role write are atomic in the store; a second
/// decision on the same request fails with `AlreadyDecided`.
pub async fn decide_role_change<S: FacilityStore>(
  store: &S,
  approver: &CapabilityProfile,
  request_id: i64,
  decision: Decision,
  rejection_reason: Option<String>,
) -> Result<RoleChangeRequest> {
  require_role(approver, Role::PRIVILEGED)?;

  let decided = store
    .decide_role_request(
      request_id,
      decision,
      approver.identity_id,
      rejection_reason.clone(),
    )
    .await
    .map_err(Error::store)?;

  let request = match decided {
    Decide::Applied(request) => request,
    Decide::NotFound => return Err(Error::RequestNotFound(request_id)),
    Decide::AlreadyDecided => return Err(Error::AlreadyDecided(request_id)),
  };

  let notification = match decision {
    Decision::Approve => NewNotification::new(
      request.identity_id,
      "Role Request Approved",
      format!(
        "Your request for the {} role has been approved.",
        request.requested_role
      ),
      Some("/dashboard"),
    ),
    Decision::Reject => NewNotification::new(
      request.identity_id,
      "Role Request Rejected",
      format!(
        "Your request for the {} role was rejected{}",
        request.requested_role,
        match rejection_reason.as_deref() {
          Some(reason) if !reason.is_empty() => format!(": {reason}"),
          _ => ".".to_string(),
        }
      ),
      Some("/role-select"),
    ),
  };
  store
    .create_notification(notification)
    .await
    .map_err(Error::store)?;

  Ok(request)
}

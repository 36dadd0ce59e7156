//! Queued request entities and their shared decision lifecycle.
//!
//! All three request families (role change, resource update, room booking)
//! share one lifecycle: created `pending`, moved exactly once to a terminal
//! `approved` or `rejected` state by a privileged decider. Terminal states
//! are immutable; a second decision attempt must fail, never overwrite.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  identity::Role,
  resource::{ResourceKind, ResourceWrite},
};

// ─── Lifecycle ───────────────────────────────────────────────────────────────

/// Where a request sits in its decision lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
  Pending,
  Approved,
  Rejected,
}

impl RequestStatus {
  pub fn is_pending(self) -> bool { matches!(self, RequestStatus::Pending) }

  pub fn as_str(self) -> &'static str {
    match self {
      RequestStatus::Pending => "pending",
      RequestStatus::Approved => "approved",
      RequestStatus::Rejected => "rejected",
    }
  }
}

/// The outcome a decider selects for a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
  Approve,
  Reject,
}

impl Decision {
  pub fn terminal_status(self) -> RequestStatus {
    match self {
      Decision::Approve => RequestStatus::Approved,
      Decision::Reject => RequestStatus::Rejected,
    }
  }
}

// ─── Role change ─────────────────────────────────────────────────────────────

/// A queued request to change an identity's role.
/// At most one may be pending per (identity, requested role).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleChangeRequest {
  pub request_id:       i64,
  pub identity_id:      i64,
  pub requested_role:   Role,
  pub manager_subtype:  Option<String>,
  pub reason:           String,
  pub status:           RequestStatus,
  pub approved_by:      Option<i64>,
  pub rejection_reason: Option<String>,
  pub decided_at:       Option<DateTime<Utc>>,
  pub created_at:       DateTime<Utc>,
}

/// Input for creating a [`RoleChangeRequest`].
#[derive(Debug, Clone)]
pub struct NewRoleChangeRequest {
  pub identity_id:     i64,
  pub requested_role:  Role,
  pub manager_subtype: Option<String>,
  pub reason:          String,
}

// ─── Resource update ─────────────────────────────────────────────────────────

/// A queued, unprivileged write against a managed resource.
///
/// `resource_id = None` means the target does not exist yet; the proposed
/// write carries the name/capacity needed to create it on approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceUpdateRequest {
  pub request_id:       i64,
  pub resource_id:      Option<i64>,
  pub kind:             ResourceKind,
  pub requested_by:     i64,
  pub proposed:         ResourceWrite,
  pub status:           RequestStatus,
  pub approved_by:      Option<i64>,
  pub rejection_reason: Option<String>,
  pub decided_at:       Option<DateTime<Utc>>,
  pub created_at:       DateTime<Utc>,
}

/// Input for creating a [`ResourceUpdateRequest`].
#[derive(Debug, Clone)]
pub struct NewResourceUpdateRequest {
  pub resource_id:  Option<i64>,
  pub kind:         ResourceKind,
  pub requested_by: i64,
  pub proposed:     ResourceWrite,
}

// ─── Room booking ────────────────────────────────────────────────────────────

/// A queued request to book a lab or classroom for a time window.
/// On approval the assigned resource's availability flag is flipped off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomBookingRequest {
  pub booking_id:         i64,
  pub requested_by:       i64,
  pub kind:               ResourceKind,
  pub resource_id:        Option<i64>,
  pub purpose:            String,
  pub expected_attendees: i64,
  pub date:               NaiveDate,
  pub start_time:         NaiveTime,
  pub end_time:           NaiveTime,
  pub status:             RequestStatus,
  pub approved_by:        Option<i64>,
  pub rejection_reason:   Option<String>,
  pub decided_at:         Option<DateTime<Utc>>,
  pub created_at:         DateTime<Utc>,
}

/// Input for creating a [`RoomBookingRequest`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRoomBookingRequest {
  pub kind:               ResourceKind,
  pub resource_id:        Option<i64>,
  pub purpose:            String,
  pub expected_attendees: i64,
  pub date:               NaiveDate,
  pub start_time:         NaiveTime,
  pub end_time:           NaiveTime,
}

//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings (lexicographically
//! comparable for same-format UTC values). The proposed write on an update
//! request is stored as compact JSON. Enums are stored as their lowercase
//! wire forms.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use quad_core::{
  event::{EventClass, EventRecord, EventStatus, Severity},
  identity::{CapabilityProfile, Identity, Role},
  notify::Notification,
  request::{
    RequestStatus, ResourceUpdateRequest, RoleChangeRequest, RoomBookingRequest,
  },
  resource::{ManagedResource, ResourceKind},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── Date / time of day ──────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

pub fn encode_time(t: NaiveTime) -> String { t.format("%H:%M:%S").to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, "%H:%M:%S")
    .map_err(|e| Error::Decode(format!("time {s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "student" => Ok(Role::Student),
    "lecturer" => Ok(Role::Lecturer),
    "manager" => Ok(Role::Manager),
    "admin" => Ok(Role::Admin),
    other => Err(Error::Decode(format!("unknown role: {other:?}"))),
  }
}

pub fn decode_request_status(s: &str) -> Result<RequestStatus> {
  match s {
    "pending" => Ok(RequestStatus::Pending),
    "approved" => Ok(RequestStatus::Approved),
    "rejected" => Ok(RequestStatus::Rejected),
    other => Err(Error::Decode(format!("unknown request status: {other:?}"))),
  }
}

pub fn decode_resource_kind(s: &str) -> Result<ResourceKind> {
  match s {
    "library" => Ok(ResourceKind::Library),
    "lab" => Ok(ResourceKind::Lab),
    "classroom" => Ok(ResourceKind::Classroom),
    other => Err(Error::Decode(format!("unknown resource kind: {other:?}"))),
  }
}

pub fn decode_event_class(s: &str) -> Result<EventClass> {
  match s {
    "fault" => Ok(EventClass::Fault),
    "overload" => Ok(EventClass::Overload),
    other => Err(Error::Decode(format!("unknown event class: {other:?}"))),
  }
}

pub fn decode_severity(s: &str) -> Result<Severity> {
  match s {
    "low" => Ok(Severity::Low),
    "medium" => Ok(Severity::Medium),
    "high" => Ok(Severity::High),
    "critical" => Ok(Severity::Critical),
    other => Err(Error::Decode(format!("unknown severity: {other:?}"))),
  }
}

pub fn decode_event_status(s: &str) -> Result<EventStatus> {
  match s {
    "open" => Ok(EventStatus::Open),
    "in_progress" => Ok(EventStatus::InProgress),
    "resolved" => Ok(EventStatus::Resolved),
    other => Err(Error::Decode(format!("unknown event status: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `identities` row.
pub struct RawIdentity {
  pub identity_id:   i64,
  pub email:         String,
  pub password_hash: String,
  pub is_superuser:  bool,
  pub created_at:    String,
}

impl RawIdentity {
  pub const COLUMNS: &'static str =
    "identity_id, email, password_hash, is_superuser, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      identity_id:   row.get(0)?,
      email:         row.get(1)?,
      password_hash: row.get(2)?,
      is_superuser:  row.get(3)?,
      created_at:    row.get(4)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      identity_id:   self.identity_id,
      email:         self.email,
      password_hash: self.password_hash,
      is_superuser:  self.is_superuser,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `profiles` row.
pub struct RawProfile {
  pub identity_id:     i64,
  pub role:            String,
  pub manager_subtype: Option<String>,
  pub updated_at:      String,
}

impl RawProfile {
  pub const COLUMNS: &'static str =
    "identity_id, role, manager_subtype, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      identity_id:     row.get(0)?,
      role:            row.get(1)?,
      manager_subtype: row.get(2)?,
      updated_at:      row.get(3)?,
    })
  }

  pub fn into_profile(self) -> Result<CapabilityProfile> {
    Ok(CapabilityProfile {
      identity_id:     self.identity_id,
      role:            decode_role(&self.role)?,
      manager_subtype: self.manager_subtype,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `role_requests` row.
pub struct RawRoleRequest {
  pub request_id:       i64,
  pub identity_id:      i64,
  pub requested_role:   String,
  pub manager_subtype:  Option<String>,
  pub reason:           String,
  pub status:           String,
  pub approved_by:      Option<i64>,
  pub rejection_reason: Option<String>,
  pub decided_at:       Option<String>,
  pub created_at:       String,
}

impl RawRoleRequest {
  pub const COLUMNS: &'static str = "request_id, identity_id, requested_role, \
     manager_subtype, reason, status, approved_by, rejection_reason, \
     decided_at, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      request_id:       row.get(0)?,
      identity_id:      row.get(1)?,
      requested_role:   row.get(2)?,
      manager_subtype:  row.get(3)?,
      reason:           row.get(4)?,
      status:           row.get(5)?,
      approved_by:      row.get(6)?,
      rejection_reason: row.get(7)?,
      decided_at:       row.get(8)?,
      created_at:       row.get(9)?,
    })
  }

  pub fn into_request(self) -> Result<RoleChangeRequest> {
    Ok(RoleChangeRequest {
      request_id:       self.request_id,
      identity_id:      self.identity_id,
      requested_role:   decode_role(&self.requested_role)?,
      manager_subtype:  self.manager_subtype,
      reason:           self.reason,
      status:           decode_request_status(&self.status)?,
      approved_by:      self.approved_by,
      rejection_reason: self.rejection_reason,
      decided_at:       self.decided_at.as_deref().map(decode_dt).transpose()?,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `resources` row.
pub struct RawResource {
  pub resource_id:       i64,
  pub kind:              String,
  pub name:              String,
  pub building:          Option<String>,
  pub room:              Option<String>,
  pub max_capacity:      i64,
  pub current_occupancy: i64,
  pub is_available:      bool,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawResource {
  pub const COLUMNS: &'static str = "resource_id, kind, name, building, room, \
     max_capacity, current_occupancy, is_available, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      resource_id:       row.get(0)?,
      kind:              row.get(1)?,
      name:              row.get(2)?,
      building:          row.get(3)?,
      room:              row.get(4)?,
      max_capacity:      row.get(5)?,
      current_occupancy: row.get(6)?,
      is_available:      row.get(7)?,
      created_at:        row.get(8)?,
      updated_at:        row.get(9)?,
    })
  }

  pub fn into_resource(self) -> Result<ManagedResource> {
    Ok(ManagedResource {
      resource_id:       self.resource_id,
      kind:              decode_resource_kind(&self.kind)?,
      name:              self.name,
      building:          self.building,
      room:              self.room,
      max_capacity:      self.max_capacity,
      current_occupancy: self.current_occupancy,
      is_available:      self.is_available,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from an `update_requests` row.
pub struct RawUpdateRequest {
  pub request_id:       i64,
  pub resource_id:      Option<i64>,
  pub kind:             String,
  pub requested_by:     i64,
  pub proposed:         String,
  pub status:           String,
  pub approved_by:      Option<i64>,
  pub rejection_reason: Option<String>,
  pub decided_at:       Option<String>,
  pub created_at:       String,
}

impl RawUpdateRequest {
  pub const COLUMNS: &'static str = "request_id, resource_id, kind, \
     requested_by, proposed, status, approved_by, rejection_reason, \
     decided_at, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      request_id:       row.get(0)?,
      resource_id:      row.get(1)?,
      kind:             row.get(2)?,
      requested_by:     row.get(3)?,
      proposed:         row.get(4)?,
      status:           row.get(5)?,
      approved_by:      row.get(6)?,
      rejection_reason: row.get(7)?,
      decided_at:       row.get(8)?,
      created_at:       row.get(9)?,
    })
  }

  pub fn into_request(self) -> Result<ResourceUpdateRequest> {
    Ok(ResourceUpdateRequest {
      request_id:       self.request_id,
      resource_id:      self.resource_id,
      kind:             decode_resource_kind(&self.kind)?,
      requested_by:     self.requested_by,
      proposed:         serde_json::from_str(&self.proposed)?,
      status:           decode_request_status(&self.status)?,
      approved_by:      self.approved_by,
      rejection_reason: self.rejection_reason,
      decided_at:       self.decided_at.as_deref().map(decode_dt).transpose()?,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `bookings` row.
pub struct RawBooking {
  pub booking_id:         i64,
  pub requested_by:       i64,
  pub kind:               String,
  pub resource_id:        Option<i64>,
  pub purpose:            String,
  pub expected_attendees: i64,
  pub date:               String,
  pub start_time:         String,
  pub end_time:           String,
  pub status:             String,
  pub approved_by:        Option<i64>,
  pub rejection_reason:   Option<String>,
  pub decided_at:         Option<String>,
  pub created_at:         String,
}

impl RawBooking {
  pub const COLUMNS: &'static str = "booking_id, requested_by, kind, \
     resource_id, purpose, expected_attendees, date, start_time, end_time, \
     status, approved_by, rejection_reason, decided_at, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      booking_id:         row.get(0)?,
      requested_by:       row.get(1)?,
      kind:               row.get(2)?,
      resource_id:        row.get(3)?,
      purpose:            row.get(4)?,
      expected_attendees: row.get(5)?,
      date:               row.get(6)?,
      start_time:         row.get(7)?,
      end_time:           row.get(8)?,
      status:             row.get(9)?,
      approved_by:        row.get(10)?,
      rejection_reason:   row.get(11)?,
      decided_at:         row.get(12)?,
      created_at:         row.get(13)?,
    })
  }

  pub fn into_booking(self) -> Result<RoomBookingRequest> {
    Ok(RoomBookingRequest {
      booking_id:         self.booking_id,
      requested_by:       self.requested_by,
      kind:               decode_resource_kind(&self.kind)?,
      resource_id:        self.resource_id,
      purpose:            self.purpose,
      expected_attendees: self.expected_attendees,
      date:               decode_date(&self.date)?,
      start_time:         decode_time(&self.start_time)?,
      end_time:           decode_time(&self.end_time)?,
      status:             decode_request_status(&self.status)?,
      approved_by:        self.approved_by,
      rejection_reason:   self.rejection_reason,
      decided_at:         self.decided_at.as_deref().map(decode_dt).transpose()?,
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from an `events` row.
pub struct RawEvent {
  pub event_id:        i64,
  pub class:           String,
  pub reported_by:     Option<i64>,
  pub title:           String,
  pub description:     String,
  pub building:        String,
  pub room:            String,
  pub label:           String,
  pub severity:        Option<String>,
  pub threshold_value: Option<f64>,
  pub observed_value:  Option<f64>,
  pub status:          String,
  pub assigned_to:     Option<String>,
  pub created_at:      String,
}

impl RawEvent {
  pub const COLUMNS: &'static str = "event_id, class, reported_by, title, \
     description, building, room, label, severity, threshold_value, \
     observed_value, status, assigned_to, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:        row.get(0)?,
      class:           row.get(1)?,
      reported_by:     row.get(2)?,
      title:           row.get(3)?,
      description:     row.get(4)?,
      building:        row.get(5)?,
      room:            row.get(6)?,
      label:           row.get(7)?,
      severity:        row.get(8)?,
      threshold_value: row.get(9)?,
      observed_value:  row.get(10)?,
      status:          row.get(11)?,
      assigned_to:     row.get(12)?,
      created_at:      row.get(13)?,
    })
  }

  pub fn into_event(self) -> Result<EventRecord> {
    Ok(EventRecord {
      event_id:        self.event_id,
      class:           decode_event_class(&self.class)?,
      reported_by:     self.reported_by,
      title:           self.title,
      description:     self.description,
      building:        self.building,
      room:            self.room,
      label:           self.label,
      severity:        self.severity.as_deref().map(decode_severity).transpose()?,
      threshold_value: self.threshold_value,
      observed_value:  self.observed_value,
      status:          decode_event_status(&self.status)?,
      assigned_to:     self.assigned_to,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `notifications` row.
pub struct RawNotification {
  pub notification_id: i64,
  pub identity_id:     i64,
  pub title:           String,
  pub message:         String,
  pub link:            Option<String>,
  pub is_read:         bool,
  pub created_at:      String,
}

impl RawNotification {
  pub const COLUMNS: &'static str =
    "notification_id, identity_id, title, message, link, is_read, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      identity_id:     row.get(1)?,
      title:           row.get(2)?,
      message:         row.get(3)?,
      link:            row.get(4)?,
      is_read:         row.get(5)?,
      created_at:      row.get(6)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: self.notification_id,
      identity_id:     self.identity_id,
      title:           self.title,
      message:         self.message,
      link:            self.link,
      is_read:         self.is_read,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

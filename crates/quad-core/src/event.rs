//! Historical event records — fault reports and overload observations.
//!
//! Events are the aggregation input for the recurring-issue detector.
//! Their triage status may be mutated by privileged roles, but the fields
//! that make up an event's structural identity (building, room, label)
//! never change after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which family of observation an [`EventRecord`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventClass {
  Fault,
  Overload,
}

impl EventClass {
  pub fn as_str(self) -> &'static str {
    match self {
      EventClass::Fault => "fault",
      EventClass::Overload => "overload",
    }
  }
}

/// Fault severity, reporter-supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
  Critical,
}

impl Severity {
  pub fn as_str(self) -> &'static str {
    match self {
      Severity::Low => "low",
      Severity::Medium => "medium",
      Severity::High => "high",
      Severity::Critical => "critical",
    }
  }
}

/// Triage state of a fault. Does not affect aggregation identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
  Open,
  InProgress,
  Resolved,
}

impl EventStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      EventStatus::Open => "open",
      EventStatus::InProgress => "in_progress",
      EventStatus::Resolved => "resolved",
    }
  }
}

/// A timestamped observation at a location.
///
/// `label` is the fault category (`"projector"`, `"ac"`, ...) for faults
/// and the resource type (`"occupancy"`, `"network"`, ...) for overloads.
/// Overloads additionally carry the threshold that was crossed and the
/// value observed at the time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
  pub event_id:        i64,
  pub class:           EventClass,
  pub reported_by:     Option<i64>,
  pub title:           String,
  pub description:     String,
  pub building:        String,
  pub room:            String,
  pub label:           String,
  pub severity:        Option<Severity>,
  pub threshold_value: Option<f64>,
  pub observed_value:  Option<f64>,
  pub status:          EventStatus,
  pub assigned_to:     Option<String>,
  pub created_at:      DateTime<Utc>,
}

/// Input for recording a new [`EventRecord`].
#[derive(Debug, Clone)]
pub struct NewEventRecord {
  pub class:           EventClass,
  pub reported_by:     Option<i64>,
  pub title:           String,
  pub description:     String,
  pub building:        String,
  pub room:            String,
  pub label:           String,
  pub severity:        Option<Severity>,
  pub threshold_value: Option<f64>,
  pub observed_value:  Option<f64>,
}

/// A privileged triage mutation against a fault record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventTriage {
  pub status:      Option<EventStatus>,
  pub assigned_to: Option<String>,
  pub severity:    Option<Severity>,
}

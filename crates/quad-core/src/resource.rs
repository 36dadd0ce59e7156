//! Managed resources — library, lab, and classroom status records.
//!
//! One normalized variant type tagged by [`ResourceKind`] replaces the
//! per-kind tables of earlier iterations, so occupancy and capacity are
//! always reached through the same fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of facility a [`ManagedResource`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
  Library,
  Lab,
  Classroom,
}

impl ResourceKind {
  pub fn as_str(self) -> &'static str {
    match self {
      ResourceKind::Library => "library",
      ResourceKind::Lab => "lab",
      ResourceKind::Classroom => "classroom",
    }
  }
}

impl std::fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A facility status record. Shared state: its only legitimate mutators
/// are privileged direct writers and the approval processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedResource {
  pub resource_id:       i64,
  pub kind:              ResourceKind,
  pub name:              String,
  pub building:          Option<String>,
  pub room:              Option<String>,
  pub max_capacity:      i64,
  pub current_occupancy: i64,
  pub is_available:      bool,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

impl ManagedResource {
  /// Occupancy as a whole percentage of capacity; 0 when capacity is 0.
  pub fn occupancy_percentage(&self) -> i64 {
    if self.max_capacity > 0 {
      (self.current_occupancy * 100 + self.max_capacity / 2) / self.max_capacity
    } else {
      0
    }
  }
}

/// A proposed write against a managed resource. Every field is optional;
/// unset fields leave the target untouched. The same shape is applied
/// directly by privileged callers and persisted verbatim on a pending
/// update request for everyone else.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceWrite {
  pub name:              Option<String>,
  pub building:          Option<String>,
  pub room:              Option<String>,
  pub max_capacity:      Option<i64>,
  pub current_occupancy: Option<i64>,
  pub is_available:      Option<bool>,
}

impl ResourceWrite {
  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.building.is_none()
      && self.room.is_none()
      && self.max_capacity.is_none()
      && self.current_occupancy.is_none()
      && self.is_available.is_none()
  }

  /// Fold this write onto an existing resource, field by field.
  pub fn apply_to(&self, resource: &mut ManagedResource) {
    if let Some(name) = &self.name {
      resource.name = name.clone();
    }
    if let Some(building) = &self.building {
      resource.building = Some(building.clone());
    }
    if let Some(room) = &self.room {
      resource.room = Some(room.clone());
    }
    if let Some(cap) = self.max_capacity {
      resource.max_capacity = cap;
    }
    if let Some(occ) = self.current_occupancy {
      resource.current_occupancy = occ;
    }
    if let Some(avail) = self.is_available {
      resource.is_available = avail;
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn lab() -> ManagedResource {
    ManagedResource {
      resource_id:       1,
      kind:              ResourceKind::Lab,
      name:              "Physics Lab".to_string(),
      building:          Some("Science".to_string()),
      room:              Some("101".to_string()),
      max_capacity:      30,
      current_occupancy: 12,
      is_available:      true,
      created_at:        Utc::now(),
      updated_at:        Utc::now(),
    }
  }

  #[test]
  fn apply_to_only_touches_set_fields() {
    let mut resource = lab();
    let write = ResourceWrite {
      current_occupancy: Some(45),
      is_available: Some(false),
      ..Default::default()
    };
    write.apply_to(&mut resource);

    assert_eq!(resource.current_occupancy, 45);
    assert!(!resource.is_available);
    assert_eq!(resource.name, "Physics Lab");
    assert_eq!(resource.max_capacity, 30);
  }

  #[test]
  fn occupancy_percentage_rounds_and_handles_zero_capacity() {
    let mut resource = lab();
    assert_eq!(resource.occupancy_percentage(), 40);
    resource.max_capacity = 0;
    assert_eq!(resource.occupancy_percentage(), 0);
  }
}

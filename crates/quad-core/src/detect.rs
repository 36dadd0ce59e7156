//! Recurring-issue detection — read-only windowed aggregation.
//!
//! Events are grouped by their structural identity (building + room +
//! label) and groups at or above a threshold are reported, largest first.
//! Pure: same inputs, same output; no record is ever counted twice.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  event::{EventClass, EventRecord},
  store::FacilityStore,
};

/// The structural identity an event is grouped under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueKey {
  pub building: String,
  pub room:     String,
  /// Fault category, or overload resource type.
  pub label:    String,
}

/// One recurring group: a key and how many events share it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringIssue {
  #[serde(flatten)]
  pub key:   IssueKey,
  pub count: usize,
}

/// Group `records` by structural identity and keep groups with at least
/// `threshold` members, ordered by descending count, then by key so equal
/// counts come out in a deterministic order.
pub fn aggregate_recurring(
  records: &[EventRecord],
  threshold: usize,
) -> Vec<RecurringIssue> {
  let mut counts: HashMap<IssueKey, usize> = HashMap::new();
  for record in records {
    let key = IssueKey {
      building: record.building.clone(),
      room:     record.room.clone(),
      label:    record.label.clone(),
    };
    *counts.entry(key).or_insert(0) += 1;
  }

  let mut issues: Vec<RecurringIssue> = counts
    .into_iter()
    .filter(|(_, count)| *count >= threshold.max(1))
    .map(|(key, count)| RecurringIssue { key, count })
    .collect();

  issues.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
  issues
}

/// Detect recurring issues of one event class.
///
/// `window = None` aggregates over the full unbounded history; `Some(d)`
/// restricts to events recorded within `d` of now. The choice is always
/// explicit — the two behaviors are never conflated.
pub async fn detect<S: FacilityStore>(
  store: &S,
  class: EventClass,
  window: Option<Duration>,
  threshold: usize,
) -> Result<Vec<RecurringIssue>> {
  let since = window.map(|w| Utc::now() - w);
  let records = store
    .list_events(class, since, None)
    .await
    .map_err(Error::store)?;
  Ok(aggregate_recurring(&records, threshold))
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::event::{EventClass, EventRecord, EventStatus, Severity};

  fn fault(building: &str, room: &str, label: &str) -> EventRecord {
    EventRecord {
      event_id:        0,
      class:           EventClass::Fault,
      reported_by:     None,
      title:           format!("{label} fault"),
      description:     String::new(),
      building:        building.to_string(),
      room:            room.to_string(),
      label:           label.to_string(),
      severity:        Some(Severity::Medium),
      threshold_value: None,
      observed_value:  None,
      status:          EventStatus::Open,
      assigned_to:     None,
      created_at:      Utc::now(),
    }
  }

  #[test]
  fn groups_meeting_threshold_are_reported() {
    let records = vec![
      fault("Science", "101", "projector"),
      fault("Science", "101", "projector"),
      fault("Science", "101", "projector"),
      fault("Arts", "12", "lighting"),
    ];

    let issues = aggregate_recurring(&records, 2);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].key.building, "Science");
    assert_eq!(issues[0].key.room, "101");
    assert_eq!(issues[0].key.label, "projector");
    assert_eq!(issues[0].count, 3);
  }

  #[test]
  fn groups_below_threshold_are_excluded() {
    let records = vec![
      fault("Science", "101", "projector"),
      fault("Science", "102", "ac"),
    ];
    assert!(aggregate_recurring(&records, 2).is_empty());
  }

  #[test]
  fn ordered_by_descending_count_then_key() {
    let records = vec![
      fault("B", "2", "ac"),
      fault("B", "2", "ac"),
      fault("A", "1", "projector"),
      fault("A", "1", "projector"),
      fault("C", "3", "network"),
      fault("C", "3", "network"),
      fault("C", "3", "network"),
    ];

    let issues = aggregate_recurring(&records, 2);
    assert_eq!(issues.len(), 3);
    assert_eq!(issues[0].count, 3);
    // Equal counts tie-break on key, ascending.
    assert_eq!(issues[1].key.building, "A");
    assert_eq!(issues[2].key.building, "B");
  }

  #[test]
  fn same_inputs_same_output() {
    let records = vec![
      fault("Science", "101", "projector"),
      fault("Science", "101", "projector"),
      fault("B", "2", "ac"),
      fault("B", "2", "ac"),
    ];
    let a = aggregate_recurring(&records, 2);
    let b = aggregate_recurring(&records, 2);
    assert_eq!(a, b);
  }

  #[test]
  fn zero_threshold_behaves_like_one() {
    let records = vec![fault("Science", "101", "projector")];
    let issues = aggregate_recurring(&records, 0);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].count, 1);
  }
}

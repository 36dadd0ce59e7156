//! Handlers for `/events` — fault reports and overload observations.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Deserialize;

use quad_core::{
  event::{EventClass, EventRecord, EventTriage, NewEventRecord, Severity},
  identity::Role,
  notify::{NewNotification, fan_out},
  store::FacilityStore,
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct FaultBody {
  pub title:       String,
  #[serde(default)]
  pub description: String,
  pub building:    String,
  pub room:        String,
  /// Fault category — the label events are grouped under.
  pub category:    String,
  pub severity:    Option<Severity>,
}

/// `POST /events/faults` — any authenticated identity may report.
pub async fn create_fault<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<FaultBody>,
) -> Result<Response, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.building.is_empty() || body.room.is_empty() || body.category.is_empty() {
    return Err(ApiError::BadRequest(
      "building, room, and category are required".into(),
    ));
  }

  let event = state
    .store
    .record_event(NewEventRecord {
      class:           EventClass::Fault,
      reported_by:     Some(user.identity.identity_id),
      title:           body.title,
      description:     body.description,
      building:        body.building,
      room:            body.room,
      label:           body.category,
      severity:        body.severity,
      threshold_value: None,
      observed_value:  None,
    })
    .await
    .map_err(ApiError::store)?;

  fan_out(
    state.store.as_ref(),
    Role::PRIVILEGED,
    "New Fault Reported",
    &format!(
      "{} reported a fault in {} {}.",
      user.identity.email, event.building, event.room
    ),
    Some("/fault-reports"),
  )
  .await?;

  Ok((StatusCode::CREATED, Json(event)).into_response())
}

/// `GET /events/faults` — managers/admins see every report, everyone
/// else only their own.
pub async fn list_faults<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<Json<Vec<EventRecord>>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let reporter = if user.profile.role.is_privileged() {
    None
  } else {
    Some(user.identity.identity_id)
  };
  let events = state
    .store
    .list_events(EventClass::Fault, None, reporter)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(events))
}

/// `PUT /events/faults/{id}` — triage; manager/admin only. The reporter
/// hears about every triage touch.
pub async fn triage_fault<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(event_id): Path<i64>,
  Json(triage): Json<EventTriage>,
) -> Result<Json<EventRecord>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  user.require(Role::PRIVILEGED)?;

  let event = state
    .store
    .triage_event(event_id, triage)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("fault {event_id} not found")))?;

  if let Some(reporter) = event.reported_by {
    state
      .store
      .create_notification(NewNotification::new(
        reporter,
        "Fault Report Update",
        format!(
          "Your report \"{}\" is now {}.",
          event.title,
          event.status.as_str()
        ),
        Some("/my-reports"),
      ))
      .await
      .map_err(ApiError::store)?;
  }

  Ok(Json(event))
}

#[derive(Debug, Deserialize)]
pub struct OverloadBody {
  pub building:        String,
  pub room:            String,
  /// What was overloaded ("occupancy", "network", ...).
  pub resource_type:   String,
  pub threshold_value: Option<f64>,
  pub observed_value:  Option<f64>,
  #[serde(default)]
  pub description:     String,
}

/// `POST /events/overloads` — manager/admin only.
pub async fn create_overload<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<OverloadBody>,
) -> Result<Response, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  user.require(Role::PRIVILEGED)?;

  let event = state
    .store
    .record_event(NewEventRecord {
      class:           EventClass::Overload,
      reported_by:     Some(user.identity.identity_id),
      title:           format!("{} overload", body.resource_type),
      description:     body.description,
      building:        body.building,
      room:            body.room,
      label:           body.resource_type,
      severity:        None,
      threshold_value: body.threshold_value,
      observed_value:  body.observed_value,
    })
    .await
    .map_err(ApiError::store)?;

  Ok((StatusCode::CREATED, Json(event)).into_response())
}

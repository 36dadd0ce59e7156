//! Handlers for `/reports` — the recurring-issue detector.

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::Duration;
use serde::Deserialize;

use quad_core::{
  detect::{self, RecurringIssue},
  event::EventClass,
  identity::Role,
  store::FacilityStore,
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct RecurringParams {
  /// Which event class to aggregate; faults by default.
  pub class:          Option<EventClass>,
  /// When present, only events within the last N minutes count.
  /// When absent, the full history is aggregated.
  pub window_minutes: Option<i64>,
  pub threshold:      Option<usize>,
}

/// `GET /reports/recurring[?class=&window_minutes=&threshold=]` —
/// manager/admin only.
pub async fn recurring<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Query(params): Query<RecurringParams>,
) -> Result<Json<Vec<RecurringIssue>>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  user.require(Role::PRIVILEGED)?;

  if let Some(minutes) = params.window_minutes
    && minutes <= 0
  {
    return Err(ApiError::BadRequest(
      "window_minutes must be positive".into(),
    ));
  }

  let issues = detect::detect(
    state.store.as_ref(),
    params.class.unwrap_or(EventClass::Fault),
    params.window_minutes.map(Duration::minutes),
    params.threshold.unwrap_or(2),
  )
  .await?;
  Ok(Json(issues))
}

//! Handlers for `/resources` — direct reads plus the dual-path write
//! gateway and its approval queue.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/resources` | Optional `?kind=library\|lab\|classroom` |
//! | `POST` | `/resources` | Applied directly or queued, by role |
//! | `GET`  | `/resources/{id}` | |
//! | `PUT`  | `/resources/{id}` | Applied directly or queued, by role |
//! | `GET`  | `/resources/requests` | Optional `?status=`; manager/admin |
//! | `POST` | `/resources/requests/{id}/approve` | |
//! | `POST` | `/resources/requests/{id}/reject` | |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use quad_core::{
  approval, gateway,
  gateway::MutationOutcome,
  identity::Role,
  request::{Decision, RequestStatus, ResourceUpdateRequest},
  resource::{ManagedResource, ResourceKind, ResourceWrite},
  store::FacilityStore,
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// Shape the dual-path outcome: `applied_status` for the direct path, 202
/// for the queued one.
fn write_response(
  outcome: MutationOutcome<ManagedResource, ResourceUpdateRequest>,
  applied_status: StatusCode,
) -> Response {
  match outcome {
    MutationOutcome::Applied(resource) => (
      applied_status,
      Json(json!({ "status": "applied", "resource": resource })),
    )
      .into_response(),
    MutationOutcome::Queued(request) => (
      StatusCode::ACCEPTED,
      Json(json!({ "status": "queued", "request": request })),
    )
      .into_response(),
  }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub kind: Option<ResourceKind>,
}

/// `GET /resources[?kind=<kind>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ManagedResource>>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let resources = state
    .store
    .list_resources(params.kind)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(resources))
}

/// `GET /resources/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(resource_id): Path<i64>,
) -> Result<Json<ManagedResource>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let resource = state
    .store
    .get_resource(resource_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("resource {resource_id} not found")))?;
  Ok(Json(resource))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub kind: ResourceKind,
  #[serde(flatten)]
  pub write: ResourceWrite,
}

/// `POST /resources`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<CreateBody>,
) -> Result<Response, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let outcome = gateway::write_resource(
    state.store.as_ref(),
    &user.profile,
    body.kind,
    None,
    body.write,
  )
  .await?;
  Ok(write_response(outcome, StatusCode::CREATED))
}

/// `PUT /resources/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(resource_id): Path<i64>,
  Json(write): Json<ResourceWrite>,
) -> Result<Response, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  // The gateway needs the kind for a queued request; the target supplies it.
  let resource = state
    .store
    .get_resource(resource_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("resource {resource_id} not found")))?;

  let outcome = gateway::write_resource(
    state.store.as_ref(),
    &user.profile,
    resource.kind,
    Some(resource_id),
    write,
  )
  .await?;
  Ok(write_response(outcome, StatusCode::OK))
}

#[derive(Debug, Deserialize)]
pub struct RequestListParams {
  pub status: Option<RequestStatus>,
}

/// `GET /resources/requests[?status=<status>]` — manager/admin only.
pub async fn list_requests<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Query(params): Query<RequestListParams>,
) -> Result<Json<Vec<ResourceUpdateRequest>>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  user.require(Role::PRIVILEGED)?;
  let requests = state
    .store
    .list_update_requests(params.status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(requests))
}

/// `POST /resources/requests/{id}/approve`
pub async fn approve_request<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(request_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let (request, resource) = approval::decide_resource_update(
    state.store.as_ref(),
    &user.profile,
    request_id,
    Decision::Approve,
    None,
  )
  .await?;
  tracing::info!(request_id, approver = user.identity.identity_id, "update request approved");
  Ok(Json(json!({ "request": request, "resource": resource })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectBody {
  pub reason: Option<String>,
}

/// `POST /resources/requests/{id}/reject`
pub async fn reject_request<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(request_id): Path<i64>,
  body: Option<Json<RejectBody>>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let reason = body.and_then(|Json(b)| b.reason);
  let (request, _) = approval::decide_resource_update(
    state.store.as_ref(),
    &user.profile,
    request_id,
    Decision::Reject,
    reason,
  )
  .await?;
  Ok(Json(json!({ "request": request })))
}

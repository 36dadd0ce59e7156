//! HTTP layer for Quad — the campus facility workflow API.
//!
//! Exposes an axum [`Router`] backed by any [`FacilityStore`]. Callers
//! authenticate with stateless bearer tokens; what they may do is decided
//! per request from their capability profile, never cached.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod token;

pub use error::ApiError;
pub use token::TokenService;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post, put},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use quad_core::store::FacilityStore;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` or the
/// `QUAD_*` environment.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// HMAC secret the bearer tokens are signed with.
  pub token_secret: String,
  #[serde(default = "default_token_ttl_days")]
  pub token_ttl_days: i64,
}

fn default_token_ttl_days() -> i64 { token::DEFAULT_TTL_DAYS }

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S: FacilityStore> {
  pub store:  Arc<S>,
  pub tokens: Arc<TokenService>,
}

impl<S: FacilityStore> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      tokens: Arc::clone(&self.tokens),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full API router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: FacilityStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  use handlers::{
    admin, auth, bookings, events, notifications, reports, resources, roles,
  };

  Router::new()
    // Accounts & roles
    .route("/auth/register", post(auth::register::<S>))
    .route("/auth/login",    post(auth::login::<S>))
    .route("/auth/me",       get(auth::me::<S>))
    .route("/auth/role",     post(auth::set_role::<S>))
    .route("/roles/requests",              get(roles::list::<S>))
    .route("/roles/requests/{id}/approve", post(roles::approve::<S>))
    .route("/roles/requests/{id}/reject",  post(roles::reject::<S>))
    // Managed resources & the update queue
    .route("/resources",      get(resources::list::<S>).post(resources::create::<S>))
    .route("/resources/{id}", get(resources::get_one::<S>).put(resources::update::<S>))
    .route("/resources/requests",              get(resources::list_requests::<S>))
    .route("/resources/requests/{id}/approve", post(resources::approve_request::<S>))
    .route("/resources/requests/{id}/reject",  post(resources::reject_request::<S>))
    // Bookings
    .route("/bookings",              post(bookings::create::<S>).get(bookings::list::<S>))
    .route("/bookings/{id}/approve", post(bookings::approve::<S>))
    .route("/bookings/{id}/reject",  post(bookings::reject::<S>))
    // Events & reports
    .route("/events/faults",      post(events::create_fault::<S>).get(events::list_faults::<S>))
    .route("/events/faults/{id}", put(events::triage_fault::<S>))
    .route("/events/overloads",   post(events::create_overload::<S>))
    .route("/reports/recurring",  get(reports::recurring::<S>))
    // Notifications
    .route("/notifications",           get(notifications::list::<S>))
    .route("/notifications/{id}/read", post(notifications::mark_read::<S>))
    .route("/notifications/read-all",  post(notifications::read_all::<S>))
    // Admin read surface
    .route("/admin/users", get(admin::users::<S>))
    .route("/admin/stats", get(admin::stats::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::Duration;
  use quad_core::identity::Role;
  use quad_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  async fn make_state() -> AppState<SqliteStore> {
    AppState {
      store:  Arc::new(SqliteStore::open_in_memory().await.unwrap()),
      tokens: Arc::new(TokenService::new("test-secret", Duration::days(7))),
    }
  }

  async fn send(
    state: &AppState<SqliteStore>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
      Some(json) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  /// Register an identity over the API and return its bearer token.
  async fn register(state: &AppState<SqliteStore>, email: &str) -> String {
    let (status, body) = send(
      state,
      "POST",
      "/auth/register",
      None,
      Some(json!({ "email": email, "password": "s3cret-enough" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body["token"].as_str().unwrap().to_string()
  }

  /// Seed a manager directly in the store and mint a token for it.
  async fn manager(state: &AppState<SqliteStore>, email: &str) -> String {
    use quad_core::store::FacilityStore as _;
    let identity = state
      .store
      .create_identity(email, "unused-hash", false)
      .await
      .unwrap();
    state
      .store
      .set_role(identity.identity_id, Role::Manager, None)
      .await
      .unwrap();
    state.tokens.issue(identity.identity_id).unwrap()
  }

  /// Seed an admin directly in the store and mint a token for it.
  async fn admin(state: &AppState<SqliteStore>, email: &str) -> String {
    use quad_core::store::FacilityStore as _;
    let identity = state
      .store
      .create_identity(email, "unused-hash", false)
      .await
      .unwrap();
    state
      .store
      .set_role(identity.identity_id, Role::Admin, None)
      .await
      .unwrap();
    state.tokens.issue(identity.identity_id).unwrap()
  }

  // ── Auth ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn register_login_me_round_trip() {
    let state = make_state().await;
    let token = register(&state, "alice@campus.edu").await;

    let (status, body) = send(&state, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["identity"]["email"], "alice@campus.edu");
    assert_eq!(body["profile"]["role"], "student");
    // The credential never leaves the server.
    assert!(body["identity"].get("password_hash").is_none());

    let (status, body) = send(
      &state,
      "POST",
      "/auth/login",
      None,
      Some(json!({ "email": "alice@campus.edu", "password": "s3cret-enough" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());

    let (status, _) = send(
      &state,
      "POST",
      "/auth/login",
      None,
      Some(json!({ "email": "alice@campus.edu", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn duplicate_registration_conflicts() {
    let state = make_state().await;
    register(&state, "alice@campus.edu").await;
    let (status, _) = send(
      &state,
      "POST",
      "/auth/register",
      None,
      Some(json!({ "email": "alice@campus.edu", "password": "s3cret-enough" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn requests_without_a_valid_token_are_401() {
    let state = make_state().await;

    let (status, _) = send(&state, "GET", "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&state, "GET", "/auth/me", Some("not.a.token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A well-signed token for an identity that does not exist is no better.
    let ghost = state.tokens.issue(9_999).unwrap();
    let (status, _) = send(&state, "GET", "/auth/me", Some(&ghost), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  // ── Role lifecycle over HTTP ────────────────────────────────────────────

  #[tokio::test]
  async fn role_request_is_queued_then_approved() {
    let state = make_state().await;
    let alice = register(&state, "alice@campus.edu").await;
    let boss = manager(&state, "boss@campus.edu").await;

    // Student selection applies immediately.
    let (status, body) = send(
      &state,
      "POST",
      "/auth/role",
      Some(&alice),
      Some(json!({ "role": "student" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "applied");

    // Lecturer goes through the queue.
    let (status, body) = send(
      &state,
      "POST",
      "/auth/role",
      Some(&alice),
      Some(json!({ "role": "lecturer", "reason": "teaching CS101" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "queued");
    let request_id = body["request"]["request_id"].as_i64().unwrap();

    // A duplicate submission conflicts instead of queueing twice.
    let (status, _) = send(
      &state,
      "POST",
      "/auth/role",
      Some(&alice),
      Some(json!({ "role": "lecturer" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The manager sees and approves it.
    let (status, body) = send(&state, "GET", "/roles/requests", Some(&boss), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(
      &state,
      "POST",
      &format!("/roles/requests/{request_id}/approve"),
      Some(&boss),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&state, "GET", "/auth/me", Some(&alice), None).await;
    assert_eq!(body["profile"]["role"], "lecturer");

    // Exactly once: a second decision is a conflict.
    let (status, _) = send(
      &state,
      "POST",
      &format!("/roles/requests/{request_id}/approve"),
      Some(&boss),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn role_queue_is_hidden_from_students() {
    let state = make_state().await;
    let alice = register(&state, "alice@campus.edu").await;
    let (status, _) = send(&state, "GET", "/roles/requests", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  // ── Resource gateway over HTTP ──────────────────────────────────────────

  #[tokio::test]
  async fn resource_writes_are_applied_or_queued_by_role() {
    let state = make_state().await;
    let alice = register(&state, "alice@campus.edu").await;
    let boss = manager(&state, "boss@campus.edu").await;

    // Manager create applies directly.
    let (status, body) = send(
      &state,
      "POST",
      "/resources",
      Some(&boss),
      Some(json!({ "kind": "lab", "name": "Physics Lab", "max_capacity": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "applied");
    let lab_id = body["resource"]["resource_id"].as_i64().unwrap();

    // Student write is queued and leaves the lab untouched.
    let (status, body) = send(
      &state,
      "PUT",
      &format!("/resources/{lab_id}"),
      Some(&alice),
      Some(json!({ "current_occupancy": 45 })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "queued");
    let request_id = body["request"]["request_id"].as_i64().unwrap();

    let (_, body) = send(&state, "GET", &format!("/resources/{lab_id}"), Some(&alice), None).await;
    assert_eq!(body["current_occupancy"], 0);

    // Approval copies the proposed values onto the lab.
    let (status, body) = send(
      &state,
      "POST",
      &format!("/resources/requests/{request_id}/approve"),
      Some(&boss),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resource"]["current_occupancy"], 45);
    assert_eq!(body["resource"]["max_capacity"], 30);

    let (_, body) = send(&state, "GET", &format!("/resources/{lab_id}"), Some(&alice), None).await;
    assert_eq!(body["current_occupancy"], 45);
  }

  #[tokio::test]
  async fn empty_resource_write_is_a_bad_request() {
    let state = make_state().await;
    let boss = manager(&state, "boss@campus.edu").await;

    let (status, body) = send(
      &state,
      "POST",
      "/resources",
      Some(&boss),
      Some(json!({ "kind": "lab" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
  }

  // ── Bookings over HTTP ──────────────────────────────────────────────────

  #[tokio::test]
  async fn booking_approval_takes_the_room_out_of_the_pool() {
    let state = make_state().await;
    let alice = register(&state, "alice@campus.edu").await;
    let boss = manager(&state, "boss@campus.edu").await;

    let (_, body) = send(
      &state,
      "POST",
      "/resources",
      Some(&boss),
      Some(json!({ "kind": "lab", "name": "Chem Lab" })),
    )
    .await;
    let lab_id = body["resource"]["resource_id"].as_i64().unwrap();

    let (status, body) = send(
      &state,
      "POST",
      "/bookings",
      Some(&alice),
      Some(json!({
        "kind": "lab",
        "purpose": "thesis experiments",
        "expected_attendees": 4,
        "date": "2025-03-14",
        "start_time": "09:00:00",
        "end_time": "11:00:00"
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let booking_id = body["booking_id"].as_i64().unwrap();

    // Managers may not book rooms themselves.
    let (status, _) = send(
      &state,
      "POST",
      "/bookings",
      Some(&boss),
      Some(json!({
        "kind": "lab",
        "purpose": "x",
        "expected_attendees": 1,
        "date": "2025-03-14",
        "start_time": "09:00:00",
        "end_time": "10:00:00"
      })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
      &state,
      "POST",
      &format!("/bookings/{booking_id}/approve"),
      Some(&boss),
      Some(json!({ "resource_id": lab_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["resource_id"], lab_id);

    let (_, body) = send(&state, "GET", &format!("/resources/{lab_id}"), Some(&alice), None).await;
    assert_eq!(body["is_available"], false);
  }

  // ── Faults, reports, notifications ──────────────────────────────────────

  #[tokio::test]
  async fn repeated_faults_surface_as_recurring_issues() {
    let state = make_state().await;
    let alice = register(&state, "alice@campus.edu").await;
    let boss = manager(&state, "boss@campus.edu").await;

    for _ in 0..2 {
      let (status, _) = send(
        &state,
        "POST",
        "/events/faults",
        Some(&alice),
        Some(json!({
          "title": "projector dead",
          "building": "Science",
          "room": "101",
          "category": "projector",
          "severity": "high"
        })),
      )
      .await;
      assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = send(
      &state,
      "POST",
      "/events/faults",
      Some(&alice),
      Some(json!({
        "title": "flickering lights",
        "building": "Arts",
        "room": "12",
        "category": "lighting"
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Students cannot read the report.
    let (status, _) = send(&state, "GET", "/reports/recurring", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&state, "GET", "/reports/recurring", Some(&boss), None).await;
    assert_eq!(status, StatusCode::OK);
    let issues = body.as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["building"], "Science");
    assert_eq!(issues[0]["room"], "101");
    assert_eq!(issues[0]["label"], "projector");
    assert_eq!(issues[0]["count"], 2);

    // Fault reports notified the manager; triage notifies the reporter.
    let (_, body) = send(&state, "GET", "/notifications", Some(&boss), None).await;
    assert_eq!(body["unread"], 3);

    let (_, body) = send(&state, "GET", "/events/faults", Some(&boss), None).await;
    let event_id = body.as_array().unwrap()[0]["event_id"].as_i64().unwrap();
    let (status, body) = send(
      &state,
      "PUT",
      &format!("/events/faults/{event_id}"),
      Some(&boss),
      Some(json!({ "status": "in_progress", "assigned_to": "facilities team" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in_progress");

    let (_, body) = send(&state, "GET", "/notifications", Some(&alice), None).await;
    assert_eq!(body["unread"], 1);
  }

  #[tokio::test]
  async fn overload_logging_is_privileged() {
    let state = make_state().await;
    let alice = register(&state, "alice@campus.edu").await;
    let boss = manager(&state, "boss@campus.edu").await;

    let overload = json!({
      "building": "Science",
      "room": "101",
      "resource_type": "occupancy",
      "threshold_value": 90.0,
      "observed_value": 97.5
    });

    let (status, _) = send(&state, "POST", "/events/overloads", Some(&alice), Some(overload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&state, "POST", "/events/overloads", Some(&boss), Some(overload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["class"], "overload");
    assert_eq!(body["observed_value"], 97.5);
  }

  #[tokio::test]
  async fn notifications_can_be_marked_read() {
    let state = make_state().await;
    let alice = register(&state, "alice@campus.edu").await;
    let boss = manager(&state, "boss@campus.edu").await;

    // Queueing a role request notifies the manager.
    send(
      &state,
      "POST",
      "/auth/role",
      Some(&alice),
      Some(json!({ "role": "lecturer" })),
    )
    .await;

    let (_, body) = send(&state, "GET", "/notifications", Some(&boss), None).await;
    assert_eq!(body["unread"], 1);
    let note_id = body["notifications"].as_array().unwrap()[0]["notification_id"]
      .as_i64()
      .unwrap();

    // Alice cannot read someone else's notification.
    let (status, _) = send(
      &state,
      "POST",
      &format!("/notifications/{note_id}/read"),
      Some(&alice),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
      &state,
      "POST",
      &format!("/notifications/{note_id}/read"),
      Some(&boss),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&state, "GET", "/notifications", Some(&boss), None).await;
    assert_eq!(body["unread"], 0);
  }

  // ── Admin read surface ──────────────────────────────────────────────────

  #[tokio::test]
  async fn admin_surface_reports_users_and_stats() {
    let state = make_state().await;
    let alice = register(&state, "alice@campus.edu").await;
    let boss = manager(&state, "boss@campus.edu").await;
    let root = admin(&state, "root@campus.edu").await;

    // Give the counters something to count.
    send(
      &state,
      "POST",
      "/auth/role",
      Some(&alice),
      Some(json!({ "role": "lecturer" })),
    )
    .await;
    send(
      &state,
      "POST",
      "/events/faults",
      Some(&alice),
      Some(json!({
        "title": "projector dead",
        "building": "Science",
        "room": "101",
        "category": "projector"
      })),
    )
    .await;

    // Students and managers are both turned away.
    let (status, _) = send(&state, "GET", "/admin/users", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&state, "GET", "/admin/stats", Some(&boss), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&state, "GET", "/admin/users", Some(&root), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 3);
    assert_eq!(users[0]["identity"]["email"], "alice@campus.edu");
    assert_eq!(users[0]["profile"]["role"], "student");
    // The credential stays server-side here too.
    assert!(users[0]["identity"].get("password_hash").is_none());

    let (status, body) = send(&state, "GET", "/admin/stats", Some(&root), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["open_faults"], 1);
    assert_eq!(body["total_faults"], 1);
    assert_eq!(body["pending_role_requests"], 1);
    let by_role = body["users_by_role"].as_array().unwrap();
    assert!(by_role.contains(&json!({ "role": "student", "count": 1 })));
    assert!(by_role.contains(&json!({ "role": "manager", "count": 1 })));
    assert!(by_role.contains(&json!({ "role": "admin", "count": 1 })));
  }
}

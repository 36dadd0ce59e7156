//! The `FacilityStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `quad-store-sqlite`).
//! The workflow engine and the HTTP layer depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  event::{EventClass, EventRecord, EventTriage, NewEventRecord},
  identity::{CapabilityProfile, Identity, Role},
  notify::{NewNotification, Notification},
  request::{
    Decision, NewResourceUpdateRequest, NewRoleChangeRequest,
    NewRoomBookingRequest, RequestStatus, ResourceUpdateRequest,
    RoleChangeRequest, RoomBookingRequest,
  },
  resource::{ManagedResource, ResourceKind, ResourceWrite},
};

// ─── Decide outcome ──────────────────────────────────────────────────────────

/// Result of an atomic decide attempt on a pending request.
///
/// The backend guarantees the pending→terminal transition happens at most
/// once: of two concurrent decide calls on the same request, exactly one
/// observes [`Decide::Applied`] and the other [`Decide::AlreadyDecided`].
#[derive(Debug, Clone)]
pub enum Decide<T> {
  /// The request moved from pending to a terminal state; side-effect
  /// writes (profile role, resource fields, availability flag) happened
  /// in the same transaction.
  Applied(T),
  /// No request with that id exists.
  NotFound,
  /// The request was already in a terminal state.
  AlreadyDecided,
}

// ─── Admin read surface ──────────────────────────────────────────────────────

/// How many identities currently hold one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCount {
  pub role:  Role,
  pub count: i64,
}

/// Workload counters for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminStats {
  pub users_by_role:         Vec<RoleCount>,
  pub open_faults:           i64,
  pub total_faults:          i64,
  pub pending_role_requests: i64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Quad storage backend.
///
/// All `decide_*` operations are transactional read-check-then-write: the
/// "is this still pending?" precondition and the terminal-state write (plus
/// any coupled side-effect write) are atomic with respect to concurrent
/// decisions on the same entity.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait FacilityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identities & profiles ─────────────────────────────────────────────

  /// Create and persist a new identity. Fails if the email is taken.
  fn create_identity(
    &self,
    email: &str,
    password_hash: &str,
    is_superuser: bool,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Retrieve an identity by id. Returns `None` if not found.
  fn get_identity(
    &self,
    identity_id: i64,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Retrieve an identity by email. Returns `None` if not found.
  fn find_identity_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Idempotently create-or-fetch the capability profile for an identity,
  /// with the default role on first creation. The single sanctioned
  /// auto-provisioning point; callers never scatter profile creation.
  fn ensure_profile(
    &self,
    identity_id: i64,
  ) -> impl Future<Output = Result<CapabilityProfile, Self::Error>> + Send + '_;

  /// Overwrite an identity's role (and subtype). Used only by the role
  /// lifecycle: direct grants and approved role-change requests.
  fn set_role(
    &self,
    identity_id: i64,
    role: Role,
    manager_subtype: Option<String>,
  ) -> impl Future<Output = Result<CapabilityProfile, Self::Error>> + Send + '_;

  /// Stash a manager subtype on a profile without touching its role.
  fn set_manager_subtype(
    &self,
    identity_id: i64,
    manager_subtype: &str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All identities currently holding one of `roles` (notification fan-out).
  fn identities_with_roles<'a>(
    &'a self,
    roles: &'a [Role],
  ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + 'a;

  // ── Role-change requests ──────────────────────────────────────────────

  /// Create a pending role-change request. Returns `None` when a pending
  /// request for the same (identity, role) already exists — the backend
  /// upholds the at-most-one-pending invariant even for submissions that
  /// race past [`FacilityStore::has_pending_role_request`].
  fn create_role_request(
    &self,
    input: NewRoleChangeRequest,
  ) -> impl Future<Output = Result<Option<RoleChangeRequest>, Self::Error>> + Send + '_;

  /// Whether a pending request already exists for (identity, role).
  fn has_pending_role_request(
    &self,
    identity_id: i64,
    role: Role,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All role-change requests, newest first.
  fn list_role_requests(
    &self,
  ) -> impl Future<Output = Result<Vec<RoleChangeRequest>, Self::Error>> + Send + '_;

  /// Atomically decide a pending role-change request. On approval the
  /// requester's profile role (and subtype) is written in the same
  /// transaction.
  fn decide_role_request(
    &self,
    request_id: i64,
    decision: Decision,
    approver_id: i64,
    rejection_reason: Option<String>,
  ) -> impl Future<Output = Result<Decide<RoleChangeRequest>, Self::Error>> + Send + '_;

  // ── Managed resources ─────────────────────────────────────────────────

  /// Create a resource from a write payload, filling defaults for unset
  /// fields.
  fn create_resource(
    &self,
    kind: ResourceKind,
    write: ResourceWrite,
  ) -> impl Future<Output = Result<ManagedResource, Self::Error>> + Send + '_;

  fn get_resource(
    &self,
    resource_id: i64,
  ) -> impl Future<Output = Result<Option<ManagedResource>, Self::Error>> + Send + '_;

  fn list_resources(
    &self,
    kind: Option<ResourceKind>,
  ) -> impl Future<Output = Result<Vec<ManagedResource>, Self::Error>> + Send + '_;

  /// Apply a write directly to an existing resource. Returns `None` if the
  /// resource does not exist. Privileged path only.
  fn update_resource(
    &self,
    resource_id: i64,
    write: ResourceWrite,
  ) -> impl Future<Output = Result<Option<ManagedResource>, Self::Error>> + Send + '_;

  // ── Resource-update requests ──────────────────────────────────────────

  fn create_update_request(
    &self,
    input: NewResourceUpdateRequest,
  ) -> impl Future<Output = Result<ResourceUpdateRequest, Self::Error>> + Send + '_;

  fn list_update_requests(
    &self,
    status: Option<RequestStatus>,
  ) -> impl Future<Output = Result<Vec<ResourceUpdateRequest>, Self::Error>> + Send + '_;

  /// Atomically decide a pending update request. On approval the proposed
  /// write is folded onto the target resource (creating it when absent)
  /// in the same transaction; the touched resource is returned alongside.
  fn decide_update_request(
    &self,
    request_id: i64,
    decision: Decision,
    approver_id: i64,
    rejection_reason: Option<String>,
  ) -> impl Future<
    Output = Result<Decide<(ResourceUpdateRequest, Option<ManagedResource>)>, Self::Error>,
  > + Send
  + '_;

  // ── Room bookings ─────────────────────────────────────────────────────

  fn create_booking(
    &self,
    requested_by: i64,
    input: NewRoomBookingRequest,
  ) -> impl Future<Output = Result<RoomBookingRequest, Self::Error>> + Send + '_;

  /// Bookings, newest first; restricted to one requester when given.
  fn list_bookings(
    &self,
    requested_by: Option<i64>,
  ) -> impl Future<Output = Result<Vec<RoomBookingRequest>, Self::Error>> + Send + '_;

  /// Atomically decide a pending booking. On approval the assigned
  /// resource (explicit `assigned_resource`, or the one referenced by the
  /// booking) has its availability flag set to `false` in the same
  /// transaction, regardless of its prior value.
  fn decide_booking(
    &self,
    booking_id: i64,
    decision: Decision,
    approver_id: i64,
    assigned_resource: Option<i64>,
    rejection_reason: Option<String>,
  ) -> impl Future<Output = Result<Decide<RoomBookingRequest>, Self::Error>> + Send + '_;

  // ── Event records ─────────────────────────────────────────────────────

  fn record_event(
    &self,
    input: NewEventRecord,
  ) -> impl Future<Output = Result<EventRecord, Self::Error>> + Send + '_;

  fn get_event(
    &self,
    event_id: i64,
  ) -> impl Future<Output = Result<Option<EventRecord>, Self::Error>> + Send + '_;

  /// Events of one class, newest first, optionally restricted to records
  /// at or after `since` and/or to one reporter.
  fn list_events(
    &self,
    class: EventClass,
    since: Option<DateTime<Utc>>,
    reported_by: Option<i64>,
  ) -> impl Future<Output = Result<Vec<EventRecord>, Self::Error>> + Send + '_;

  /// Apply a privileged triage mutation to a fault. Returns `None` if the
  /// event does not exist.
  fn triage_event(
    &self,
    event_id: i64,
    triage: EventTriage,
  ) -> impl Future<Output = Result<Option<EventRecord>, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  fn create_notification(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  /// An identity's notifications: unread first, then newest first, capped
  /// at `limit`.
  fn list_notifications(
    &self,
    identity_id: i64,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  fn unread_notification_count(
    &self,
    identity_id: i64,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Mark one notification read. Returns `false` if it does not exist or
  /// belongs to someone else.
  fn mark_notification_read(
    &self,
    notification_id: i64,
    identity_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn mark_all_notifications_read(
    &self,
    identity_id: i64,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  // ── Admin read surface ────────────────────────────────────────────────

  /// Every identity paired with its capability profile, oldest first.
  /// Identities that never hit the resolver report the default profile.
  fn list_identity_profiles(
    &self,
  ) -> impl Future<Output = Result<Vec<(Identity, CapabilityProfile)>, Self::Error>> + Send + '_;

  /// Aggregate counters over identities, faults and the role queue.
  fn admin_stats(
    &self,
  ) -> impl Future<Output = Result<AdminStats, Self::Error>> + Send + '_;
}

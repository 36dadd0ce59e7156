//! [`SqliteStore`] — the SQLite implementation of [`FacilityStore`].

use std::{collections::HashMap, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use quad_core::{
  event::{EventClass, EventRecord, EventTriage, NewEventRecord},
  identity::{CapabilityProfile, Identity, Role},
  notify::{NewNotification, Notification},
  request::{
    Decision, NewResourceUpdateRequest, NewRoleChangeRequest,
    NewRoomBookingRequest, RequestStatus, ResourceUpdateRequest,
    RoleChangeRequest, RoomBookingRequest,
  },
  resource::{ManagedResource, ResourceKind, ResourceWrite},
  store::{AdminStats, Decide, FacilityStore, RoleCount},
};

use crate::{
  encode::{
    decode_role, encode_date, encode_dt, encode_time, RawBooking, RawEvent,
    RawIdentity, RawNotification, RawProfile, RawResource, RawRoleRequest,
    RawUpdateRequest,
  },
  schema::SCHEMA,
  Error, Result,
};

/// Name given to a resource created without one ("New Library", ...).
fn default_name(kind: ResourceKind) -> String {
  match kind {
    ResourceKind::Library => "New Library".to_owned(),
    ResourceKind::Lab => "New Lab".to_owned(),
    ResourceKind::Classroom => "New Classroom".to_owned(),
  }
}

fn other_err(
  e: impl std::error::Error + Send + Sync + 'static,
) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Quad facility store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Transaction-scoped helpers ──────────────────────────────────────────────
//
// These run inside `conn.call` closures, where only `rusqlite` errors exist.

fn read_resource(
  conn: &rusqlite::Connection,
  resource_id: i64,
) -> rusqlite::Result<Option<RawResource>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM resources WHERE resource_id = ?1",
        RawResource::COLUMNS
      ),
      rusqlite::params![resource_id],
      RawResource::from_row,
    )
    .optional()
}

/// Ensure a profile row exists with the default role.
fn ensure_profile_row(
  conn: &rusqlite::Connection,
  identity_id: i64,
  now: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT OR IGNORE INTO profiles (identity_id, role, updated_at)
     VALUES (?1, 'student', ?2)",
    rusqlite::params![identity_id, now],
  )?;
  Ok(())
}

/// Fold a [`ResourceWrite`] onto a resource row, leaving unset fields alone.
fn fold_resource_write(
  conn: &rusqlite::Connection,
  resource_id: i64,
  write: &ResourceWrite,
  now: &str,
) -> rusqlite::Result<usize> {
  conn.execute(
    "UPDATE resources SET
       name              = COALESCE(?2, name),
       building          = COALESCE(?3, building),
       room              = COALESCE(?4, room),
       max_capacity      = COALESCE(?5, max_capacity),
       current_occupancy = COALESCE(?6, current_occupancy),
       is_available      = COALESCE(?7, is_available),
       updated_at        = ?8
     WHERE resource_id = ?1",
    rusqlite::params![
      resource_id,
      write.name,
      write.building,
      write.room,
      write.max_capacity,
      write.current_occupancy,
      write.is_available,
      now,
    ],
  )
}

/// Insert a resource row built from a write, filling defaults for unset
/// fields. Returns the new rowid.
fn insert_resource_from_write(
  conn: &rusqlite::Connection,
  kind: ResourceKind,
  write: &ResourceWrite,
  now: &str,
) -> rusqlite::Result<i64> {
  let name = write.name.clone().unwrap_or_else(|| default_name(kind));
  conn.execute(
    "INSERT INTO resources (
       kind, name, building, room, max_capacity, current_occupancy,
       is_available, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
    rusqlite::params![
      kind.as_str(),
      name,
      write.building,
      write.room,
      write.max_capacity.unwrap_or(100),
      write.current_occupancy.unwrap_or(0),
      write.is_available.unwrap_or(true),
      now,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

// ─── FacilityStore impl ──────────────────────────────────────────────────────

impl FacilityStore for SqliteStore {
  type Error = Error;

  // ── Identities & profiles ──────────────────────────────────────────────

  fn create_identity(
    &self,
    email: &str,
    password_hash: &str,
    is_superuser: bool,
  ) -> impl Future<Output = Result<Identity>> + Send + '_ {
    let email = email.to_owned();
    let password_hash = password_hash.to_owned();
    async move {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);

    let email_param = email.clone();
    let hash_param = password_hash.clone();
    let identity_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO identities (email, password_hash, is_superuser, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![email_param, hash_param, is_superuser, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Identity {
      identity_id,
      email,
      password_hash,
      is_superuser,
      created_at,
    })
    }
  }

  async fn get_identity(&self, identity_id: i64) -> Result<Option<Identity>> {
    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM identities WHERE identity_id = ?1",
                RawIdentity::COLUMNS
              ),
              rusqlite::params![identity_id],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn find_identity_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> Result<Option<Identity>> {
    let email = email.to_owned();
    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM identities WHERE email = ?1",
                RawIdentity::COLUMNS
              ),
              rusqlite::params![email],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn ensure_profile(&self, identity_id: i64) -> Result<CapabilityProfile> {
    let now = encode_dt(Utc::now());

    let raw: RawProfile = self
      .conn
      .call(move |conn| {
        ensure_profile_row(conn, identity_id, &now)?;
        Ok(conn.query_row(
          &format!(
            "SELECT {} FROM profiles WHERE identity_id = ?1",
            RawProfile::COLUMNS
          ),
          rusqlite::params![identity_id],
          RawProfile::from_row,
        )?)
      })
      .await?;

    raw.into_profile()
  }

  async fn set_role(
    &self,
    identity_id: i64,
    role: Role,
    manager_subtype: Option<String>,
  ) -> Result<CapabilityProfile> {
    let now = encode_dt(Utc::now());
    let role_str = role.as_str().to_owned();

    let raw: RawProfile = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (identity_id, role, manager_subtype, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(identity_id) DO UPDATE SET
             role            = excluded.role,
             manager_subtype = excluded.manager_subtype,
             updated_at      = excluded.updated_at",
          rusqlite::params![identity_id, role_str, manager_subtype, now],
        )?;
        Ok(conn.query_row(
          &format!(
            "SELECT {} FROM profiles WHERE identity_id = ?1",
            RawProfile::COLUMNS
          ),
          rusqlite::params![identity_id],
          RawProfile::from_row,
        )?)
      })
      .await?;

    raw.into_profile()
  }

  fn set_manager_subtype(
    &self,
    identity_id: i64,
    manager_subtype: &str,
  ) -> impl Future<Output = Result<()>> + Send + '_ {
    let subtype = manager_subtype.to_owned();
    async move {
    let now = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        ensure_profile_row(conn, identity_id, &now)?;
        conn.execute(
          "UPDATE profiles SET manager_subtype = ?2, updated_at = ?3
           WHERE identity_id = ?1",
          rusqlite::params![identity_id, subtype, now],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
    }
  }

  async fn identities_with_roles<'a>(
    &'a self,
    roles: &'a [Role],
  ) -> Result<Vec<Identity>> {
    if roles.is_empty() {
      return Ok(Vec::new());
    }

    let role_strs: Vec<String> =
      roles.iter().map(|r| r.as_str().to_owned()).collect();

    let raws: Vec<RawIdentity> = self
      .conn
      .call(move |conn| {
        let placeholders = (1..=role_strs.len())
          .map(|n| format!("?{n}"))
          .collect::<Vec<_>>()
          .join(", ");
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM identities WHERE identity_id IN
             (SELECT identity_id FROM profiles WHERE role IN ({placeholders}))",
          RawIdentity::COLUMNS
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(role_strs.iter()),
            RawIdentity::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIdentity::into_identity).collect()
  }

  // ── Role-change requests ───────────────────────────────────────────────

  async fn create_role_request(
    &self,
    input: NewRoleChangeRequest,
  ) -> Result<Option<RoleChangeRequest>> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let role_str = input.requested_role.as_str().to_owned();
    let identity_id = input.identity_id;
    let subtype = input.manager_subtype.clone();
    let reason = input.reason.clone();

    let request_id = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO role_requests
             (identity_id, requested_role, manager_subtype, reason, status, created_at)
           VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
          rusqlite::params![identity_id, role_str, subtype, reason, at_str],
        );
        match inserted {
          Ok(_) => Ok(Some(conn.last_insert_rowid())),
          // The partial unique index absorbs a submission that raced past
          // the caller's pending check.
          Err(rusqlite::Error::SqliteFailure(e, Some(msg)))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
              && msg.contains("role_requests_pending_idx") =>
          {
            Ok(None)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    let Some(request_id) = request_id else {
      return Ok(None);
    };

    Ok(Some(RoleChangeRequest {
      request_id,
      identity_id: input.identity_id,
      requested_role: input.requested_role,
      manager_subtype: input.manager_subtype,
      reason: input.reason,
      status: RequestStatus::Pending,
      approved_by: None,
      rejection_reason: None,
      decided_at: None,
      created_at,
    }))
  }

  async fn has_pending_role_request(
    &self,
    identity_id: i64,
    role: Role,
  ) -> Result<bool> {
    let role_str = role.as_str().to_owned();
    let found = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM role_requests
               WHERE identity_id = ?1 AND requested_role = ?2 AND status = 'pending'",
              rusqlite::params![identity_id, role_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(found)
  }

  async fn list_role_requests(&self) -> Result<Vec<RoleChangeRequest>> {
    let raws: Vec<RawRoleRequest> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM role_requests ORDER BY created_at DESC, request_id DESC",
          RawRoleRequest::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawRoleRequest::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRoleRequest::into_request).collect()
  }

  async fn decide_role_request(
    &self,
    request_id: i64,
    decision: Decision,
    approver_id: i64,
    rejection_reason: Option<String>,
  ) -> Result<Decide<RoleChangeRequest>> {
    let now = encode_dt(Utc::now());
    let status = decision.terminal_status().as_str().to_owned();
    let approve = matches!(decision, Decision::Approve);

    let outcome: Decide<RawRoleRequest> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let raw = tx
          .query_row(
            &format!(
              "SELECT {} FROM role_requests WHERE request_id = ?1",
              RawRoleRequest::COLUMNS
            ),
            rusqlite::params![request_id],
            RawRoleRequest::from_row,
          )
          .optional()?;
        let Some(raw) = raw else {
          return Ok(Decide::NotFound);
        };

        // The status guard makes concurrent decides lose cleanly.
        let changed = tx.execute(
          "UPDATE role_requests
           SET status = ?2, approved_by = ?3, rejection_reason = ?4, decided_at = ?5
           WHERE request_id = ?1 AND status = 'pending'",
          rusqlite::params![request_id, status, approver_id, rejection_reason, now],
        )?;
        if changed == 0 {
          return Ok(Decide::AlreadyDecided);
        }

        if approve {
          tx.execute(
            "INSERT INTO profiles (identity_id, role, manager_subtype, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(identity_id) DO UPDATE SET
               role            = excluded.role,
               manager_subtype = excluded.manager_subtype,
               updated_at      = excluded.updated_at",
            rusqlite::params![
              raw.identity_id,
              raw.requested_role,
              raw.manager_subtype,
              now
            ],
          )?;
        }

        let decided = tx.query_row(
          &format!(
            "SELECT {} FROM role_requests WHERE request_id = ?1",
            RawRoleRequest::COLUMNS
          ),
          rusqlite::params![request_id],
          RawRoleRequest::from_row,
        )?;

        tx.commit()?;
        Ok(Decide::Applied(decided))
      })
      .await?;

    Ok(match outcome {
      Decide::Applied(raw) => Decide::Applied(raw.into_request()?),
      Decide::NotFound => Decide::NotFound,
      Decide::AlreadyDecided => Decide::AlreadyDecided,
    })
  }

  // ── Managed resources ──────────────────────────────────────────────────

  async fn create_resource(
    &self,
    kind: ResourceKind,
    write: ResourceWrite,
  ) -> Result<ManagedResource> {
    let now = encode_dt(Utc::now());

    let raw: RawResource = self
      .conn
      .call(move |conn| {
        let id = insert_resource_from_write(conn, kind, &write, &now)?;
        read_resource(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows.into())
      })
      .await?;

    raw.into_resource()
  }

  async fn get_resource(&self, resource_id: i64) -> Result<Option<ManagedResource>> {
    let raw: Option<RawResource> = self
      .conn
      .call(move |conn| Ok(read_resource(conn, resource_id)?))
      .await?;

    raw.map(RawResource::into_resource).transpose()
  }

  async fn list_resources(
    &self,
    kind: Option<ResourceKind>,
  ) -> Result<Vec<ManagedResource>> {
    let kind_str = kind.map(|k| k.as_str().to_owned());

    let raws: Vec<RawResource> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(k) = kind_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM resources WHERE kind = ?1 ORDER BY resource_id",
            RawResource::COLUMNS
          ))?;
          stmt
            .query_map(rusqlite::params![k], RawResource::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM resources ORDER BY resource_id",
            RawResource::COLUMNS
          ))?;
          stmt
            .query_map([], RawResource::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawResource::into_resource).collect()
  }

  async fn update_resource(
    &self,
    resource_id: i64,
    write: ResourceWrite,
  ) -> Result<Option<ManagedResource>> {
    let now = encode_dt(Utc::now());

    let raw: Option<RawResource> = self
      .conn
      .call(move |conn| {
        let changed = fold_resource_write(conn, resource_id, &write, &now)?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(read_resource(conn, resource_id)?)
      })
      .await?;

    raw.map(RawResource::into_resource).transpose()
  }

  // ── Resource-update requests ───────────────────────────────────────────

  async fn create_update_request(
    &self,
    input: NewResourceUpdateRequest,
  ) -> Result<ResourceUpdateRequest> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let proposed_json = serde_json::to_string(&input.proposed)?;
    let kind_str = input.kind.as_str().to_owned();
    let resource_id = input.resource_id;
    let requested_by = input.requested_by;

    let request_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO update_requests
             (resource_id, kind, requested_by, proposed, status, created_at)
           VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
          rusqlite::params![resource_id, kind_str, requested_by, proposed_json, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(ResourceUpdateRequest {
      request_id,
      resource_id: input.resource_id,
      kind: input.kind,
      requested_by: input.requested_by,
      proposed: input.proposed,
      status: RequestStatus::Pending,
      approved_by: None,
      rejection_reason: None,
      decided_at: None,
      created_at,
    })
  }

  async fn list_update_requests(
    &self,
    status: Option<RequestStatus>,
  ) -> Result<Vec<ResourceUpdateRequest>> {
    let status_str = status.map(|s| s.as_str().to_owned());

    let raws: Vec<RawUpdateRequest> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(s) = status_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM update_requests WHERE status = ?1
             ORDER BY created_at DESC, request_id DESC",
            RawUpdateRequest::COLUMNS
          ))?;
          stmt
            .query_map(rusqlite::params![s], RawUpdateRequest::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM update_requests
             ORDER BY created_at DESC, request_id DESC",
            RawUpdateRequest::COLUMNS
          ))?;
          stmt
            .query_map([], RawUpdateRequest::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawUpdateRequest::into_request)
      .collect()
  }

  async fn decide_update_request(
    &self,
    request_id: i64,
    decision: Decision,
    approver_id: i64,
    rejection_reason: Option<String>,
  ) -> Result<Decide<(ResourceUpdateRequest, Option<ManagedResource>)>> {
    let now = encode_dt(Utc::now());
    let status = decision.terminal_status().as_str().to_owned();
    let approve = matches!(decision, Decision::Approve);

    let outcome: Decide<(RawUpdateRequest, Option<RawResource>)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let raw = tx
          .query_row(
            &format!(
              "SELECT {} FROM update_requests WHERE request_id = ?1",
              RawUpdateRequest::COLUMNS
            ),
            rusqlite::params![request_id],
            RawUpdateRequest::from_row,
          )
          .optional()?;
        let Some(raw) = raw else {
          return Ok(Decide::NotFound);
        };

        let changed = tx.execute(
          "UPDATE update_requests
           SET status = ?2, approved_by = ?3, rejection_reason = ?4, decided_at = ?5
           WHERE request_id = ?1 AND status = 'pending'",
          rusqlite::params![request_id, status, approver_id, rejection_reason, now],
        )?;
        if changed == 0 {
          return Ok(Decide::AlreadyDecided);
        }

        let mut resource = None;
        if approve {
          let write: ResourceWrite =
            serde_json::from_str(&raw.proposed).map_err(other_err)?;
          let kind = crate::encode::decode_resource_kind(&raw.kind)
            .map_err(other_err)?;

          let target = match raw.resource_id {
            Some(id) => {
              fold_resource_write(&tx, id, &write, &now)?;
              id
            }
            None => {
              // Approval of a write against a not-yet-tracked facility
              // creates it and backfills the request's target.
              let id = insert_resource_from_write(&tx, kind, &write, &now)?;
              tx.execute(
                "UPDATE update_requests SET resource_id = ?2 WHERE request_id = ?1",
                rusqlite::params![request_id, id],
              )?;
              id
            }
          };
          resource = read_resource(&tx, target)?;
        }

        let decided = tx.query_row(
          &format!(
            "SELECT {} FROM update_requests WHERE request_id = ?1",
            RawUpdateRequest::COLUMNS
          ),
          rusqlite::params![request_id],
          RawUpdateRequest::from_row,
        )?;

        tx.commit()?;
        Ok(Decide::Applied((decided, resource)))
      })
      .await?;

    Ok(match outcome {
      Decide::Applied((raw, resource)) => Decide::Applied((
        raw.into_request()?,
        resource.map(RawResource::into_resource).transpose()?,
      )),
      Decide::NotFound => Decide::NotFound,
      Decide::AlreadyDecided => Decide::AlreadyDecided,
    })
  }

  // ── Room bookings ──────────────────────────────────────────────────────

  async fn create_booking(
    &self,
    requested_by: i64,
    input: NewRoomBookingRequest,
  ) -> Result<RoomBookingRequest> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let kind_str = input.kind.as_str().to_owned();
    let date_str = encode_date(input.date);
    let start_str = encode_time(input.start_time);
    let end_str = encode_time(input.end_time);
    let resource_id = input.resource_id;
    let purpose = input.purpose.clone();
    let attendees = input.expected_attendees;

    let booking_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO bookings
             (requested_by, kind, resource_id, purpose, expected_attendees,
              date, start_time, end_time, status, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pending', ?9)",
          rusqlite::params![
            requested_by,
            kind_str,
            resource_id,
            purpose,
            attendees,
            date_str,
            start_str,
            end_str,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(RoomBookingRequest {
      booking_id,
      requested_by,
      kind: input.kind,
      resource_id: input.resource_id,
      purpose: input.purpose,
      expected_attendees: input.expected_attendees,
      date: input.date,
      start_time: input.start_time,
      end_time: input.end_time,
      status: RequestStatus::Pending,
      approved_by: None,
      rejection_reason: None,
      decided_at: None,
      created_at,
    })
  }

  async fn list_bookings(
    &self,
    requested_by: Option<i64>,
  ) -> Result<Vec<RoomBookingRequest>> {
    let raws: Vec<RawBooking> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(owner) = requested_by {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM bookings WHERE requested_by = ?1
             ORDER BY created_at DESC, booking_id DESC",
            RawBooking::COLUMNS
          ))?;
          stmt
            .query_map(rusqlite::params![owner], RawBooking::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM bookings ORDER BY created_at DESC, booking_id DESC",
            RawBooking::COLUMNS
          ))?;
          stmt
            .query_map([], RawBooking::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBooking::into_booking).collect()
  }

  async fn decide_booking(
    &self,
    booking_id: i64,
    decision: Decision,
    approver_id: i64,
    assigned_resource: Option<i64>,
    rejection_reason: Option<String>,
  ) -> Result<Decide<RoomBookingRequest>> {
    let now = encode_dt(Utc::now());
    let status = decision.terminal_status().as_str().to_owned();
    let approve = matches!(decision, Decision::Approve);

    let outcome: Decide<RawBooking> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let raw = tx
          .query_row(
            &format!(
              "SELECT {} FROM bookings WHERE booking_id = ?1",
              RawBooking::COLUMNS
            ),
            rusqlite::params![booking_id],
            RawBooking::from_row,
          )
          .optional()?;
        let Some(raw) = raw else {
          return Ok(Decide::NotFound);
        };

        let changed = tx.execute(
          "UPDATE bookings
           SET status = ?2, approved_by = ?3, rejection_reason = ?4, decided_at = ?5
           WHERE booking_id = ?1 AND status = 'pending'",
          rusqlite::params![booking_id, status, approver_id, rejection_reason, now],
        )?;
        if changed == 0 {
          return Ok(Decide::AlreadyDecided);
        }

        if approve {
          // Unconditional flip: the room leaves the pool even if it was
          // already flagged unavailable.
          if let Some(target) = assigned_resource.or(raw.resource_id) {
            tx.execute(
              "UPDATE resources SET is_available = 0, updated_at = ?2
               WHERE resource_id = ?1",
              rusqlite::params![target, now],
            )?;
            tx.execute(
              "UPDATE bookings SET resource_id = ?2 WHERE booking_id = ?1",
              rusqlite::params![booking_id, target],
            )?;
          }
        }

        let decided = tx.query_row(
          &format!(
            "SELECT {} FROM bookings WHERE booking_id = ?1",
            RawBooking::COLUMNS
          ),
          rusqlite::params![booking_id],
          RawBooking::from_row,
        )?;

        tx.commit()?;
        Ok(Decide::Applied(decided))
      })
      .await?;

    Ok(match outcome {
      Decide::Applied(raw) => Decide::Applied(raw.into_booking()?),
      Decide::NotFound => Decide::NotFound,
      Decide::AlreadyDecided => Decide::AlreadyDecided,
    })
  }

  // ── Event records ──────────────────────────────────────────────────────

  async fn record_event(&self, input: NewEventRecord) -> Result<EventRecord> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let class_str = input.class.as_str().to_owned();
    let severity_str = input.severity.map(|s| s.as_str().to_owned());
    let reported_by = input.reported_by;
    let title = input.title.clone();
    let description = input.description.clone();
    let building = input.building.clone();
    let room = input.room.clone();
    let label = input.label.clone();
    let threshold_value = input.threshold_value;
    let observed_value = input.observed_value;

    let event_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO events
             (class, reported_by, title, description, building, room, label,
              severity, threshold_value, observed_value, status, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'open', ?11)",
          rusqlite::params![
            class_str,
            reported_by,
            title,
            description,
            building,
            room,
            label,
            severity_str,
            threshold_value,
            observed_value,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(EventRecord {
      event_id,
      class: input.class,
      reported_by: input.reported_by,
      title: input.title,
      description: input.description,
      building: input.building,
      room: input.room,
      label: input.label,
      severity: input.severity,
      threshold_value: input.threshold_value,
      observed_value: input.observed_value,
      status: quad_core::event::EventStatus::Open,
      assigned_to: None,
      created_at,
    })
  }

  async fn get_event(&self, event_id: i64) -> Result<Option<EventRecord>> {
    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM events WHERE event_id = ?1",
                RawEvent::COLUMNS
              ),
              rusqlite::params![event_id],
              RawEvent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn list_events(
    &self,
    class: EventClass,
    since: Option<DateTime<Utc>>,
    reported_by: Option<i64>,
  ) -> Result<Vec<EventRecord>> {
    let class_str = class.as_str().to_owned();
    // RFC 3339 UTC strings compare lexicographically in timestamp order.
    let since_str = since.map(encode_dt);

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM events
           WHERE class = ?1
             AND (?2 IS NULL OR created_at >= ?2)
             AND (?3 IS NULL OR reported_by = ?3)
           ORDER BY created_at DESC, event_id DESC",
          RawEvent::COLUMNS
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![class_str, since_str, reported_by],
            RawEvent::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn triage_event(
    &self,
    event_id: i64,
    triage: EventTriage,
  ) -> Result<Option<EventRecord>> {
    let status_str = triage.status.map(|s| s.as_str().to_owned());
    let severity_str = triage.severity.map(|s| s.as_str().to_owned());
    let assigned_to = triage.assigned_to;

    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE events SET
             status      = COALESCE(?2, status),
             assigned_to = COALESCE(?3, assigned_to),
             severity    = COALESCE(?4, severity)
           WHERE event_id = ?1",
          rusqlite::params![event_id, status_str, assigned_to, severity_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM events WHERE event_id = ?1",
                RawEvent::COLUMNS
              ),
              rusqlite::params![event_id],
              RawEvent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  // ── Notifications ──────────────────────────────────────────────────────

  async fn create_notification(
    &self,
    input: NewNotification,
  ) -> Result<Notification> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let identity_id = input.identity_id;
    let title = input.title.clone();
    let message = input.message.clone();
    let link = input.link.clone();

    let notification_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (identity_id, title, message, link, is_read, created_at)
           VALUES (?1, ?2, ?3, ?4, 0, ?5)",
          rusqlite::params![identity_id, title, message, link, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Notification {
      notification_id,
      identity_id: input.identity_id,
      title: input.title,
      message: input.message,
      link: input.link,
      is_read: false,
      created_at,
    })
  }

  async fn list_notifications(
    &self,
    identity_id: i64,
    limit: usize,
  ) -> Result<Vec<Notification>> {
    let limit = limit as i64;

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM notifications WHERE identity_id = ?1
           ORDER BY is_read ASC, created_at DESC, notification_id DESC
           LIMIT ?2",
          RawNotification::COLUMNS
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![identity_id, limit],
            RawNotification::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawNotification::into_notification)
      .collect()
  }

  async fn unread_notification_count(&self, identity_id: i64) -> Result<i64> {
    let count = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM notifications
           WHERE identity_id = ?1 AND is_read = 0",
          rusqlite::params![identity_id],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count)
  }

  async fn mark_notification_read(
    &self,
    notification_id: i64,
    identity_id: i64,
  ) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE notifications SET is_read = 1
           WHERE notification_id = ?1 AND identity_id = ?2",
          rusqlite::params![notification_id, identity_id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn mark_all_notifications_read(&self, identity_id: i64) -> Result<i64> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE notifications SET is_read = 1
           WHERE identity_id = ?1 AND is_read = 0",
          rusqlite::params![identity_id],
        )?)
      })
      .await?;
    Ok(changed as i64)
  }

  // ── Admin read surface ─────────────────────────────────────────────────

  async fn list_identity_profiles(
    &self,
  ) -> Result<Vec<(Identity, CapabilityProfile)>> {
    let (identities, profiles): (Vec<RawIdentity>, Vec<RawProfile>) = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM identities ORDER BY identity_id",
          RawIdentity::COLUMNS
        ))?;
        let identities = stmt
          .query_map([], RawIdentity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn
          .prepare(&format!("SELECT {} FROM profiles", RawProfile::COLUMNS))?;
        let profiles = stmt
          .query_map([], RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((identities, profiles))
      })
      .await?;

    let mut by_identity: HashMap<i64, CapabilityProfile> = HashMap::new();
    for raw in profiles {
      let profile = raw.into_profile()?;
      by_identity.insert(profile.identity_id, profile);
    }

    identities
      .into_iter()
      .map(|raw| {
        let identity = raw.into_identity()?;
        // Profiles are provisioned lazily; absent ones read as the default.
        let profile = by_identity.remove(&identity.identity_id).unwrap_or(
          CapabilityProfile {
            identity_id:     identity.identity_id,
            role:            Role::Student,
            manager_subtype: None,
            updated_at:      identity.created_at,
          },
        );
        Ok((identity, profile))
      })
      .collect()
  }

  async fn admin_stats(&self) -> Result<AdminStats> {
    let (role_rows, open_faults, total_faults, pending_role_requests) = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT COALESCE(p.role, 'student'), COUNT(*)
           FROM identities i
           LEFT JOIN profiles p ON p.identity_id = i.identity_id
           GROUP BY COALESCE(p.role, 'student')
           ORDER BY 1",
        )?;
        let role_rows = stmt
          .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let open_faults = conn.query_row(
          "SELECT COUNT(*) FROM events WHERE class = 'fault' AND status = 'open'",
          [],
          |row| row.get::<_, i64>(0),
        )?;
        let total_faults = conn.query_row(
          "SELECT COUNT(*) FROM events WHERE class = 'fault'",
          [],
          |row| row.get::<_, i64>(0),
        )?;
        let pending = conn.query_row(
          "SELECT COUNT(*) FROM role_requests WHERE status = 'pending'",
          [],
          |row| row.get::<_, i64>(0),
        )?;

        Ok((role_rows, open_faults, total_faults, pending))
      })
      .await?;

    let users_by_role = role_rows
      .into_iter()
      .map(|(role, count)| {
        Ok(RoleCount { role: decode_role(&role)?, count })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(AdminStats {
      users_by_role,
      open_faults,
      total_faults,
      pending_role_requests,
    })
  }
}

//! SQL schema for the Quad SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    is_superuser  INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- One capability profile per identity, provisioned lazily with the
-- default role on first resolution.
CREATE TABLE IF NOT EXISTS profiles (
    identity_id     INTEGER PRIMARY KEY REFERENCES identities(identity_id),
    role            TEXT NOT NULL DEFAULT 'student',
    manager_subtype TEXT,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS role_requests (
    request_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_id      INTEGER NOT NULL REFERENCES identities(identity_id),
    requested_role   TEXT NOT NULL,
    manager_subtype  TEXT,
    reason           TEXT NOT NULL DEFAULT '',
    status           TEXT NOT NULL DEFAULT 'pending',
    approved_by      INTEGER REFERENCES identities(identity_id),
    rejection_reason TEXT,
    decided_at       TEXT,
    created_at       TEXT NOT NULL
);

-- At most one pending request per (identity, requested role).
CREATE UNIQUE INDEX IF NOT EXISTS role_requests_pending_idx
    ON role_requests(identity_id, requested_role) WHERE status = 'pending';

CREATE TABLE IF NOT EXISTS resources (
    resource_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    kind              TEXT NOT NULL,   -- 'library' | 'lab' | 'classroom'
    name              TEXT NOT NULL,
    building          TEXT,
    room              TEXT,
    max_capacity      INTEGER NOT NULL DEFAULT 100,
    current_occupancy INTEGER NOT NULL DEFAULT 0,
    is_available      INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS update_requests (
    request_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    resource_id      INTEGER REFERENCES resources(resource_id),
    kind             TEXT NOT NULL,
    requested_by     INTEGER NOT NULL REFERENCES identities(identity_id),
    proposed         TEXT NOT NULL,   -- JSON-encoded ResourceWrite
    status           TEXT NOT NULL DEFAULT 'pending',
    approved_by      INTEGER REFERENCES identities(identity_id),
    rejection_reason TEXT,
    decided_at       TEXT,
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bookings (
    booking_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    requested_by       INTEGER NOT NULL REFERENCES identities(identity_id),
    kind               TEXT NOT NULL,
    resource_id        INTEGER REFERENCES resources(resource_id),
    purpose            TEXT NOT NULL DEFAULT '',
    expected_attendees INTEGER NOT NULL DEFAULT 1,
    date               TEXT NOT NULL,  -- YYYY-MM-DD
    start_time         TEXT NOT NULL,  -- HH:MM:SS
    end_time           TEXT NOT NULL,
    status             TEXT NOT NULL DEFAULT 'pending',
    approved_by        INTEGER REFERENCES identities(identity_id),
    rejection_reason   TEXT,
    decided_at         TEXT,
    created_at         TEXT NOT NULL
);

-- Event records are append-only apart from triage fields
-- (status / assigned_to / severity).
CREATE TABLE IF NOT EXISTS events (
    event_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    class           TEXT NOT NULL,    -- 'fault' | 'overload'
    reported_by     INTEGER REFERENCES identities(identity_id),
    title           TEXT NOT NULL DEFAULT '',
    description     TEXT NOT NULL DEFAULT '',
    building        TEXT NOT NULL DEFAULT '',
    room            TEXT NOT NULL DEFAULT '',
    label           TEXT NOT NULL,
    severity        TEXT,
    threshold_value REAL,
    observed_value  REAL,
    status          TEXT NOT NULL DEFAULT 'open',
    assigned_to     TEXT,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_id     INTEGER NOT NULL REFERENCES identities(identity_id),
    title           TEXT NOT NULL,
    message         TEXT NOT NULL,
    link            TEXT,
    is_read         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS role_requests_identity_idx ON role_requests(identity_id);
CREATE INDEX IF NOT EXISTS events_class_created_idx   ON events(class, created_at);
CREATE INDEX IF NOT EXISTS events_group_idx           ON events(building, room, label);
CREATE INDEX IF NOT EXISTS notifications_owner_idx    ON notifications(identity_id, is_read);

PRAGMA user_version = 1;
";

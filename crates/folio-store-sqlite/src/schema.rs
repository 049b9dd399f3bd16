//! SQL schema for the Folio SQLite store.
//!
//! Executed once at connection startup. Migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    display_name  TEXT NOT NULL,
    sysadmin      INTEGER NOT NULL DEFAULT 0,
    password_hash TEXT,              -- argon2 PHC string
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS organizations (
    org_id     TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    title      TEXT NOT NULL,
    state      TEXT NOT NULL DEFAULT 'active',   -- 'active' | 'deleted'
    created_at TEXT NOT NULL
);

-- Names are only reserved by live organizations.
CREATE UNIQUE INDEX IF NOT EXISTS organizations_name_idx
    ON organizations(name) WHERE state != 'deleted';

-- One capacity per (user, organization).
CREATE TABLE IF NOT EXISTS memberships (
    user_id  TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    org_id   TEXT NOT NULL REFERENCES organizations(org_id),
    capacity TEXT NOT NULL,          -- 'member' | 'editor' | 'admin'
    PRIMARY KEY (user_id, org_id)
);

CREATE TABLE IF NOT EXISTS datasets (
    dataset_id        TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    title             TEXT NOT NULL,
    notes             TEXT,
    owner_org         TEXT REFERENCES organizations(org_id),
    private           INTEGER NOT NULL DEFAULT 0,
    state             TEXT NOT NULL,  -- 'draft' | 'active' | 'deleted'
    creator_user_id   TEXT REFERENCES users(user_id),
    tags              TEXT NOT NULL DEFAULT '[]',
    metadata_created  TEXT NOT NULL,
    metadata_modified TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS datasets_name_idx
    ON datasets(name) WHERE state != 'deleted';
CREATE INDEX IF NOT EXISTS datasets_owner_idx ON datasets(owner_org);

CREATE TABLE IF NOT EXISTS resources (
    resource_id TEXT PRIMARY KEY,
    dataset_id  TEXT NOT NULL REFERENCES datasets(dataset_id) ON DELETE CASCADE,
    url         TEXT NOT NULL,
    name        TEXT,
    description TEXT,
    format      TEXT,
    position    INTEGER NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS resources_dataset_idx ON resources(dataset_id, position);

CREATE TABLE IF NOT EXISTS resource_views (
    view_id     TEXT PRIMARY KEY,
    resource_id TEXT NOT NULL REFERENCES resources(resource_id) ON DELETE CASCADE,
    view_type   TEXT NOT NULL,
    title       TEXT NOT NULL,
    description TEXT,
    position    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS resource_views_resource_idx
    ON resource_views(resource_id, position);

-- Append-only apart from administrative deletion. `seq` breaks ties
-- between activities recorded within the same timestamp.
CREATE TABLE IF NOT EXISTS activities (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    activity_id    TEXT NOT NULL UNIQUE,
    object_id      TEXT NOT NULL,
    org_id         TEXT,
    actor          TEXT NOT NULL,    -- user id or 'system'
    activity_type  TEXT NOT NULL,
    timestamp      TEXT NOT NULL,    -- RFC 3339 UTC, fixed microsecond width
    schema_version INTEGER NOT NULL,
    data_json      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS activities_object_idx
    ON activities(object_id, timestamp, seq);
CREATE INDEX IF NOT EXISTS activities_org_idx
    ON activities(org_id, timestamp, seq);

CREATE TABLE IF NOT EXISTS followers (
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    dataset_id TEXT NOT NULL REFERENCES datasets(dataset_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, dataset_id)
);

PRAGMA user_version = 1;
";

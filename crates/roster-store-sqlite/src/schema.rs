//! SQL schema for the Roster SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS contacts (
    contact_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT,
    avatar      TEXT,
    favorite    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL       -- ISO 8601 UTC; server-assigned
);

CREATE TABLE IF NOT EXISTS companies (
    company_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    logo        TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS groups (
    group_id    TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    tag_id      TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    color       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- Join relations. Group and company membership are exclusive per contact;
-- the single-column UNIQUE indexes enforce that at the data layer.
CREATE TABLE IF NOT EXISTS contact_companies (
    contact_id  TEXT NOT NULL REFERENCES contacts(contact_id),
    company_id  TEXT NOT NULL REFERENCES companies(company_id),
    recorded_at TEXT NOT NULL,
    UNIQUE (contact_id, company_id),
    UNIQUE (contact_id)
);

CREATE TABLE IF NOT EXISTS contact_groups (
    contact_id  TEXT NOT NULL REFERENCES contacts(contact_id),
    group_id    TEXT NOT NULL REFERENCES groups(group_id),
    recorded_at TEXT NOT NULL,
    UNIQUE (contact_id, group_id),
    UNIQUE (contact_id)
);

CREATE TABLE IF NOT EXISTS contact_tags (
    contact_id  TEXT NOT NULL REFERENCES contacts(contact_id),
    tag_id      TEXT NOT NULL REFERENCES tags(tag_id),
    recorded_at TEXT NOT NULL,
    UNIQUE (contact_id, tag_id)
);

-- Per-user pins, one relation per entity kind.
CREATE TABLE IF NOT EXISTS favorite_companies (
    user_id     TEXT NOT NULL,
    company_id  TEXT NOT NULL REFERENCES companies(company_id),
    recorded_at TEXT NOT NULL,
    UNIQUE (user_id, company_id)
);

CREATE TABLE IF NOT EXISTS favorite_groups (
    user_id     TEXT NOT NULL,
    group_id    TEXT NOT NULL REFERENCES groups(group_id),
    recorded_at TEXT NOT NULL,
    UNIQUE (user_id, group_id)
);

CREATE TABLE IF NOT EXISTS favorite_tags (
    user_id     TEXT NOT NULL,
    tag_id      TEXT NOT NULL REFERENCES tags(tag_id),
    recorded_at TEXT NOT NULL,
    UNIQUE (user_id, tag_id)
);

CREATE TABLE IF NOT EXISTS entity_notes (
    note_id     TEXT PRIMARY KEY,
    entity_kind TEXT NOT NULL,       -- 'company' | 'group' | 'tag'
    entity_id   TEXT NOT NULL,
    author      TEXT NOT NULL,
    body        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entity_tasks (
    task_id     TEXT PRIMARY KEY,
    entity_kind TEXT NOT NULL,
    entity_id   TEXT NOT NULL,
    title       TEXT NOT NULL,
    done        INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

-- Strictly append-only. No UPDATE or DELETE is ever issued against this
-- table.
CREATE TABLE IF NOT EXISTS activity_log (
    entry_id    TEXT PRIMARY KEY,
    actor       TEXT NOT NULL,
    action      TEXT NOT NULL,
    target_kind TEXT NOT NULL,       -- 'contact' | 'company' | 'group' | 'tag'
    target_id   TEXT NOT NULL,
    detail      TEXT NOT NULL DEFAULT 'null',  -- JSON payload
    description TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS contact_companies_company_idx ON contact_companies(company_id);
CREATE INDEX IF NOT EXISTS contact_groups_group_idx      ON contact_groups(group_id);
CREATE INDEX IF NOT EXISTS contact_tags_tag_idx          ON contact_tags(tag_id);
CREATE INDEX IF NOT EXISTS entity_notes_entity_idx       ON entity_notes(entity_kind, entity_id);
CREATE INDEX IF NOT EXISTS entity_tasks_entity_idx       ON entity_tasks(entity_kind, entity_id);
CREATE INDEX IF NOT EXISTS activity_recorded_idx         ON activity_log(recorded_at);

PRAGMA user_version = 1;
";

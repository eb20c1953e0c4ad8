//! SQL schema for the jotter SQLite store.
//!
//! Payload versions are tracked per row in `actions.schema`; progress of the
//! data migrations over those rows is tracked in `system`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Append-only log of user mutations. Only migrations rewrite `schema` and
-- `data`; `type` and `timestamp` are never updated.
CREATE TABLE IF NOT EXISTS actions (
    uuid      TEXT PRIMARY KEY,
    schema    INTEGER NOT NULL,
    type      TEXT NOT NULL,     -- 'add_note' | 'edit_note' | 'remove_note' | 'add_book' | 'remove_book'
    data      TEXT NOT NULL,     -- JSON payload, shape given by (type, schema)
    timestamp INTEGER NOT NULL   -- epoch seconds
);

CREATE TABLE IF NOT EXISTS books (
    uuid  TEXT PRIMARY KEY,
    label TEXT NOT NULL UNIQUE
);

-- Key/value settings; holds the migration counters.
CREATE TABLE IF NOT EXISTS system (
    key   TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS actions_type_schema_idx ON actions(type, schema);
";

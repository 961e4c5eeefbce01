//! SQL schema for the enerscore SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.
//!
//! Aggregate maintenance and alert evaluation are NOT database triggers —
//! they run as explicit pipeline stages in `store.rs`, inside the same
//! transaction as the measurement upsert.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS regions (
    region_id   TEXT PRIMARY KEY,   -- slug, e.g. 'NG-LA'
    name        TEXT NOT NULL,
    boundary    TEXT,               -- GeoJSON geometry, stored verbatim
    properties  TEXT NOT NULL DEFAULT '{}',
    created_at  TEXT NOT NULL       -- ISO 8601 UTC
);

-- One row per (time, region, source); later inserts at the same key
-- overwrite in place. Rows are never deleted.
CREATE TABLE IF NOT EXISTS measurements (
    recorded_at    TEXT NOT NULL,
    region_id      TEXT NOT NULL REFERENCES regions(region_id),
    source         TEXT NOT NULL,   -- 'solar' | 'wind' | 'hydro' | 'composite'
    raw_value      REAL NOT NULL,
    normalized     REAL NOT NULL CHECK (normalized >= 0.0 AND normalized <= 1.0),
    classification TEXT NOT NULL DEFAULT 'null',
    ingested_at    TEXT NOT NULL,   -- server-assigned; updated on upsert
    PRIMARY KEY (recorded_at, region_id, source)
);

-- Exactly one row per (day, region, source); replaced wholesale whenever a
-- measurement lands in the period.
CREATE TABLE IF NOT EXISTS daily_aggregates (
    day          TEXT NOT NULL,     -- 'YYYY-MM-DD'
    region_id    TEXT NOT NULL REFERENCES regions(region_id),
    source       TEXT NOT NULL,
    sample_count INTEGER NOT NULL,
    mean         REAL NOT NULL,
    min          REAL NOT NULL,
    max          REAL NOT NULL,
    stddev       REAL,              -- NULL for a single sample
    p50          REAL NOT NULL,
    p90          REAL NOT NULL,
    computed_at  TEXT NOT NULL,
    PRIMARY KEY (day, region_id, source)
);

CREATE TABLE IF NOT EXISTS monthly_aggregates (
    year         INTEGER NOT NULL,
    month        INTEGER NOT NULL,
    region_id    TEXT NOT NULL REFERENCES regions(region_id),
    source       TEXT NOT NULL,
    sample_count INTEGER NOT NULL,
    mean         REAL NOT NULL,
    min          REAL NOT NULL,
    max          REAL NOT NULL,
    stddev       REAL,
    p50          REAL NOT NULL,
    p90          REAL NOT NULL,
    computed_at  TEXT NOT NULL,
    PRIMARY KEY (year, month, region_id, source)
);

CREATE TABLE IF NOT EXISTS alert_rules (
    rule_id       TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    source        TEXT NOT NULL,
    threshold     REAL NOT NULL,
    severity      TEXT NOT NULL,    -- 'info' | 'warning' | 'critical'
    enabled       INTEGER NOT NULL DEFAULT 1,
    notify        TEXT NOT NULL DEFAULT '[]',  -- JSON array of targets
    suppress_secs INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL
);

-- Alert events are append-only; only state and state_changed_at change.
CREATE TABLE IF NOT EXISTS alert_events (
    event_id         TEXT PRIMARY KEY,
    rule_id          TEXT NOT NULL REFERENCES alert_rules(rule_id),
    region_id        TEXT NOT NULL REFERENCES regions(region_id),
    source           TEXT NOT NULL,
    recorded_at      TEXT NOT NULL,  -- of the triggering measurement
    current_value    REAL NOT NULL,  -- recorded verbatim at firing time
    threshold_value  REAL NOT NULL,
    severity         TEXT NOT NULL,
    state            TEXT NOT NULL DEFAULT 'active',
    fired_at         TEXT NOT NULL,
    state_changed_at TEXT NOT NULL
);

-- Quality log: one row per ingested batch, whole-batch outcome only.
CREATE TABLE IF NOT EXISTS ingest_log (
    ingest_id  TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    status     TEXT NOT NULL,        -- 'success' | 'warning' | 'error'
    accepted   INTEGER NOT NULL,
    rejected   INTEGER NOT NULL,
    message    TEXT
);

CREATE INDEX IF NOT EXISTS measurements_key_idx
    ON measurements(region_id, source, recorded_at);
CREATE INDEX IF NOT EXISTS alert_events_rule_idx  ON alert_events(rule_id);
CREATE INDEX IF NOT EXISTS alert_events_state_idx ON alert_events(state);
CREATE INDEX IF NOT EXISTS ingest_log_started_idx ON ingest_log(started_at);

-- Latest measurement per (region, source) key.
CREATE VIEW IF NOT EXISTS current_measurements AS
SELECT m.*
FROM measurements m
WHERE m.recorded_at = (
    SELECT MAX(recorded_at) FROM measurements
    WHERE region_id = m.region_id AND source = m.source
);

PRAGMA user_version = 1;
";

//! Schema

use rusqlite::Connection;

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS principals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    full_name TEXT,
    role TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    consent_given INTEGER NOT NULL DEFAULT 0,
    consent_at TEXT,
    pseudonym TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS biometric_descriptors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    principal_id INTEGER NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
    modality TEXT NOT NULL,
    ciphertext BLOB NOT NULL,
    shape TEXT NOT NULL,
    element_type TEXT NOT NULL,
    quality_score REAL NOT NULL,
    enrolled_at TEXT NOT NULL,
    last_used_at TEXT,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_descriptors_active
    ON biometric_descriptors(principal_id, modality) WHERE is_active = 1;

CREATE TABLE IF NOT EXISTS actions (
    action_id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    description TEXT NOT NULL,
    requester_id INTEGER NOT NULL,
    status TEXT NOT NULL,
    metadata TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    approver_id INTEGER,
    approval_method TEXT,
    approved_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_actions_status ON actions(status, expires_at);

CREATE TABLE IF NOT EXISTS audit_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    principal_id INTEGER REFERENCES principals(id) ON DELETE SET NULL,
    pseudonym TEXT,
    summary TEXT NOT NULL,
    category TEXT NOT NULL,
    status TEXT NOT NULL,
    modality TEXT,
    similarity_score REAL,
    action_id TEXT,
    detail TEXT,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_principal ON audit_events(principal_id);
CREATE INDEX IF NOT EXISTS idx_audit_category ON audit_events(category);
CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_events(timestamp);
"#;

pub(crate) fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

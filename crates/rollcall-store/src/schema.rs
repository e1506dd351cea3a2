/// Schema applied on every open. Idempotent.
///
/// `identities` relies on the implicit rowid for enrollment order.
/// Timestamps are fixed-width RFC 3339 UTC strings, so text order is
/// chronological order.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS identities (
    identity_key TEXT NOT NULL PRIMARY KEY,
    display_name TEXT NOT NULL,
    embedding    BLOB NOT NULL,
    enrolled_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS attendance (
    event_id     TEXT NOT NULL PRIMARY KEY,
    identity_key TEXT NOT NULL,
    display_name TEXT NOT NULL,
    timestamp    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS attendance_by_time ON attendance (timestamp);
CREATE INDEX IF NOT EXISTS attendance_by_identity ON attendance (identity_key);
";

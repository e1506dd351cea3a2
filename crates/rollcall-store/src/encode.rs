//! Conversions between domain types and SQLite column values.
//!
//! Timestamps are RFC 3339 UTC strings with microsecond precision.
//! Embeddings are little-endian `f32` blobs. Event ids are hyphenated
//! lowercase UUIDs.

use chrono::{DateTime, SecondsFormat, Utc};
use rollcall_core::{AttendanceEvent, EmbeddingVector, Identity};
use uuid::Uuid;

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_uuid(id: Uuid) -> String {
    id.hyphenated().to_string()
}

/// `identities` row as read from SQLite.
pub struct RawIdentity {
    pub identity_key: String,
    pub display_name: String,
    pub embedding: Vec<u8>,
    pub enrolled_at: String,
}

impl RawIdentity {
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            identity_key: row.get(0)?,
            display_name: row.get(1)?,
            embedding: row.get(2)?,
            enrolled_at: row.get(3)?,
        })
    }

    pub fn into_identity(self, dim: usize) -> Result<Identity> {
        Ok(Identity {
            embedding: EmbeddingVector::from_bytes(&self.embedding, dim)?,
            enrolled_at: decode_dt(&self.enrolled_at)?,
            identity_key: self.identity_key,
            display_name: self.display_name,
        })
    }
}

/// `attendance` row as read from SQLite.
pub struct RawEvent {
    pub event_id: String,
    pub identity_key: String,
    pub display_name: String,
    pub timestamp: String,
}

impl RawEvent {
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            event_id: row.get(0)?,
            identity_key: row.get(1)?,
            display_name: row.get(2)?,
            timestamp: row.get(3)?,
        })
    }

    pub fn into_event(self) -> Result<AttendanceEvent> {
        Ok(AttendanceEvent {
            event_id: Uuid::parse_str(&self.event_id)?,
            timestamp: decode_dt(&self.timestamp)?,
            identity_key: self.identity_key,
            display_name: self.display_name,
        })
    }
}

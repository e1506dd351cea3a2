use crate::embedding::EmbeddingVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One enrolled person. Never updated after enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Externally assigned unique key (roll or badge number).
    pub identity_key: String,
    pub display_name: String,
    pub embedding: EmbeddingVector,
    pub enrolled_at: DateTime<Utc>,
}

/// One recognized presence. Append-only.
///
/// `identity_key` and `display_name` are copied from the identity at the
/// time of the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub event_id: Uuid,
    pub identity_key: String,
    pub display_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of matching a probe embedding against the enrolled gallery.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    NoMatch,
    Match {
        identity_key: String,
        display_name: String,
        /// Cosine similarity of the best candidate; strictly above the threshold.
        score: f32,
    },
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Match { .. })
    }
}

/// Outcome of the registration flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EnrollmentOutcome {
    /// A new identity was stored under the caller's key and name.
    Enrolled {
        identity_key: String,
        display_name: String,
    },
    /// The face was already on file; attendance was recorded for the
    /// existing identity instead, ignoring the caller's key and name.
    AttendanceMarkedForExisting {
        identity_key: String,
        display_name: String,
    },
}

/// Outcome of the attendance-marking flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MarkOutcome {
    Marked { event: AttendanceEvent },
    NotRecognized,
}

/// Attendance count for one display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityCount {
    pub display_name: String,
    pub count: u64,
}

/// Events falling into one (day-of-week, hour-of-day) bucket.
///
/// `day_of_week` counts from Sunday = 0; both fields are taken from the
/// event timestamp in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OccupancyBucket {
    pub day_of_week: u8,
    pub hour_of_day: u8,
    pub count: u64,
}

/// Heatmap cell in the `{x: "9:00", y: day, v: count}` shape used by
/// reporting front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub x: String,
    pub y: u8,
    pub v: u64,
}

impl From<OccupancyBucket> for HeatmapPoint {
    fn from(b: OccupancyBucket) -> Self {
        Self {
            x: format!("{}:00", b.hour_of_day),
            y: b.day_of_week,
            v: b.count,
        }
    }
}

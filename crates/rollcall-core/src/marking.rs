//! Attendance-marking flow: recognize an enrolled face and log it.

use std::sync::Arc;

use crate::embedding::EmbeddingVector;
use crate::error::Result;
use crate::matcher::{CosineMatcher, Matcher, SimilarityMatcher};
use crate::recorder::AttendanceRecorder;
use crate::store::{AttendanceLog, EmbeddingStore};
use crate::types::{MarkOutcome, MatchResult};

/// Marks attendance for recognized faces. Unknown faces are not enrolled.
///
/// Runs without the enrollment lock: two near-simultaneous captures of one
/// person simply produce two events.
pub struct AttendanceMarker<S, L, M = CosineMatcher> {
    matcher: Arc<SimilarityMatcher<S, M>>,
    recorder: Arc<AttendanceRecorder<L>>,
}

impl<S, L, M> AttendanceMarker<S, L, M>
where
    S: EmbeddingStore,
    L: AttendanceLog,
    M: Matcher,
{
    pub fn new(
        matcher: Arc<SimilarityMatcher<S, M>>,
        recorder: Arc<AttendanceRecorder<L>>,
    ) -> Self {
        Self { matcher, recorder }
    }

    pub async fn mark(&self, probe: &EmbeddingVector) -> Result<MarkOutcome> {
        match self.matcher.best_match(probe).await? {
            MatchResult::Match { identity_key, display_name, .. } => {
                let event = self
                    .recorder
                    .record_attendance(&identity_key, &display_name)
                    .await?;
                Ok(MarkOutcome::Marked { event })
            }
            MatchResult::NoMatch => Ok(MarkOutcome::NotRecognized),
        }
    }
}

//! Registration flow: enroll a new face, or mark attendance if the face is
//! already on file.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::embedding::EmbeddingVector;
use crate::error::Result;
use crate::matcher::{CosineMatcher, Matcher, SimilarityMatcher};
use crate::recorder::AttendanceRecorder;
use crate::store::{AttendanceLog, EmbeddingStore};
use crate::types::{EnrollmentOutcome, Identity, MatchResult};

/// Enrolls identities, deduplicating by face.
///
/// A face that already matches an enrolled identity is never enrolled a
/// second time: attendance is recorded for the existing identity and the
/// caller-supplied key and name are discarded.
///
/// Match and insert run as one step inside the store
/// ([`EmbeddingStore::insert_unless_matched`]), so concurrent captures of
/// the same person enroll once even across services or processes sharing
/// a backend.
pub struct EnrollmentService<S, L, M = CosineMatcher> {
    store: Arc<S>,
    matcher: Arc<SimilarityMatcher<S, M>>,
    recorder: Arc<AttendanceRecorder<L>>,
    clock: Arc<dyn Clock>,
}

impl<S, L, M> EnrollmentService<S, L, M>
where
    S: EmbeddingStore + 'static,
    L: AttendanceLog,
    M: Matcher + 'static,
{
    pub fn new(
        store: Arc<S>,
        matcher: Arc<SimilarityMatcher<S, M>>,
        recorder: Arc<AttendanceRecorder<L>>,
    ) -> Self {
        Self::with_clock(store, matcher, recorder, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<S>,
        matcher: Arc<SimilarityMatcher<S, M>>,
        recorder: Arc<AttendanceRecorder<L>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, matcher, recorder, clock }
    }

    /// Enroll `probe` under `identity_key`/`display_name`, unless the face
    /// is already enrolled.
    ///
    /// The probe must come from a capture with exactly one face
    /// (see [`single_face`](crate::detection::single_face)).
    pub async fn enroll(
        &self,
        identity_key: &str,
        display_name: &str,
        probe: EmbeddingVector,
    ) -> Result<EnrollmentOutcome> {
        let matcher = Arc::clone(&self.matcher);
        let candidate = probe.clone();
        let identity = Identity {
            identity_key: identity_key.to_string(),
            display_name: display_name.to_string(),
            embedding: probe,
            enrolled_at: self.clock.now(),
        };

        let result = self
            .store
            .insert_unless_matched(identity, move |gallery| {
                matcher.match_snapshot(&candidate, gallery)
            })
            .await?;

        match result {
            MatchResult::Match { identity_key: existing_key, display_name: existing_name, score } => {
                tracing::info!(
                    requested_key = identity_key,
                    %existing_key,
                    score,
                    "face already enrolled; marking attendance for existing identity"
                );
                self.recorder
                    .record_attendance(&existing_key, &existing_name)
                    .await?;
                Ok(EnrollmentOutcome::AttendanceMarkedForExisting {
                    identity_key: existing_key,
                    display_name: existing_name,
                })
            }
            MatchResult::NoMatch => {
                tracing::info!(identity_key, display_name, "identity enrolled");
                Ok(EnrollmentOutcome::Enrolled {
                    identity_key: identity_key.to_string(),
                    display_name: display_name.to_string(),
                })
            }
        }
    }
}

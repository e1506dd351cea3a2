use std::sync::Arc;

use crate::aggregate::AttendanceAggregator;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::detection::{single_face, Detection};
use crate::enrollment::EnrollmentService;
use crate::error::Result;
use crate::marking::AttendanceMarker;
use crate::matcher::SimilarityMatcher;
use crate::recorder::AttendanceRecorder;
use crate::store::{AttendanceLog, EmbeddingStore};
use crate::types::{
    AttendanceEvent, EnrollmentOutcome, HeatmapPoint, Identity, IdentityCount, MarkOutcome,
    OccupancyBucket,
};

/// Wires the matcher, recorder, enrollment and reporting components over a
/// single backend that stores both identities and attendance.
///
/// Takes raw detections from the capture pipeline and enforces the
/// exactly-one-face rule before anything reaches the matcher.
pub struct Engine<B> {
    store: Arc<B>,
    config: EngineConfig,
    enrollment: EnrollmentService<B, B>,
    marker: AttendanceMarker<B, B>,
    aggregator: AttendanceAggregator<B, B>,
}

impl<B: EmbeddingStore + AttendanceLog + 'static> Engine<B> {
    pub fn new(store: Arc<B>, config: EngineConfig) -> Result<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<B>, config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let matcher = Arc::new(SimilarityMatcher::new(store.clone(), config)?);
        let recorder = Arc::new(AttendanceRecorder::with_clock(store.clone(), clock.clone()));
        let enrollment =
            EnrollmentService::with_clock(store.clone(), matcher.clone(), recorder.clone(), clock);
        let marker = AttendanceMarker::new(matcher, recorder);
        let aggregator = AttendanceAggregator::new(store.clone(), store.clone());

        tracing::debug!(
            threshold = config.similarity_threshold,
            dim = config.embedding_dim,
            "engine ready"
        );

        Ok(Self { store, config, enrollment, marker, aggregator })
    }

    /// Registration flow for one capture.
    pub async fn enroll(
        &self,
        identity_key: &str,
        display_name: &str,
        detections: Vec<Detection>,
    ) -> Result<EnrollmentOutcome> {
        let probe = single_face(detections, self.config.embedding_dim)?;
        self.enrollment.enroll(identity_key, display_name, probe).await
    }

    /// Attendance-marking flow for one capture.
    pub async fn mark(&self, detections: Vec<Detection>) -> Result<MarkOutcome> {
        let probe = single_face(detections, self.config.embedding_dim)?;
        self.marker.mark(&probe).await
    }

    pub async fn identities(&self) -> Result<Vec<Identity>> {
        self.store.list_all().await
    }

    pub async fn identity(&self, identity_key: &str) -> Result<Identity> {
        self.store.find_by_key(identity_key).await
    }

    pub async fn enrolled_count(&self) -> Result<u64> {
        self.store.count().await
    }

    pub async fn recent_attendance(&self, limit: usize) -> Result<Vec<AttendanceEvent>> {
        self.store.recent(limit).await
    }

    pub async fn counts_by_identity(&self) -> Result<Vec<IdentityCount>> {
        self.aggregator.counts_by_identity().await
    }

    pub async fn occupancy_histogram(&self) -> Result<Vec<OccupancyBucket>> {
        self.aggregator.occupancy_histogram().await
    }

    pub async fn heatmap(&self) -> Result<Vec<HeatmapPoint>> {
        self.aggregator.heatmap().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::detection::BoundingBox;
    use crate::error::Error;
    use crate::memory::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn capture(faces: &[[f32; 3]]) -> Vec<Detection> {
        faces
            .iter()
            .map(|e| Detection {
                bbox: BoundingBox {
                    x: 0.0, y: 0.0, width: 64.0, height: 64.0,
                    confidence: 0.9, landmarks: None,
                },
                embedding: e.to_vec(),
            })
            .collect()
    }

    fn engine() -> (Arc<ManualClock>, Engine<MemoryStore>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()));
        let cfg = EngineConfig { similarity_threshold: 0.7, embedding_dim: 3 };
        let engine = Engine::with_clock(Arc::new(MemoryStore::new()), cfg, clock.clone()).unwrap();
        (clock, engine)
    }

    #[tokio::test]
    async fn test_capture_without_exactly_one_face_is_rejected() {
        let (_, engine) = engine();
        let err = engine.enroll("S1", "Ada", capture(&[])).await.unwrap_err();
        assert!(matches!(err, Error::MultipleOrNoFaceDetected { count: 0 }));

        let two = capture(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let err = engine.mark(two).await.unwrap_err();
        assert!(matches!(err, Error::MultipleOrNoFaceDetected { count: 2 }));
        assert_eq!(engine.enrolled_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_register_mark_and_report() {
        let (clock, engine) = engine();

        engine.enroll("S1", "Ada", capture(&[[1.0, 0.0, 0.0]])).await.unwrap();
        engine.enroll("S2", "Grace", capture(&[[0.0, 1.0, 0.0]])).await.unwrap();

        clock.set(Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap());
        engine.mark(capture(&[[0.9, 0.1, 0.0]])).await.unwrap();
        clock.set(Utc.with_ymd_and_hms(2024, 1, 2, 14, 0, 0).unwrap());
        engine.mark(capture(&[[0.95, 0.0, 0.05]])).await.unwrap();
        assert_eq!(
            engine.mark(capture(&[[0.0, 0.0, 1.0]])).await.unwrap(),
            MarkOutcome::NotRecognized
        );

        assert_eq!(engine.enrolled_count().await.unwrap(), 2);
        assert_eq!(engine.identity("S2").await.unwrap().display_name, "Grace");
        assert_eq!(
            engine.counts_by_identity().await.unwrap(),
            vec![IdentityCount { display_name: "Ada".into(), count: 2 }]
        );
        assert_eq!(
            engine.occupancy_histogram().await.unwrap(),
            vec![
                OccupancyBucket { day_of_week: 1, hour_of_day: 9, count: 1 },
                OccupancyBucket { day_of_week: 2, hour_of_day: 14, count: 1 },
            ]
        );

        let recent = engine.recent_attendance(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].timestamp > recent[1].timestamp);
    }
}

//! Integration tests for `SqliteStore` against in-memory and temporary
//! on-disk databases.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rollcall_core::{
    AttendanceEvent, AttendanceLog, BoundingBox, Detection, EmbeddingStore, EmbeddingVector,
    Engine, EngineConfig, EnrollmentOutcome, Error as CoreError, Identity, IdentityCount,
    MarkOutcome, MatchResult, OccupancyBucket,
};
use uuid::Uuid;

use crate::SqliteStore;

const DIM: usize = 4;

async fn store() -> SqliteStore {
    SqliteStore::open_in_memory(DIM)
        .await
        .expect("in-memory store")
}

/// Database file under the system temp dir, removed on drop.
struct TempDb(PathBuf);

impl TempDb {
    fn new() -> Self {
        Self(std::env::temp_dir().join(format!("rollcall-test-{}.db", Uuid::new_v4())))
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn config() -> EngineConfig {
    EngineConfig { similarity_threshold: 0.7, embedding_dim: DIM }
}

fn capture(v: [f32; DIM]) -> Vec<Detection> {
    vec![Detection {
        bbox: BoundingBox {
            x: 0.0, y: 0.0, width: 1.0, height: 1.0,
            confidence: 0.99, landmarks: None,
        },
        embedding: v.to_vec(),
    }]
}

fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, h, m, 0).unwrap()
}

fn identity(key: &str, name: &str, values: [f32; DIM]) -> Identity {
    Identity {
        identity_key: key.into(),
        display_name: name.into(),
        embedding: EmbeddingVector::new(values.to_vec(), DIM).unwrap(),
        enrolled_at: at(1, 8, 0),
    }
}

fn event(key: &str, name: &str, timestamp: DateTime<Utc>) -> AttendanceEvent {
    AttendanceEvent {
        event_id: Uuid::new_v4(),
        identity_key: key.into(),
        display_name: name.into(),
        timestamp,
    }
}

// ─── Identities ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_find_identity() {
    let s = store().await;
    let ada = identity("S1", "Ada", [0.1, -0.2, 0.3, 0.4]);
    s.insert(ada.clone()).await.unwrap();

    let fetched = s.find_by_key("S1").await.unwrap();
    assert_eq!(fetched, ada);
}

#[tokio::test]
async fn find_missing_identity_is_not_found() {
    let s = store().await;
    let err = s.find_by_key("nobody").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(k) if k == "nobody"));
}

#[tokio::test]
async fn duplicate_key_is_rejected_and_store_unchanged() {
    let s = store().await;
    s.insert(identity("S1", "Ada", [1.0, 0.0, 0.0, 0.0])).await.unwrap();

    let err = s
        .insert(identity("S1", "Grace", [0.0, 1.0, 0.0, 0.0]))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DuplicateIdentityKey(k) if k == "S1"));

    let all = s.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].display_name, "Ada");
    assert_eq!(all[0].embedding.values(), &[1.0, 0.0, 0.0, 0.0]);
}

#[tokio::test]
async fn list_all_keeps_enrollment_order() {
    let s = store().await;
    for key in ["S3", "S1", "S2"] {
        s.insert(identity(key, key, [1.0, 1.0, 1.0, 1.0])).await.unwrap();
    }
    let keys: Vec<_> = s
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.identity_key)
        .collect();
    assert_eq!(keys, ["S3", "S1", "S2"]);
    assert_eq!(s.count().await.unwrap(), 3);
}

#[tokio::test]
async fn wrong_dimension_is_malformed() {
    let s = store().await;
    let bad = Identity {
        embedding: EmbeddingVector::new(vec![1.0, 0.0], 2).unwrap(),
        ..identity("S1", "Ada", [0.0; DIM])
    };
    let err = s.insert(bad).await.unwrap_err();
    assert!(matches!(err, CoreError::MalformedEmbedding(_)));
    assert_eq!(s.count().await.unwrap(), 0);
}

#[tokio::test]
async fn list_all_skips_undecodable_rows() {
    let db = TempDb::new();
    // A row written under a different embedding size no longer decodes.
    let old = SqliteStore::open(&db.0, 2).await.unwrap();
    old.insert(Identity {
        embedding: EmbeddingVector::new(vec![1.0, 0.0], 2).unwrap(),
        ..identity("OLD", "Stale", [0.0; DIM])
    })
    .await
    .unwrap();

    let s = Arc::new(SqliteStore::open(&db.0, DIM).await.unwrap());
    s.insert(identity("S1", "Ada", [1.0, 0.0, 0.0, 0.0])).await.unwrap();

    let keys: Vec<_> = s.list_all().await.unwrap().into_iter().map(|i| i.identity_key).collect();
    assert_eq!(keys, ["S1"]);
    assert_eq!(s.count().await.unwrap(), 2);

    let engine = Engine::new(s, config()).unwrap();
    let outcome = engine.mark(capture([0.9, 0.1, 0.0, 0.0])).await.unwrap();
    assert!(matches!(outcome, MarkOutcome::Marked { event } if event.identity_key == "S1"));
}

#[tokio::test]
async fn insert_unless_matched_writes_only_on_no_match() {
    let s = store().await;
    s.insert(identity("S1", "Ada", [1.0, 0.0, 0.0, 0.0])).await.unwrap();

    let hit = MatchResult::Match {
        identity_key: "S1".into(),
        display_name: "Ada".into(),
        score: 0.99,
    };
    let seen = hit.clone();
    let result = s
        .insert_unless_matched(identity("S2", "Grace", [1.0, 0.0, 0.0, 0.0]), move |gallery| {
            assert_eq!(gallery.len(), 1);
            Ok(seen)
        })
        .await
        .unwrap();
    assert_eq!(result, hit);
    assert_eq!(s.count().await.unwrap(), 1);

    let err = s
        .insert_unless_matched(identity("S2", "Grace", [0.0; DIM]), |_| {
            Err(CoreError::DegenerateVector)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DegenerateVector));
    assert_eq!(s.count().await.unwrap(), 1);

    let result = s
        .insert_unless_matched(identity("S2", "Grace", [0.0, 1.0, 0.0, 0.0]), |_| {
            Ok(MatchResult::NoMatch)
        })
        .await
        .unwrap();
    assert_eq!(result, MatchResult::NoMatch);
    assert_eq!(s.find_by_key("S2").await.unwrap().display_name, "Grace");

    let err = s
        .insert_unless_matched(identity("S2", "Alan", [0.0, 0.0, 1.0, 0.0]), |_| {
            Ok(MatchResult::NoMatch)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DuplicateIdentityKey(k) if k == "S2"));
}

#[tokio::test]
async fn concurrent_enrollment_across_connections_enrolls_once() {
    let db = TempDb::new();
    let a = Arc::new(SqliteStore::open(&db.0, DIM).await.unwrap());
    let b = Arc::new(SqliteStore::open(&db.0, DIM).await.unwrap());
    let engine_a = Engine::new(a.clone(), config()).unwrap();
    let engine_b = Engine::new(b.clone(), config()).unwrap();
    let face = [0.2, 0.9, -0.3, 0.1];

    let (first, second) = tokio::join!(
        engine_a.enroll("S1", "Ada", capture(face)),
        engine_b.enroll("S2", "Ada again", capture(face)),
    );
    let outcomes = [first.unwrap(), second.unwrap()];

    let enrolled = outcomes
        .iter()
        .filter(|o| matches!(o, EnrollmentOutcome::Enrolled { .. }))
        .count();
    assert_eq!(enrolled, 1);
    assert_eq!(a.count().await.unwrap(), 1);
    assert_eq!(b.count().await.unwrap(), 1);
    assert_eq!(a.events().await.unwrap().len(), 1);
}

// ─── Attendance log ──────────────────────────────────────────────────────────

#[tokio::test]
async fn events_are_oldest_first_and_recent_newest_first() {
    let s = store().await;
    let e1 = event("S1", "Ada", at(1, 9, 0));
    let e2 = event("S1", "Ada", at(1, 11, 0));
    let e3 = event("S2", "Grace", at(1, 10, 0));
    for e in [&e1, &e2, &e3] {
        s.append(e.clone()).await.unwrap();
    }

    assert_eq!(s.events().await.unwrap(), vec![e1.clone(), e3.clone(), e2.clone()]);
    assert_eq!(s.recent(2).await.unwrap(), vec![e2, e3]);
    assert!(s.recent(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn same_timestamp_events_keep_append_order() {
    let s = store().await;
    let first = event("S1", "Ada", at(1, 9, 0));
    let second = event("S1", "Ada", at(1, 9, 0));
    s.append(first.clone()).await.unwrap();
    s.append(second.clone()).await.unwrap();
    assert_eq!(s.events().await.unwrap(), vec![first, second]);
}

// ─── End to end ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn engine_over_sqlite() {
    let s = Arc::new(store().await);
    let engine = Engine::new(s.clone(), config()).unwrap();

    let first = engine.enroll("S1", "Ada", capture([1.0, 0.0, 0.0, 0.0])).await.unwrap();
    assert!(matches!(first, EnrollmentOutcome::Enrolled { .. }));

    let again = engine.enroll("S9", "Imposter", capture([1.0, 0.01, 0.0, 0.0])).await.unwrap();
    assert_eq!(
        again,
        EnrollmentOutcome::AttendanceMarkedForExisting {
            identity_key: "S1".into(),
            display_name: "Ada".into(),
        }
    );

    assert_eq!(s.count().await.unwrap(), 1);
    assert_eq!(
        engine.counts_by_identity().await.unwrap(),
        vec![IdentityCount { display_name: "Ada".into(), count: 1 }]
    );
}

#[tokio::test]
async fn histogram_over_stored_events() {
    let s = Arc::new(store().await);
    s.insert(identity("S1", "Ada", [1.0, 0.0, 0.0, 0.0])).await.unwrap();
    // 2024-01-01 is a Monday.
    for ts in [at(1, 9, 0), at(1, 9, 30), at(2, 14, 0)] {
        s.append(event("S1", "Ada", ts)).await.unwrap();
    }

    let engine = Engine::new(s, config()).unwrap();
    assert_eq!(
        engine.occupancy_histogram().await.unwrap(),
        vec![
            OccupancyBucket { day_of_week: 1, hour_of_day: 9, count: 2 },
            OccupancyBucket { day_of_week: 2, hour_of_day: 14, count: 1 },
        ]
    );
}

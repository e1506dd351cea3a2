//! rollcall-core — Face identity matching and attendance recording.
//!
//! Turns a single face embedding into a new enrollment, a recognized
//! identity with an attendance event, or a rejection. Face detection and
//! embedding extraction happen upstream; storage is behind the
//! [`EmbeddingStore`] and [`AttendanceLog`] traits.

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod detection;
pub mod embedding;
pub mod engine;
pub mod enrollment;
pub mod error;
pub mod marking;
pub mod matcher;
pub mod memory;
pub mod recorder;
pub mod store;
pub mod types;

pub use aggregate::AttendanceAggregator;
pub use clock::{Clock, SystemClock};
pub use config::EngineConfig;
pub use detection::{single_face, BoundingBox, Detection};
pub use embedding::EmbeddingVector;
pub use engine::Engine;
pub use enrollment::EnrollmentService;
pub use error::{Error, Result};
pub use marking::AttendanceMarker;
pub use matcher::{CosineMatcher, Matcher, SimilarityMatcher};
pub use memory::MemoryStore;
pub use recorder::AttendanceRecorder;
pub use store::{AttendanceLog, EmbeddingStore};
pub use types::{
    AttendanceEvent, EnrollmentOutcome, HeatmapPoint, Identity, IdentityCount, MarkOutcome,
    MatchResult, OccupancyBucket,
};

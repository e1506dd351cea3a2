use thiserror::Error;

/// Failures surfaced by the matching and attendance engine.
///
/// Every variant is scoped to a single request; nothing here is retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed embedding: {0}")]
    MalformedEmbedding(String),
    #[error("degenerate embedding: zero-norm vector")]
    DegenerateVector,
    #[error("expected exactly one face in capture, found {count}")]
    MultipleOrNoFaceDetected { count: usize },
    #[error("identity key already enrolled: {0}")]
    DuplicateIdentityKey(String),
    #[error("identity not found: {0}")]
    NotFound(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("storage: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap a backend failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

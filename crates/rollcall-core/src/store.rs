//! Storage abstractions for enrolled identities and the attendance log.
//!
//! Backends (e.g. `rollcall-store`) implement these traits; the matcher,
//! enrollment and reporting code depend only on the abstraction.

use std::future::Future;

use crate::error::Result;
use crate::types::{AttendanceEvent, Identity, MatchResult};

/// Durable mapping from identity key to enrolled face.
///
/// All methods return `Send` futures so the traits can be used from a
/// multi-threaded tokio runtime.
pub trait EmbeddingStore: Send + Sync {
    /// Persist a new identity.
    ///
    /// Fails with [`Error::DuplicateIdentityKey`](crate::Error::DuplicateIdentityKey)
    /// and leaves the store unchanged if the key is taken.
    fn insert(&self, identity: Identity) -> impl Future<Output = Result<()>> + Send + '_;

    /// Insert `identity` unless `resolve` finds a match in the current gallery.
    ///
    /// `resolve` sees a snapshot taken under the same write lock (or
    /// transaction) as the insert, so two enrollers of one face, in this
    /// process or another, cannot both insert. Returns the match unchanged
    /// without writing, or [`MatchResult::NoMatch`] once `identity` is
    /// stored. Key collisions fail as in [`insert`](Self::insert).
    fn insert_unless_matched<F>(
        &self,
        identity: Identity,
        resolve: F,
    ) -> impl Future<Output = Result<MatchResult>> + Send + '_
    where
        F: FnOnce(&[Identity]) -> Result<MatchResult> + Send + 'static;

    /// Point-in-time snapshot of every enrolled identity.
    ///
    /// Backends return identities in a stable order (enrollment order) so that
    /// tie-breaking in the matcher is reproducible. The snapshot is not
    /// serialized against concurrent `insert`s; use
    /// [`insert_unless_matched`](Self::insert_unless_matched) for that.
    fn list_all(&self) -> impl Future<Output = Result<Vec<Identity>>> + Send + '_;

    /// Look up one identity. Fails with [`Error::NotFound`](crate::Error::NotFound).
    fn find_by_key<'a>(
        &'a self,
        identity_key: &'a str,
    ) -> impl Future<Output = Result<Identity>> + Send + 'a;

    /// Number of enrolled identities.
    fn count(&self) -> impl Future<Output = Result<u64>> + Send + '_;
}

/// Append-only attendance log.
pub trait AttendanceLog: Send + Sync {
    fn append(&self, event: AttendanceEvent) -> impl Future<Output = Result<()>> + Send + '_;

    /// Every event, oldest first.
    fn events(&self) -> impl Future<Output = Result<Vec<AttendanceEvent>>> + Send + '_;

    /// The `limit` most recent events, newest first.
    fn recent(&self, limit: usize)
        -> impl Future<Output = Result<Vec<AttendanceEvent>>> + Send + '_;
}

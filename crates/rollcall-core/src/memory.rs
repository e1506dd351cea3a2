//! In-process backend for [`EmbeddingStore`] and [`AttendanceLog`].
//!
//! Nothing is persisted; used by tests and throwaway sessions.

use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::store::{AttendanceLog, EmbeddingStore};
use crate::types::{AttendanceEvent, Identity, MatchResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    identities: RwLock<Vec<Identity>>,
    events: RwLock<Vec<AttendanceEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Storage("memory store lock poisoned".into())
}

fn push_unique(identities: &mut Vec<Identity>, identity: Identity) -> Result<()> {
    if identities.iter().any(|i| i.identity_key == identity.identity_key) {
        return Err(Error::DuplicateIdentityKey(identity.identity_key));
    }
    identities.push(identity);
    Ok(())
}

impl EmbeddingStore for MemoryStore {
    async fn insert(&self, identity: Identity) -> Result<()> {
        let mut identities = self.identities.write().map_err(poisoned)?;
        push_unique(&mut identities, identity)
    }

    async fn insert_unless_matched<F>(
        &self,
        identity: Identity,
        resolve: F,
    ) -> Result<MatchResult>
    where
        F: FnOnce(&[Identity]) -> Result<MatchResult> + Send + 'static,
    {
        let mut identities = self.identities.write().map_err(poisoned)?;
        let result = resolve(&identities)?;
        if result.is_match() {
            return Ok(result);
        }
        push_unique(&mut identities, identity)?;
        Ok(MatchResult::NoMatch)
    }

    async fn list_all(&self) -> Result<Vec<Identity>> {
        Ok(self.identities.read().map_err(poisoned)?.clone())
    }

    async fn find_by_key<'a>(&'a self, identity_key: &'a str) -> Result<Identity> {
        self.identities
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|i| i.identity_key == identity_key)
            .cloned()
            .ok_or_else(|| Error::NotFound(identity_key.to_string()))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.identities.read().map_err(poisoned)?.len() as u64)
    }
}

impl AttendanceLog for MemoryStore {
    async fn append(&self, event: AttendanceEvent) -> Result<()> {
        self.events.write().map_err(poisoned)?.push(event);
        Ok(())
    }

    async fn events(&self) -> Result<Vec<AttendanceEvent>> {
        let mut events = self.events.read().map_err(poisoned)?.clone();
        // Stable sort keeps append order among equal timestamps.
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AttendanceEvent>> {
        let mut events = self.events().await?;
        events.reverse();
        events.truncate(limit);
        Ok(events)
    }
}

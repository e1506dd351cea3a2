//! [`SqliteStore`] — the SQLite implementation of [`EmbeddingStore`] and
//! [`AttendanceLog`].

use std::path::Path;
use std::time::Duration;

use rusqlite::{OptionalExtension as _, TransactionBehavior};

use rollcall_core::{AttendanceEvent, AttendanceLog, EmbeddingStore, Identity, MatchResult};

use crate::{
    encode::{encode_dt, encode_uuid, RawEvent, RawIdentity},
    schema::SCHEMA,
    Result,
};

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_IDENTITIES: &str = "
    SELECT identity_key, display_name, embedding, enrolled_at
    FROM identities ORDER BY rowid";

const INSERT_IDENTITY: &str = "
    INSERT INTO identities (identity_key, display_name, embedding, enrolled_at)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT (identity_key) DO NOTHING";

fn select_identities(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<RawIdentity>> {
    let mut stmt = conn.prepare(SELECT_IDENTITIES)?;
    let rows = stmt
        .query_map([], RawIdentity::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Decode gallery rows, skipping any that no longer decode (wrong blob
/// length, bad timestamp) so one corrupt row cannot block recognition.
fn decode_gallery(rows: Vec<RawIdentity>, dim: usize) -> Vec<Identity> {
    rows.into_iter()
        .filter_map(|raw| {
            let identity_key = raw.identity_key.clone();
            match raw.into_identity(dim) {
                Ok(identity) => Some(identity),
                Err(err) => {
                    tracing::warn!(
                        %identity_key,
                        error = %err,
                        "skipping undecodable identity row"
                    );
                    None
                }
            }
        })
        .collect()
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Enrolled faces and the attendance log in a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// statements run in order on one connection thread; each read is a single
/// `SELECT` and so sees a consistent snapshot. Gallery rows that fail to
/// decode are skipped with a warning rather than failing the whole read.
#[derive(Clone)]
pub struct SqliteStore {
    conn: tokio_rusqlite::Connection,
    embedding_dim: usize,
}

impl SqliteStore {
    /// Open (or create) a store at `path` and run schema initialisation.
    pub async fn open(path: impl AsRef<Path>, embedding_dim: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = tokio_rusqlite::Connection::open(&path).await?;
        let store = Self { conn, embedding_dim };
        store.init_schema().await?;
        tracing::debug!(path = %path.display(), embedding_dim, "opened attendance database");
        Ok(store)
    }

    /// Open an in-memory store — useful for testing.
    pub async fn open_in_memory(embedding_dim: usize) -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn, embedding_dim };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.busy_timeout(BUSY_TIMEOUT)?;
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    fn check_dim(&self, identity: &Identity) -> Result<()> {
        if identity.embedding.dim() != self.embedding_dim {
            return Err(rollcall_core::Error::MalformedEmbedding(format!(
                "expected {}-dim embedding, got {}",
                self.embedding_dim,
                identity.embedding.dim()
            ))
            .into());
        }
        Ok(())
    }

    async fn insert_identity(&self, identity: Identity) -> Result<()> {
        self.check_dim(&identity)?;

        let key = identity.identity_key.clone();
        let name = identity.display_name;
        let blob = identity.embedding.to_bytes();
        let enrolled_at = encode_dt(identity.enrolled_at);

        let inserted = self
            .conn
            .call(move |conn| {
                let changed =
                    conn.execute(INSERT_IDENTITY, rusqlite::params![key, name, blob, enrolled_at])?;
                Ok(changed == 1)
            })
            .await?;

        if !inserted {
            return Err(rollcall_core::Error::DuplicateIdentityKey(identity.identity_key).into());
        }
        Ok(())
    }

    /// Read the gallery, run `resolve` on it and insert on no match, all in
    /// one `BEGIN IMMEDIATE` transaction.
    ///
    /// The immediate transaction takes SQLite's write lock before the read,
    /// so another connection (or process) enrolling at the same time waits
    /// for this commit and then sees the new row in its own snapshot.
    async fn enroll_atomically<F>(&self, identity: Identity, resolve: F) -> Result<MatchResult>
    where
        F: FnOnce(&[Identity]) -> rollcall_core::Result<MatchResult> + Send + 'static,
    {
        self.check_dim(&identity)?;

        let dim = self.embedding_dim;
        let key = identity.identity_key.clone();
        let name = identity.display_name;
        let blob = identity.embedding.to_bytes();
        let enrolled_at = encode_dt(identity.enrolled_at);

        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let gallery = decode_gallery(select_identities(&tx)?, dim);

                let result = match resolve(&gallery) {
                    Ok(result) => result,
                    Err(err) => return Ok(Err(err)),
                };
                if result.is_match() {
                    return Ok(Ok(result));
                }

                let changed = tx.execute(
                    INSERT_IDENTITY,
                    rusqlite::params![key.as_str(), name, blob, enrolled_at],
                )?;
                tx.commit()?;
                if changed == 0 {
                    return Ok(Err(rollcall_core::Error::DuplicateIdentityKey(key)));
                }
                Ok(Ok(MatchResult::NoMatch))
            })
            .await?;

        Ok(outcome?)
    }

    async fn all_identities(&self) -> Result<Vec<Identity>> {
        let rows = self.conn.call(|conn| Ok(select_identities(conn)?)).await?;
        Ok(decode_gallery(rows, self.embedding_dim))
    }

    async fn identity_by_key(&self, identity_key: &str) -> Result<Identity> {
        let key = identity_key.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT identity_key, display_name, embedding, enrolled_at
                         FROM identities WHERE identity_key = ?1",
                        rusqlite::params![key],
                        RawIdentity::from_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        match row {
            Some(raw) => raw.into_identity(self.embedding_dim),
            None => Err(rollcall_core::Error::NotFound(identity_key.to_string()).into()),
        }
    }

    async fn identity_count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM identities", [], |r| r.get(0))?))
            .await?;
        Ok(n.max(0) as u64)
    }

    async fn append_event(&self, event: AttendanceEvent) -> Result<()> {
        let id = encode_uuid(event.event_id);
        let ts = encode_dt(event.timestamp);
        let key = event.identity_key;
        let name = event.display_name;

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO attendance (event_id, identity_key, display_name, timestamp)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![id, key, name, ts],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn query_events(
        &self,
        newest_first: bool,
        limit: Option<usize>,
    ) -> Result<Vec<AttendanceEvent>> {
        let order = if newest_first { "DESC" } else { "ASC" };
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let sql = format!(
            "SELECT event_id, identity_key, display_name, timestamp
             FROM attendance ORDER BY timestamp {order}, rowid {order} LIMIT ?1"
        );

        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params![limit], RawEvent::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter().map(RawEvent::into_event).collect()
    }
}

// ─── EmbeddingStore impl ─────────────────────────────────────────────────────

impl EmbeddingStore for SqliteStore {
    async fn insert(&self, identity: Identity) -> rollcall_core::Result<()> {
        Ok(self.insert_identity(identity).await?)
    }

    async fn insert_unless_matched<F>(
        &self,
        identity: Identity,
        resolve: F,
    ) -> rollcall_core::Result<MatchResult>
    where
        F: FnOnce(&[Identity]) -> rollcall_core::Result<MatchResult> + Send + 'static,
    {
        Ok(self.enroll_atomically(identity, resolve).await?)
    }

    async fn list_all(&self) -> rollcall_core::Result<Vec<Identity>> {
        Ok(self.all_identities().await?)
    }

    async fn find_by_key<'a>(&'a self, identity_key: &'a str) -> rollcall_core::Result<Identity> {
        Ok(self.identity_by_key(identity_key).await?)
    }

    async fn count(&self) -> rollcall_core::Result<u64> {
        Ok(self.identity_count().await?)
    }
}

// ─── AttendanceLog impl ──────────────────────────────────────────────────────

impl AttendanceLog for SqliteStore {
    async fn append(&self, event: AttendanceEvent) -> rollcall_core::Result<()> {
        Ok(self.append_event(event).await?)
    }

    async fn events(&self) -> rollcall_core::Result<Vec<AttendanceEvent>> {
        Ok(self.query_events(false, None).await?)
    }

    async fn recent(&self, limit: usize) -> rollcall_core::Result<Vec<AttendanceEvent>> {
        Ok(self.query_events(true, Some(limit)).await?)
    }
}

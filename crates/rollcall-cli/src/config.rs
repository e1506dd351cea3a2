use std::path::PathBuf;

use rollcall_core::config::{DEFAULT_EMBEDDING_DIM, DEFAULT_SIMILARITY_THRESHOLD};
use rollcall_core::EngineConfig;

/// CLI configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Cosine similarity a probe must strictly exceed to match.
    pub similarity_threshold: f32,
    /// Embedding length produced by the face model.
    pub embedding_dim: usize,
    /// Number of events shown by `recent` and `summary`.
    pub recent_limit: usize,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("rollcall");

        let db_path = var("ROLLCALL_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("attendance.db"));

        Self {
            db_path,
            similarity_threshold: parsed(&var, "ROLLCALL_SIMILARITY_THRESHOLD", DEFAULT_SIMILARITY_THRESHOLD),
            embedding_dim: parsed(&var, "ROLLCALL_EMBEDDING_DIM", DEFAULT_EMBEDDING_DIM),
            recent_limit: parsed(&var, "ROLLCALL_RECENT_LIMIT", 10),
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            similarity_threshold: self.similarity_threshold,
            embedding_dim: self.embedding_dim,
        }
    }
}

fn parsed<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match var(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }),
        None => default,
    }
}

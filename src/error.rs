// src/error.rs
// Engine error taxonomy: per-journal and per-candidate failures are
// non-fatal, storage loss is the only cycle-aborting case.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Network/API/parse failure for one journal. Retried next cycle.
    #[error("fetch failed for journal '{journal}': {source}")]
    Fetch {
        journal: String,
        #[source]
        source: anyhow::Error,
    },

    /// Write contention on the same DOI that survived the retry.
    #[error("store conflict on '{0}'")]
    StoreConflict(String),

    /// Status update on an identifier nobody has recommended.
    #[error("no recommendation with identifier '{0}'")]
    NotFound(String),

    #[error("invalid status '{0}' (expected unread, confirmed or dismissed)")]
    InvalidStatus(String),

    /// Two keyword entries share a canonical form. Configuration error.
    #[error("duplicate canonical keyword '{0}'")]
    DuplicateKeyword(String),

    /// Unreadable or malformed keyword configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Store unavailable. Fatal for the cycle; in-flight results are dropped.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

impl EngineError {
    /// True when the whole scan cycle must stop rather than continue
    /// with the remaining journals.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }
}

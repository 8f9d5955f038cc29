//! Error taxonomy of the library store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the store.
///
/// `SchemaInit` and `Migration` are fatal at startup. `Statement` belongs to
/// the caller that issued the SQL. `Persistence` is non-fatal on the snapshot
/// timer but is returned loudly from the final flush.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to apply base schema for table '{table}': {source}")]
    SchemaInit {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("migration step '{step}' failed: {source}")]
    Migration {
        step: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("schema shape check failed: table '{table}' is missing column '{column}'")]
    SchemaShape {
        table: &'static str,
        column: &'static str,
    },

    #[error("statement failed: {0}")]
    Statement(#[from] rusqlite::Error),

    #[error("persistence failed for {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: PersistenceSource,
    },

    #[error("the database has been shut down")]
    Closed,
}

/// Underlying cause of a [`StoreError::Persistence`].
#[derive(Debug, Error)]
pub enum PersistenceSource {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine error: {0}")]
    Engine(#[from] rusqlite::Error),
}

impl StoreError {
    pub(crate) fn persistence<E: Into<PersistenceSource>>(path: impl Into<PathBuf>, e: E) -> Self {
        StoreError::Persistence {
            path: path.into(),
            source: e.into(),
        }
    }

    /// True for failures that must abort startup.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            StoreError::SchemaInit { .. }
                | StoreError::Migration { .. }
                | StoreError::SchemaShape { .. }
                | StoreError::Persistence { .. }
        )
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

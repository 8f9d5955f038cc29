//! Rythm Store Library
//!
//! Embedded relational store for the music library: an in-memory SQLite
//! engine, kept durable by periodic full snapshots, with schema bootstrap
//! and self-detecting migrations at startup.

pub mod config;
pub mod durability;
pub mod error;
pub mod migration;
pub mod schema;
pub mod sqlite_persistence;
pub mod statement;
pub mod store;

// Re-export commonly used types for convenience
pub use error::{PersistenceSource, StoreError, StoreResult};
pub use statement::{Database, Row, RunResult};
pub use store::{Store, StoreOptions};

//! Synchronous statement execution surface used by the route layer.

mod database;
mod row;
mod shim;

pub use database::Database;
pub use row::Row;
pub use shim::{all, get, run, RunResult};

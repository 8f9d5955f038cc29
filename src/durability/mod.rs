//! Durability of the in-memory engine: loading the on-disk image at startup,
//! writing it back periodically and at shutdown.
//!
//! Writes between two snapshots live only in memory. A crash in that window
//! loses them; the previous image stays intact.

mod image;
mod snapshot_task;

pub use image::{load_image, snapshot, write_image};
pub use snapshot_task::{SnapshotStats, SnapshotTask};

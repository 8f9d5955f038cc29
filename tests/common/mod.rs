//! Common test infrastructure
//!
//! Builds database images on disk the way older builds left them, and opens
//! stores over temporary directories.

mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{
    count, legacy_track, open_store, store_options, write_legacy_image, LegacyTrack, TestDir,
};

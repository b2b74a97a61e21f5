//! Library source abstraction and the Apple Music XML adapter.

mod models;
mod plist_library;

pub use models::{AugmentedLibraryTrack, LibraryTrack};
pub use plist_library::PlistLibrary;

use anyhow::Result;

/// Capability trait for reading a library snapshot. Pure read, no side
/// effects beyond file I/O.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait LibrarySource: Send + Sync {
    fn get_tracks(&self) -> Result<Vec<LibraryTrack>>;
}

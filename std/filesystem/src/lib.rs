//! Sandboxed, read-only filesystem browsing.
//!
//! All operations are confined to a single [`Root`] directory fixed at
//! startup. Caller-supplied paths are resolved with [`resolve`], which
//! follows symlinks before checking containment, so neither `..` segments,
//! absolute paths nor links can reach content outside the root.

pub mod browse;
pub mod error;
pub mod resolve;

pub use browse::{
    DirectoryEntry, DirectoryListing, FileBrowser, FileContent, FileEntry, MAX_READ_BYTES,
    SearchMatch,
};
pub use error::{BrowseError, EntryKind};
pub use resolve::{ResolveError, ResolvedPath, Root, resolve};

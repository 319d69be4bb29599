//! Domain errors for filesystem browsing.

use crate::resolve::ResolveError;
use std::fmt;
use std::io;
use thiserror::Error;

/// What kind of entry an operation expected to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryKind::File => "File",
            EntryKind::Directory => "Directory",
        })
    }
}

/// Errors from [`FileBrowser`](crate::FileBrowser) operations.
///
/// Paths carried here are the caller's original relative paths, never the
/// resolved absolute ones.
#[derive(Error, Debug)]
pub enum BrowseError {
    /// The path escapes the root or cannot be resolved safely.
    #[error(transparent)]
    Sandbox(#[from] ResolveError),
    /// The target does not exist or is not the expected kind of entry.
    #[error("{kind} not found: {path}")]
    NotFound { kind: EntryKind, path: String },
    /// The operating system refused access.
    #[error("Permission denied to {action}: {path}")]
    PermissionDenied { action: &'static str, path: String },
    /// The file is larger than [`MAX_READ_BYTES`](crate::MAX_READ_BYTES).
    #[error("File size exceeds the 10MB limit: {path}")]
    SizeLimitExceeded { path: String, size: u64 },
    /// Any other I/O failure on the requested target.
    #[error("Failed to {action}: {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        source: io::Error,
    },
}

impl BrowseError {
    /// Classify an I/O failure that happened while performing `action`.
    pub(crate) fn io(action: &'static str, path: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => BrowseError::PermissionDenied {
                action,
                path: path.to_owned(),
            },
            _ => BrowseError::Io {
                action,
                path: path.to_owned(),
                source: err,
            },
        }
    }

    pub(crate) fn not_found(kind: EntryKind, path: &str) -> Self {
        BrowseError::NotFound {
            kind,
            path: path.to_owned(),
        }
    }
}

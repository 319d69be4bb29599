//! Read-only filesystem operations confined to a [`Root`].
//!
//! Every operation resolves its path through [`resolve`] first; a sandbox
//! violation short-circuits before the filesystem is touched.

use crate::error::{BrowseError, EntryKind};
use crate::resolve::{Root, relative_display, resolve};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat};
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::DirEntry;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest file `read_file` will return, in bytes.
pub const MAX_READ_BYTES: u64 = 10 * 1024 * 1024;

/// A regular file in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    /// The requested path joined with `name`, as the caller addressed it.
    pub path: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

/// A subdirectory in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
}

/// Direct children of a directory, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub files: Vec<FileEntry>,
    pub directories: Vec<DirectoryEntry>,
}

/// Contents of a file.
///
/// Serializes as a plain string: text verbatim, anything that is not valid
/// UTF-8 as standard Base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContent {
    /// Decode all of `bytes` as UTF-8, or keep them as binary if any byte
    /// fails to decode.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => FileContent::Text(text),
            Err(err) => FileContent::Binary(err.into_bytes()),
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, FileContent::Binary(_))
    }

    /// The string sent to clients.
    pub fn to_wire(&self) -> Cow<'_, str> {
        match self {
            FileContent::Text(text) => Cow::Borrowed(text),
            FileContent::Binary(bytes) => Cow::Owned(BASE64.encode(bytes)),
        }
    }
}

impl Serialize for FileContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

/// A line containing the search pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// Path of the file relative to the root, `/`-separated.
    pub file_path: String,
    /// 1-based.
    pub line_number: usize,
    /// The matching line with surrounding whitespace trimmed.
    pub line: String,
}

/// Filesystem browser confined to a single root directory.
#[derive(Debug, Clone)]
pub struct FileBrowser {
    root: Root,
}

impl FileBrowser {
    pub fn new(root: Root) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    /// List the direct children of a directory.
    pub async fn list_directory(&self, path: &str) -> Result<DirectoryListing, BrowseError> {
        const ACTION: &str = "list directory";

        let resolved = resolve(&self.root, path)?;
        if !is_dir(resolved.as_path()).await {
            return Err(BrowseError::not_found(EntryKind::Directory, path));
        }

        let mut listing = DirectoryListing::default();
        let mut read_dir = tokio::fs::read_dir(&resolved)
            .await
            .map_err(|e| BrowseError::io(ACTION, path, e))?;
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| BrowseError::io(ACTION, path, e))?
        {
            let Some(meta) = self
                .entry_metadata(&entry)
                .await
                .map_err(|e| BrowseError::io(ACTION, path, e))?
            else {
                continue;
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            let entry_path = Path::new(path).join(&name).to_string_lossy().into_owned();
            if meta.is_dir() {
                listing.directories.push(DirectoryEntry {
                    name,
                    path: entry_path,
                });
            } else if meta.is_file() {
                listing.files.push(FileEntry {
                    name,
                    path: entry_path,
                    size: meta.len(),
                    modified_date: iso8601(meta.modified()),
                    created_date: iso8601(meta.created()),
                });
            }
        }
        Ok(listing)
    }

    /// Read a whole file, up to [`MAX_READ_BYTES`].
    pub async fn read_file(&self, path: &str) -> Result<FileContent, BrowseError> {
        const ACTION: &str = "read file";

        let resolved = resolve(&self.root, path)?;
        let meta = match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.is_file() => meta,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(BrowseError::io(ACTION, path, e));
            }
            _ => return Err(BrowseError::not_found(EntryKind::File, path)),
        };
        if meta.len() > MAX_READ_BYTES {
            return Err(BrowseError::SizeLimitExceeded {
                path: path.to_owned(),
                size: meta.len(),
            });
        }

        // The file may have grown since the metadata check.
        let file = tokio::fs::File::open(&resolved)
            .await
            .map_err(|e| BrowseError::io(ACTION, path, e))?;
        let bytes = read_capped(file, MAX_READ_BYTES, path).await?;
        Ok(FileContent::from_bytes(bytes))
    }

    /// Find every line under `path` containing `pattern` as a literal
    /// substring.
    ///
    /// Files that cannot be read are skipped; nothing found is an empty
    /// result, not an error.
    pub async fn search(&self, path: &str, pattern: &str) -> Result<Vec<SearchMatch>, BrowseError> {
        let resolved = resolve(&self.root, path)?;
        if !is_dir(resolved.as_path()).await {
            return Err(BrowseError::not_found(EntryKind::Directory, path));
        }

        let mut matches = Vec::new();
        self.walk(resolved.as_path().to_path_buf(), pattern, &mut matches)
            .await;
        Ok(matches)
    }

    /// Metadata used to classify a listing entry, or `None` to leave it out.
    ///
    /// Symlinks are classified by their target, and only when that target
    /// lies inside the root. Entries removed since enumeration are left out.
    async fn entry_metadata(&self, entry: &DirEntry) -> io::Result<Option<std::fs::Metadata>> {
        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        if file_type.is_symlink() {
            return Ok(match self.contained_target(&entry.path()).await {
                Some(target) => tokio::fs::metadata(&target).await.ok(),
                None => None,
            });
        }
        match entry.metadata().await {
            Ok(meta) => Ok(Some(meta)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The canonical target of `link` if it exists and lies inside the root.
    async fn contained_target(&self, link: &Path) -> Option<PathBuf> {
        tokio::fs::canonicalize(link)
            .await
            .ok()
            .filter(|target| self.root.contains(target))
    }

    /// Scan the files of `dir`, then walk its subdirectories.
    fn walk<'a>(
        &'a self,
        dir: PathBuf,
        pattern: &'a str,
        matches: &'a mut Vec<SearchMatch>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let mut read_dir = match tokio::fs::read_dir(&dir).await {
                Ok(read_dir) => read_dir,
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                    return;
                }
            };

            // (reported location, path actually read)
            let mut files: Vec<(PathBuf, PathBuf)> = Vec::new();
            let mut subdirs = Vec::new();
            loop {
                let entry = match read_dir.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(dir = %dir.display(), error = %e, "directory enumeration stopped");
                        break;
                    }
                };
                let Ok(file_type) = entry.file_type().await else {
                    continue;
                };
                let location = entry.path();
                if file_type.is_dir() {
                    subdirs.push(location);
                } else if file_type.is_file() {
                    files.push((location.clone(), location));
                } else if file_type.is_symlink() {
                    // Linked directories are never descended into.
                    if let Some(target) = self.contained_target(&location).await {
                        if is_file(&target).await {
                            files.push((location, target));
                        }
                    }
                }
            }

            for (location, actual) in files {
                self.scan_file(&location, &actual, pattern, matches).await;
            }
            for subdir in subdirs {
                self.walk(subdir, pattern, matches).await;
            }
        })
    }

    async fn scan_file(
        &self,
        location: &Path,
        actual: &Path,
        pattern: &str,
        matches: &mut Vec<SearchMatch>,
    ) {
        let bytes = match tokio::fs::read(actual).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(file = %location.display(), error = %e, "skipping unreadable file");
                return;
            }
        };

        let text = decode_ignoring_invalid(&bytes);
        let file_path = relative_display(&self.root, location);
        for (index, line) in lines_any_ending(&text).enumerate() {
            if line.contains(pattern) {
                matches.push(SearchMatch {
                    file_path: file_path.clone(),
                    line_number: index + 1,
                    line: line.trim().to_owned(),
                });
            }
        }
    }
}

/// Read all of `reader`, failing once more than `limit` bytes arrive.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: R,
    limit: u64,
    path: &str,
) -> Result<Vec<u8>, BrowseError> {
    let mut bytes = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| BrowseError::io("read file", path, e))?;
    let size = bytes.len() as u64;
    if size > limit {
        return Err(BrowseError::SizeLimitExceeded {
            path: path.to_owned(),
            size,
        });
    }
    Ok(bytes)
}

/// Split into lines ending in `\n`, `\r\n` or a lone `\r`, with the
/// terminators removed.
fn lines_any_ending(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let Some(end) = rest.find(['\r', '\n']) else {
            return Some(std::mem::take(&mut rest));
        };
        let line = &rest[..end];
        let terminator = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[end + terminator..];
        Some(line)
    })
}

/// Decode UTF-8, dropping any byte sequences that are not valid.
fn decode_ignoring_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_dir())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
}

/// Format a filesystem timestamp as ISO-8601 in UTC.
fn iso8601(time: io::Result<SystemTime>) -> Option<String> {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .and_then(|d| DateTime::from_timestamp(d.as_secs() as i64, d.subsec_nanos()))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

//! Path resolution and sandboxing.
//!
//! Every filesystem access must pass through [`resolve`], which turns an
//! untrusted, caller-supplied path into a [`ResolvedPath`] guaranteed to lie
//! within the configured [`Root`].

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The path resolves outside the root directory.
    #[error("Attempted to access path outside root directory: {0}")]
    OutsideRoot(String),
    /// A symlink on the path could not be followed.
    #[error("Attempted to access path through an unresolvable link: {0}")]
    UnresolvableLink(String),
    /// The path contains a null byte.
    #[error("path contains null byte")]
    NullByte,
}

/// The single directory all operations are confined to.
///
/// Canonicalized once on construction and immutable afterwards; clones share
/// the same path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root(Arc<Path>);

impl Root {
    /// Canonicalize `path` and use it as the sandbox root.
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let canonical = path.as_ref().canonicalize()?;
        if !canonical.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("root is not a directory: {}", canonical.display()),
            ));
        }
        Ok(Self(canonical.into()))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Whether `path` lies within the root. Compared component-wise, so
    /// `/srv/data2` is not inside `/srv/data`. The root contains itself.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.0)
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

/// An absolute, symlink-followed path inside a [`Root`].
///
/// Only [`resolve`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Render `path` relative to `root` with forward slashes.
pub(crate) fn relative_display(root: &Root, path: &Path) -> String {
    let relative = path.strip_prefix(root.path()).unwrap_or(path);
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    if parts.is_empty() {
        ".".to_owned()
    } else {
        parts.join("/")
    }
}

/// Resolve `relative` against `root`, following symlinks.
///
/// Steps:
/// 1. Reject paths containing null bytes
/// 2. Walk the joined path one component at a time, canonicalizing every
///    existing prefix so each symlink is followed to its real target
///    - Components below the deepest existing ancestor are applied lexically
///    - A link that exists but cannot be followed is rejected
/// 3. Verify the result lies within the root
///
/// An absolute `relative` replaces the root entirely and is accepted only if
/// it still lands inside it.
pub fn resolve(root: &Root, relative: &str) -> Result<ResolvedPath, ResolveError> {
    if relative.contains('\0') {
        return Err(ResolveError::NullByte);
    }

    let joined = root.path().join(relative);
    let mut current = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => current.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                current.pop();
            }
            Component::Normal(name) => {
                current.push(name);
                match current.canonicalize() {
                    Ok(canonical) => current = canonical,
                    Err(_) if current.is_symlink() => {
                        return Err(ResolveError::UnresolvableLink(relative.to_owned()));
                    }
                    // Missing: nothing below it can exist either.
                    Err(_) => {}
                }
            }
        }
    }

    if !root.contains(&current) {
        return Err(ResolveError::OutsideRoot(relative.to_owned()));
    }
    Ok(ResolvedPath(current))
}

#[cfg(test)]
mod tests {
    use crate::resolve::{ResolveError, Root, relative_display, resolve};
    use std::fs;

    fn sandbox() -> (tempfile::TempDir, Root) {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("root")).unwrap();
        let root = Root::new(tmp.path().join("root")).unwrap();
        (tmp, root)
    }

    #[test]
    fn allows_path_within_root() {
        let (_tmp, root) = sandbox();
        fs::create_dir(root.path().join("subdir")).unwrap();
        fs::write(root.path().join("subdir/file.txt"), "x").unwrap();
        let resolved = resolve(&root, "subdir/file.txt").unwrap();
        assert_eq!(resolved.as_path(), root.path().join("subdir/file.txt"));
        assert_eq!(relative_display(&root, resolved.as_path()), "subdir/file.txt");
    }

    #[test]
    fn root_is_inside_itself() {
        let (_tmp, root) = sandbox();
        for path in [".", "", "./", "subdir/..", "./././"] {
            let resolved = resolve(&root, path).unwrap();
            assert_eq!(resolved.as_path(), root.path(), "path {path:?}");
            assert_eq!(relative_display(&root, resolved.as_path()), ".");
        }
    }

    #[test]
    fn rejects_parent_traversal() {
        let (_tmp, root) = sandbox();
        for path in ["..", "../", "../outside_dir", "a/../../b", "missing/../../etc"] {
            let err = resolve(&root, path).unwrap_err();
            assert!(matches!(err, ResolveError::OutsideRoot(_)), "path {path:?}");
        }
    }

    #[test]
    fn rejects_absolute_override() {
        let (_tmp, root) = sandbox();
        let err = resolve(&root, "/etc/passwd").unwrap_err();
        assert!(matches!(err, ResolveError::OutsideRoot(_)));
    }

    #[test]
    fn allows_absolute_path_inside_root() {
        let (_tmp, root) = sandbox();
        fs::write(root.path().join("a.txt"), "a").unwrap();
        let absolute = root.path().join("a.txt");
        let resolved = resolve(&root, absolute.to_str().unwrap()).unwrap();
        assert_eq!(resolved.as_path(), absolute);
    }

    #[test]
    fn rejects_sibling_with_shared_prefix() {
        let (tmp, root) = sandbox();
        fs::create_dir(tmp.path().join("root2")).unwrap();
        let err = resolve(&root, "../root2").unwrap_err();
        assert!(matches!(err, ResolveError::OutsideRoot(_)));
    }

    #[test]
    fn allows_nonexistent_path_inside_root() {
        let (_tmp, root) = sandbox();
        let resolved = resolve(&root, "missing/file.txt").unwrap();
        assert_eq!(resolved.as_path(), root.path().join("missing/file.txt"));
    }

    #[test]
    fn rejects_null_byte() {
        let (_tmp, root) = sandbox();
        let err = resolve(&root, "foo\0bar").unwrap_err();
        assert!(matches!(err, ResolveError::NullByte));
    }

    #[test]
    fn root_must_be_a_directory() {
        let (tmp, _root) = sandbox();
        let file = tmp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        assert!(Root::new(&file).is_err());
        assert!(Root::new(tmp.path().join("does-not-exist")).is_err());
    }

    #[cfg(unix)]
    mod symlinks {
        use super::sandbox;
        use crate::resolve::{ResolveError, resolve};
        use std::fs;
        use std::os::unix::fs::symlink;

        #[test]
        fn allows_link_targeting_inside_root() {
            let (_tmp, root) = sandbox();
            fs::write(root.path().join("target.txt"), "t").unwrap();
            symlink(root.path().join("target.txt"), root.path().join("link.txt")).unwrap();
            let resolved = resolve(&root, "link.txt").unwrap();
            assert_eq!(resolved.as_path(), root.path().join("target.txt"));
        }

        #[test]
        fn rejects_link_targeting_outside_root() {
            let (tmp, root) = sandbox();
            fs::write(tmp.path().join("outside.txt"), "secret").unwrap();
            symlink(tmp.path().join("outside.txt"), root.path().join("link.txt")).unwrap();
            let err = resolve(&root, "link.txt").unwrap_err();
            assert!(matches!(err, ResolveError::OutsideRoot(_)));
        }

        #[test]
        fn rejects_directory_link_escaping_root() {
            let (tmp, root) = sandbox();
            fs::create_dir(tmp.path().join("elsewhere")).unwrap();
            fs::write(tmp.path().join("elsewhere/secret.txt"), "s").unwrap();
            symlink(tmp.path().join("elsewhere"), root.path().join("door")).unwrap();
            let err = resolve(&root, "door/secret.txt").unwrap_err();
            assert!(matches!(err, ResolveError::OutsideRoot(_)));
        }

        #[test]
        fn follows_link_reached_through_missing_component() {
            let (tmp, root) = sandbox();
            fs::write(tmp.path().join("outside.txt"), "secret").unwrap();
            symlink(tmp.path().join("outside.txt"), root.path().join("link.txt")).unwrap();
            let err = resolve(&root, "missing/../link.txt").unwrap_err();
            assert!(matches!(err, ResolveError::OutsideRoot(_)));
        }

        #[test]
        fn rejects_dangling_link() {
            let (tmp, root) = sandbox();
            symlink(tmp.path().join("gone.txt"), root.path().join("dangling")).unwrap();
            let err = resolve(&root, "dangling").unwrap_err();
            assert!(matches!(err, ResolveError::UnresolvableLink(_)));
        }
    }
}

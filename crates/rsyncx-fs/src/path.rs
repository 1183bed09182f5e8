//! Normalized path handling for cross-platform compatibility
//!
//! Sync-relative paths are stored and compared as forward-slash strings so a
//! state file written on one machine is valid on another.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A path normalized to use forward slashes internally.
///
/// `.` components and empty segments are dropped and `..` is resolved
/// lexically. A leading `..` that would climb above a relative root is
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy().replace('\\', "/");
        Self {
            inner: clean(&raw),
        }
    }

    /// Parse a path relative to a sync root.
    ///
    /// Unlike [`NormalizedPath::new`], absolute paths and `..` segments are
    /// rejected instead of being sanitized: a relative path coming from a
    /// listing or a state file must never resolve outside its root.
    pub fn relative(path: &str) -> Result<Self> {
        let raw = path.replace('\\', "/");
        let invalid = |reason: &str| Error::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        if raw.starts_with('/') || raw.get(1..2) == Some(":") {
            return Err(invalid("must be relative"));
        }
        if raw.split('/').any(|segment| segment == "..") {
            return Err(invalid("must not contain '..'"));
        }

        let cleaned = clean(&raw);
        if cleaned.is_empty() {
            return Err(invalid("must not be empty"));
        }
        Ok(Self { inner: cleaned })
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Resolve this (relative) path against a native root directory.
    pub fn under(&self, root: &Path) -> PathBuf {
        self.inner
            .split('/')
            .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
    }

    /// Join this path with a segment.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.replace('\\', "/");
        let joined = if self.inner.is_empty() {
            segment
        } else {
            format!("{}/{}", self.inner, segment)
        };
        Self {
            inner: clean(&joined),
        }
    }

    /// Get the parent directory.
    pub fn parent(&self) -> Option<Self> {
        match self.inner.rfind('/') {
            Some(0) => Some(Self {
                inner: "/".to_string(),
            }),
            Some(idx) => Some(Self {
                inner: self.inner[..idx].to_string(),
            }),
            None => None,
        }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        self.inner.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.inner.split('/').filter(|s| !s.is_empty())
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 { None } else { Some(&name[idx + 1..]) }
        })
    }
}

/// Lexically clean a forward-slash path.
fn clean(raw: &str) -> String {
    let network = raw.starts_with("//") && !raw.starts_with("///");
    let absolute = raw.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    let body = parts.join("/");
    if network {
        format!("//{}", body)
    } else if absolute {
        format!("/{}", body)
    } else {
        body
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

/// Validate that a name is safe to use as a single directory component.
///
/// Group names end up in state, ledger and bin paths, so they must not
/// contain separators, traversal or control characters.
pub fn validate_path_identifier(name: &str, label: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err(format!("{} must not be empty", label));
    }
    if name == "." || name == ".." {
        return Err(format!("{} '{}' is not allowed", label, name));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| matches!(c, '/' | '\\' | ':' | '\0') || c.is_control())
    {
        return Err(format!(
            "{} '{}' contains invalid character {:?}",
            label, name, bad
        ));
    }
    Ok(())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Canonicalize a directory that may not exist yet.
///
/// Existing paths are resolved with `dunce` (no `\\?\` prefixes on Windows);
/// missing ones are returned unchanged so first-run groups still work.
pub fn resolve_dir(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_rejects_traversal() {
        assert!(NormalizedPath::relative("../etc/passwd").is_err());
        assert!(NormalizedPath::relative("a/../../b").is_err());
        assert!(NormalizedPath::relative("/abs").is_err());
        assert!(NormalizedPath::relative("").is_err());
    }

    #[test]
    fn relative_normalizes_separators() {
        let p = NormalizedPath::relative("dir\\sub//file.txt").unwrap();
        assert_eq!(p.as_str(), "dir/sub/file.txt");
    }

    #[test]
    fn under_resolves_against_root() {
        let p = NormalizedPath::relative("a/b.txt").unwrap();
        assert_eq!(p.under(Path::new("/root")), PathBuf::from("/root/a/b.txt"));
    }

    #[test]
    fn identifier_validation() {
        assert!(validate_path_identifier("photos", "Group name").is_ok());
        assert!(validate_path_identifier("my-docs_2", "Group name").is_ok());
        assert!(validate_path_identifier("a/b", "Group name").is_err());
        assert!(validate_path_identifier("..", "Group name").is_err());
        assert!(validate_path_identifier("", "Group name").is_err());
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/srv/data"), PathBuf::from("/srv/data"));
    }
}

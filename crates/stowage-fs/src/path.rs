//! Lexical path normalization.
//!
//! Resolves `.` and `..` segments of an absolute path without touching the
//! filesystem, so symbolic links are never resolved. Both `/` and `\` are
//! accepted as separators and rewritten to the platform separator.

use std::fmt;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// A normalized path split into its root and its segments.
///
/// The root is one of a drive (`C:\`), a UNC share (`\\server\share\`),
/// the unix root (`/`), or empty for relative input. Segments never contain
/// `.` or `..`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileLocation {
    root: String,
    segments: Vec<String>,
    separator: char,
}

impl FileLocation {
    /// Normalize `path`, or `None` when a `..` would climb above the root or
    /// the path is not valid UTF-8.
    pub fn resolve(path: impl AsRef<Path>) -> Option<Self> {
        let text = path.as_ref().to_str()?;
        Self::resolve_with(text, MAIN_SEPARATOR)
    }

    fn resolve_with(path: &str, separator: char) -> Option<Self> {
        let (root, rest) = dissect(path, separator);

        let mut segments: Vec<String> = Vec::new();
        for token in rest.split(separator).filter(|t| !t.is_empty()) {
            match token {
                "." => {}
                ".." => {
                    segments.pop()?;
                }
                _ => segments.push(token.to_owned()),
            }
        }

        Some(Self {
            root,
            segments,
            separator,
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(self.to_string())
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", self.separator)?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// Split `path` into `(root, remainder)` after rewriting separators.
fn dissect(path: &str, sep: char) -> (String, String) {
    let path: String = path
        .chars()
        .map(|c| if c == '/' || c == '\\' { sep } else { c })
        .collect();

    // drive letter, e.g. `C:`
    if let Some(colon) = path.find(':').filter(|&i| i > 0 && !path[..i].contains(sep)) {
        let mut root = path[..=colon].to_owned();
        root.push(sep);
        let rest = path[colon + 1..].strip_prefix(sep).unwrap_or(&path[colon + 1..]);
        return (root, rest.to_owned());
    }

    let mut leading = path.chars();
    let unc = leading.next() == Some(sep) && leading.next() == Some(sep);
    if unc {
        let share = path[2..].find(sep).map(|i| i + 2);
        let end = share.and_then(|s| path[s + 1..].find(sep).map(|i| i + s + 1));
        return match end {
            Some(end) => (path[..=end].to_owned(), path[end + 1..].to_owned()),
            None => (path, String::new()),
        };
    }

    match path.strip_prefix(sep) {
        Some(rest) => (sep.to_string(), rest.to_owned()),
        None => (String::new(), path),
    }
}

/// Normalize `path` lexically.
///
/// When a `..` segment cannot be resolved because only the root is left, the
/// original path is returned untouched instead of failing.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    match FileLocation::resolve(path) {
        Some(location) => location.to_path_buf(),
        None => path.to_path_buf(),
    }
}

/// Resolve `name` against `base` unless it is already absolute, then normalize.
pub fn resolve_file(base: impl AsRef<Path>, name: impl AsRef<Path>) -> PathBuf {
    let name = name.as_ref();
    if name.is_absolute() {
        normalize(name)
    } else {
        normalize(base.as_ref().join(name))
    }
}

/// Absolute, normalized form of `path` relative to the working directory.
pub(crate) fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    std::path::absolute(path).map(normalize)
}

//! Persisted `key=value` bookkeeping in `.properties` format.
//!
//! Used for small status files next to cached artifacts. Problems loading
//! or saving are logged and otherwise ignored: a lost status file only costs
//! a re-download.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::atomic::{AtomicWriteOptions, atomic_write};
use crate::provider::FileSystem;

#[derive(Clone, Debug)]
pub struct PropertiesFile {
    path: PathBuf,
    header: Option<String>,
    entries: BTreeMap<String, String>,
}

impl PropertiesFile {
    /// Load `path` through `fs` if it exists. Unreadable or malformed
    /// content yields an empty set and a warning.
    pub fn open<F>(fs: &F, path: impl Into<PathBuf>, header: Option<&str>) -> Self
    where
        F: FileSystem + ?Sized,
    {
        let path = path.into();
        let entries = match read_text(fs, &path) {
            Ok(Some(text)) => parse(&text).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "ignoring malformed properties file"
                );
                BTreeMap::new()
            }),
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to read properties file"
                );
                BTreeMap::new()
            }
        };

        Self {
            path,
            header: header.map(str::to_owned),
            entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.entries.iter()
    }

    /// Rewrite the whole file through `fs`. Failures are logged, not
    /// returned.
    pub fn save<F>(&self, fs: &F)
    where
        F: FileSystem + ?Sized,
    {
        let text = render(self.header.as_deref(), &self.entries);
        let options = AtomicWriteOptions::new();
        if let Err(e) = atomic_write(fs, &self.path, text.as_bytes(), options) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to write properties file"
            );
        }
    }
}

/// Content of `path` as UTF-8, `None` when the file does not exist.
fn read_text<F>(fs: &F, path: &Path) -> io::Result<Option<String>>
where
    F: FileSystem + ?Sized,
{
    let mut reader = match fs.open(path) {
        Ok(reader) => reader,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(Some(text))
}

impl<'a> IntoIterator for &'a PropertiesFile {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn parse(text: &str) -> io::Result<BTreeMap<String, String>> {
    let mut entries = BTreeMap::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = trimmed.to_owned();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        entries.insert(unescape(key)?, unescape(value)?);
    }
    Ok(entries)
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if matches!(c, '=' | ':') || c.is_whitespace() {
            key_end = i;
            break;
        }
    }

    let rest = line[key_end..].trim_start();
    let rest = match rest.chars().next() {
        Some('=' | ':') => rest[1..].trim_start(),
        _ => rest,
    };
    (&line[..key_end], rest)
}

fn unescape(text: &str) -> io::Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        let message = format!("malformed \\u escape: {hex}");
                        io::Error::new(io::ErrorKind::InvalidData, message)
                    })?;
                out.push(code);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn escape(text: &str, is_key: bool, out: &mut String) {
    for (i, c) in text.chars().enumerate() {
        match c {
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '\\' | '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{c}' => out.push_str("\\f"),
            _ => out.push(c),
        }
    }
}

fn render(header: Option<&str>, entries: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    if let Some(header) = header {
        for line in header.lines() {
            out.push('#');
            out.push_str(line);
            out.push('\n');
        }
    }
    for (key, value) in entries {
        escape(key, true, &mut out);
        out.push('=');
        escape(value, false, &mut out);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::OsFileSystem;
    use tempfile::tempdir;

    #[test]
    fn test_parse_separators_and_comments() {
        let entries = parse(
            "# header\n! bang comment\n\na=1\nb : 2\nc 3\nd=multi \\\n    line\nempty=\n",
        )
        .unwrap();
        assert_eq!(entries["a"], "1");
        assert_eq!(entries["b"], "2");
        assert_eq!(entries["c"], "3");
        assert_eq!(entries["d"], "multi line");
        assert_eq!(entries["empty"], "");
        assert_eq!(entries.len(), 5);
    }

    #[test]
    fn test_escaped_keys_and_values_survive_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/status.properties");

        let mut props = PropertiesFile::open(&OsFileSystem, &path, Some("artifact status"));
        props.set("key with=sep:and#hash", " leading space\ttab\nnewline \\ slash");
        props.set("plain", "value");
        props.save(&OsFileSystem);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("#artifact status\n"));

        let reloaded = PropertiesFile::open(&OsFileSystem, &path, None);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.get("key with=sep:and#hash"),
            Some(" leading space\ttab\nnewline \\ slash")
        );
        assert_eq!(reloaded.get("plain"), Some("value"));
    }

    #[test]
    fn test_unicode_escape() {
        let entries = parse("name=caf\\u00e9\n").unwrap();
        assert_eq!(entries["name"], "café");
        assert!(parse("bad=\\u00zz\n").is_err());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.properties");
        std::fs::write(&path, b"k=\xff\xfe").unwrap();

        let props = PropertiesFile::open(&OsFileSystem, &path, None);
        assert!(props.is_empty());
    }

    #[test]
    fn test_missing_file_loads_empty_and_remove_works() {
        let dir = tempdir().unwrap();
        let mut props = PropertiesFile::open(&OsFileSystem, dir.path().join("absent"), None);
        assert!(props.is_empty());

        props.set("a", "1");
        assert_eq!(props.remove("a"), Some("1".to_owned()));
        assert!(props.iter().next().is_none());
    }
}

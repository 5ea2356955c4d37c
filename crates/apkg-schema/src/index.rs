//! Parser for the repository index text.
//!
//! The index is a sequence of stanzas separated by blank lines. Each stanza
//! is a set of `<Key>:<Value>` lines; only `P` (name), `V` (version) and
//! `D` (dependencies) are read. Stanzas without a name or a version are
//! metadata, not packages, and are dropped.

use crate::catalog::CatalogEntry;
use crate::types::{PackageName, Version};

/// Characters that open a version constraint inside a dependency token.
const CONSTRAINT_CHARS: &[char] = &['<', '>', '=', '~'];

/// Parse index text into catalog entries, in file order.
///
/// # Example
///
/// ```
/// use apkg_schema::{parse_index, PackageName};
///
/// let text = "P:curl\nV:8.9.1-r0\nD:ca-certificates libcurl>=8.9.1\n\nP:libcurl\nV:8.9.1-r0\n";
/// let entries = parse_index(text);
/// assert_eq!(entries.len(), 2);
/// let expected: Vec<PackageName> = vec!["ca-certificates".into(), "libcurl".into()];
/// assert_eq!(entries[0].deps, expected);
/// ```
pub fn parse_index(text: &str) -> Vec<CatalogEntry> {
    let mut entries = Vec::new();
    let mut stanza = Stanza::default();

    for raw in text.lines() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            if let Some(entry) = stanza.finish() {
                entries.push(entry);
            }
            continue;
        }
        stanza.feed(line);
    }
    if let Some(entry) = stanza.finish() {
        entries.push(entry);
    }

    entries
}

/// Strip the version constraint from one dependency token.
///
/// Returns `None` for tokens that do not name a dependency: empty tokens
/// and conflict markers (`!name`).
///
/// # Example
///
/// ```
/// use apkg_schema::index::dependency_name;
///
/// assert_eq!(dependency_name("musl>=1.2.5"), Some("musl"));
/// assert_eq!(dependency_name("so:libc.musl-x86_64.so.1"), Some("so:libc.musl-x86_64.so.1"));
/// assert_eq!(dependency_name("!busybox-initscripts"), None);
/// ```
pub fn dependency_name(token: &str) -> Option<&str> {
    if token.starts_with('!') {
        return None;
    }
    let name = token
        .find(CONSTRAINT_CHARS)
        .map_or(token, |idx| &token[..idx]);
    if name.is_empty() { None } else { Some(name) }
}

#[derive(Default)]
struct Stanza {
    name: Option<String>,
    version: Option<String>,
    deps: Option<String>,
}

impl Stanza {
    fn feed(&mut self, line: &str) {
        let Some((key, value)) = line.split_once(':') else {
            return;
        };
        match key {
            "P" => self.name = Some(value.to_string()),
            "V" => self.version = Some(value.to_string()),
            "D" => self.deps = Some(value.to_string()),
            _ => {}
        }
    }

    fn finish(&mut self) -> Option<CatalogEntry> {
        let stanza = std::mem::take(self);
        let name = stanza.name.filter(|n| !n.is_empty())?;
        let version = stanza.version.filter(|v| !v.is_empty())?;
        let deps = stanza
            .deps
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .filter_map(dependency_name)
            .map(PackageName::new)
            .collect();
        Some(CatalogEntry::new(
            PackageName::from(name),
            Version::from(version),
            deps,
        ))
    }
}

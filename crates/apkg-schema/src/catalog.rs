//! The merged package catalog.
//!
//! A [`Catalog`] is rebuilt from scratch on every run. Repositories are
//! merged in configuration order and the first repository to publish a name
//! owns it; later repositories never replace an owned entry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::PACKAGE_EXTENSION;
use crate::types::{PackageName, RepoUrl, Version};

/// One package as published by a repository index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Package name.
    pub name: PackageName,
    /// Published version.
    pub version: Version,
    /// Archive filename, always `name-version.apk`.
    pub filename: String,
    /// Dependency names in declared order, constraints already stripped.
    pub deps: Vec<PackageName>,
}

impl CatalogEntry {
    /// Create an entry, deriving the archive filename from name and version.
    pub fn new(name: PackageName, version: Version, deps: Vec<PackageName>) -> Self {
        let filename = format!("{name}-{version}{PACKAGE_EXTENSION}");
        Self {
            name,
            version,
            filename,
            deps,
        }
    }
}

/// Merged view of every repository's packages for one run.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<PackageName, CatalogEntry>,
    owners: HashMap<PackageName, RepoUrl>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one repository's entries into the catalog.
    ///
    /// Names already owned by an earlier repository (or repeated within
    /// this one) are ignored. Returns how many names this repository claimed.
    pub fn merge(
        &mut self,
        repo: &RepoUrl,
        entries: impl IntoIterator<Item = CatalogEntry>,
    ) -> usize {
        let mut claimed = 0;
        for entry in entries {
            if self.entries.contains_key(&entry.name) {
                continue;
            }
            self.owners.insert(entry.name.clone(), repo.clone());
            self.entries.insert(entry.name.clone(), entry);
            claimed += 1;
        }
        claimed
    }

    /// Look up a package by name.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    /// The repository that owns `name` in this catalog.
    pub fn owner(&self, name: &str) -> Option<&RepoUrl> {
        self.owners.get(name)
    }

    /// Number of distinct package names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no repository contributed any package.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, version: &str) -> CatalogEntry {
        CatalogEntry::new(name.into(), version.into(), vec![])
    }

    #[test]
    fn test_filename_is_derived() {
        let e = entry("busybox", "1.36.1-r29");
        assert_eq!(e.filename, "busybox-1.36.1-r29.apk");
    }

    #[test]
    fn test_first_repo_wins() {
        let main = RepoUrl::new("https://a.example/main");
        let community = RepoUrl::new("https://b.example/community");

        let mut catalog = Catalog::new();
        assert_eq!(catalog.merge(&main, vec![entry("p", "1.0")]), 1);
        assert_eq!(
            catalog.merge(&community, vec![entry("p", "2.0"), entry("q", "1.0")]),
            1
        );

        assert_eq!(catalog.get("p").unwrap().version, "1.0");
        assert_eq!(catalog.owner("p"), Some(&main));
        assert_eq!(catalog.owner("q"), Some(&community));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_duplicate_within_repo_keeps_first() {
        let repo = RepoUrl::new("https://a.example");
        let mut catalog = Catalog::new();
        catalog.merge(&repo, vec![entry("p", "1.0"), entry("p", "1.1")]);
        assert_eq!(catalog.get("p").unwrap().version, "1.0");
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::new();
        assert!(catalog.is_empty());
        assert!(catalog.get("anything").is_none());
        assert!(catalog.owner("anything").is_none());
    }
}

//! Newtypes for package names, versions and repository URLs.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// A package name as it appears in the index (`P:` field).
///
/// Names are case-sensitive and stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageName(String);

impl PackageName {
    /// Create a package name from the given string.
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for PackageName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PackageName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An opaque package version string (`V:` field).
///
/// Versions are only ever compared for equality: a ledger version that
/// differs from the catalog version means "upgrade", whichever is newer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(String);

impl Version {
    /// Create a new version from the given string (stored as-is).
    pub fn new(v: &str) -> Self {
        Self(v.to_string())
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Version {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Base URL of one remote package source.
///
/// The position of a repository in configuration decides which one owns a
/// package name when several repositories publish it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoUrl(String);

impl RepoUrl {
    /// Create a repository URL from the given string (stored as-is).
    pub fn new(url: &str) -> Self {
        Self(url.to_string())
    }

    /// Return the URL as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the URL of a file published at the root of this repository.
    ///
    /// # Example
    ///
    /// ```
    /// use apkg_schema::RepoUrl;
    ///
    /// let repo = RepoUrl::new("https://mirror.example/v3.20/main/x86_64/");
    /// assert_eq!(
    ///     repo.file_url("APKINDEX.tar.gz"),
    ///     "https://mirror.example/v3.20/main/x86_64/APKINDEX.tar.gz"
    /// );
    /// ```
    pub fn file_url(&self, filename: &str) -> String {
        format!("{}/{filename}", self.0.trim_end_matches('/'))
    }
}

impl std::fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RepoUrl {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RepoUrl {
    fn from(s: String) -> Self {
        Self(s)
    }
}

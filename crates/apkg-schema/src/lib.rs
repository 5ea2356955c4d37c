//! Shared types and index format for apkg.
//!
//! Everything in this crate is pure data: package identifiers, catalog
//! entries, the merged [`Catalog`], and the parser for the blank-line
//! delimited index text served by every repository. Network and filesystem
//! side effects live in `apkg-core`.

pub mod catalog;
pub mod index;
pub mod types;

// Re-exports
pub use catalog::{Catalog, CatalogEntry};
pub use index::parse_index;
pub use types::*;

/// Extension appended to `name-version` to form a package archive filename.
pub const PACKAGE_EXTENSION: &str = ".apk";

/// Name of the compressed index archive at the root of every repository.
pub const INDEX_ARCHIVE: &str = "APKINDEX.tar.gz";

/// Name of the index text entry inside [`INDEX_ARCHIVE`].
pub const INDEX_ENTRY: &str = "APKINDEX";

/// Package metadata entry; never installed and never preserved.
pub const PKGINFO: &str = ".PKGINFO";

/// Lifecycle hook scripts. Excluded from the installable tree but kept
/// aside so their presence can be reported after placement.
pub const LIFECYCLE_HOOKS: &[&str] = &[
    ".pre-install",
    ".post-install",
    ".pre-upgrade",
    ".post-upgrade",
    ".pre-deinstall",
    ".post-deinstall",
    ".trigger",
];

/// Prefix of detached signature entries.
pub const SIGNATURE_PREFIX: &str = ".SIGN.";

/// Suffix of public-key entries shipped at the archive root.
pub const PUBLIC_KEY_SUFFIX: &str = ".pub";

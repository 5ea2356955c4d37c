//! Ledger Store
//!
//! The ledger (`installed.toml`) is the single record of what is on disk:
//! one `[[package]]` table per installed package. Each installed package
//! also owns a file manifest, a JSON array of paths relative to the target
//! root, stored separately so it can be rebuilt without touching the ledger.
//!
//! All writes go through [`write_atomic`](crate::write_atomic) and fully
//! replace the previous file.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use apkg_schema::{PackageName, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Layout;
use crate::io::write_atomic;

/// Installed package name to installed version.
pub type Installed = BTreeMap<PackageName, Version>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ledger {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("manifest {} is corrupt: {source}", path.display())]
    CorruptManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode ledger: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("failed to encode manifest: {0}")]
    EncodeManifest(#[from] serde_json::Error),
}

impl LedgerError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRecord {
    pub name: PackageName,
    pub version: Version,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default, rename = "package")]
    packages: Vec<InstalledRecord>,
}

/// Synchronous access to the ledger and manifests under one [`Layout`].
#[derive(Debug, Clone)]
pub struct LedgerStore {
    layout: Layout,
}

impl LedgerStore {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Load the ledger. A missing file is an empty ledger; any other read or
    /// parse failure is an error, never an empty result.
    pub fn load(&self) -> Result<Installed, LedgerError> {
        let path = self.layout.ledger_path();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Installed::new()),
            Err(e) => return Err(LedgerError::io(&path)(e)),
        };
        let file: LedgerFile =
            toml::from_str(&text).map_err(|source| LedgerError::Corrupt { path, source })?;

        Ok(file
            .packages
            .into_iter()
            .map(|r| (r.name, r.version))
            .collect())
    }

    /// Replace the ledger with exactly `installed`.
    pub fn save(&self, installed: &Installed) -> Result<(), LedgerError> {
        let file = LedgerFile {
            packages: installed
                .iter()
                .map(|(name, version)| InstalledRecord {
                    name: name.clone(),
                    version: version.clone(),
                })
                .collect(),
        };
        let content = toml::to_string_pretty(&file)?;
        let path = self.layout.ledger_path();
        write_atomic(&path, content.as_bytes()).map_err(LedgerError::io(&path))
    }

    /// Load one package's manifest. `None` means the manifest is unknown,
    /// which is distinct from an empty manifest.
    pub fn load_manifest(&self, name: &str) -> Result<Option<Vec<PathBuf>>, LedgerError> {
        let path = self.layout.manifest_path(name);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LedgerError::io(&path)(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| LedgerError::CorruptManifest { path, source })
    }

    pub fn save_manifest(&self, name: &str, paths: &[PathBuf]) -> Result<(), LedgerError> {
        let content = serde_json::to_vec_pretty(paths)?;
        let path = self.layout.manifest_path(name);
        write_atomic(&path, &content).map_err(LedgerError::io(&path))
    }

    /// Delete one package's manifest. Deleting a missing manifest succeeds.
    pub fn delete_manifest(&self, name: &str) -> Result<(), LedgerError> {
        let path = self.layout.manifest_path(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LedgerError::io(&path)(e)),
        }
    }
}

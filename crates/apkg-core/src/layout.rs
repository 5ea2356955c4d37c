//! On-disk layout of persistent and transient state.
//!
//! ```text
//! <state-dir>/
//! ├── installed.toml          # Ledger
//! ├── installed_files/        # One JSON manifest per installed package
//! ├── staged/                 # Downloaded archives
//! └── staging/<name>/
//!     ├── tree/               # Installable entries
//!     └── control/            # Preserved hook scripts
//! ```

use std::path::{Path, PathBuf};

use crate::io::extract::StagedTree;

/// Environment variable that overrides the state directory.
pub const HOME_ENV: &str = "APKG_HOME";

/// Root of all state for one target machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Pick the state directory: an explicit path wins, then `APKG_HOME`,
    /// then the current directory.
    pub fn resolve(explicit: Option<PathBuf>) -> std::io::Result<Self> {
        if let Some(root) = explicit {
            return Ok(Self::new(root));
        }
        if let Some(val) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(val));
        }
        std::env::current_dir().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ledger path: `<state>/installed.toml`
    pub fn ledger_path(&self) -> PathBuf {
        self.root.join("installed.toml")
    }

    /// Manifest directory: `<state>/installed_files`
    pub fn manifests_dir(&self) -> PathBuf {
        self.root.join("installed_files")
    }

    /// Manifest of one package: `<state>/installed_files/<name>.json`
    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.manifests_dir().join(format!("{name}.json"))
    }

    /// Download directory: `<state>/staged`
    pub fn staged_dir(&self) -> PathBuf {
        self.root.join("staged")
    }

    pub fn staged_archive(&self, filename: &str) -> PathBuf {
        self.staged_dir().join(filename)
    }

    /// Extraction root: `<state>/staging`
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    pub fn staged_tree(&self, name: &str) -> StagedTree {
        StagedTree::new(&self.staging_dir().join(name))
    }

    /// Create the staging directories. Failure here is fatal for a run.
    pub fn prepare_staging(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.staged_dir())?;
        std::fs::create_dir_all(self.staging_dir())
    }

    /// Remove downloaded archives and extraction trees.
    pub fn clean_staging(&self) {
        for dir in [self.staged_dir(), self.staging_dir()] {
            if let Err(e) = std::fs::remove_dir_all(&dir)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(path = %dir.display(), error = %e, "failed to clean staging");
            }
        }
    }
}

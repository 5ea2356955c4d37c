//! Desired-state configuration (`apkg.toml`)
//!
//! The file is read into an immutable [`DesiredState`] for reconciliation.
//! Mutations (`add`, `remove`, `reinstall`) go through [`ConfigDocument`],
//! which edits the TOML in place so comments and layout survive.

use std::path::{Path, PathBuf};

use apkg_schema::{PackageName, RepoUrl};
use serde::Deserialize;
use thiserror::Error;
use toml_edit::{Array, DocumentMut};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },

    #[error("invalid config {}: `packages` must be an array of strings", path.display())]
    PackagesShape { path: PathBuf },
}

fn default_true() -> bool {
    true
}

fn default_install_dir() -> PathBuf {
    PathBuf::from("root")
}

/// What the operator wants on the target root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DesiredState {
    /// Repositories in precedence order.
    #[serde(default)]
    pub repos: Vec<RepoUrl>,

    /// Packages to keep installed, in declared order.
    #[serde(default)]
    pub packages: Vec<PackageName>,

    /// Place packages; when off, packages are only staged and extracted.
    #[serde(default = "default_true")]
    pub install: bool,

    /// Target root. Relative paths resolve against the config's directory.
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,

    /// Hand detected lifecycle hooks to the script runner.
    #[serde(default)]
    pub run_scripts: bool,

    /// Expand dependencies transitively.
    #[serde(default = "default_true")]
    pub resolve_deps: bool,
}

impl Default for DesiredState {
    fn default() -> Self {
        Self {
            repos: Vec::new(),
            packages: Vec::new(),
            install: true,
            install_dir: default_install_dir(),
            run_scripts: false,
            resolve_deps: true,
        }
    }
}

impl DesiredState {
    /// Parse config text read from `path`; relative paths hang off its directory.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut desired: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if desired.install_dir.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            desired.install_dir = base.join(&desired.install_dir);
        }
        Ok(desired)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        ConfigDocument::open(path)?.desired()
    }

    pub fn wants(&self, name: &str) -> bool {
        self.packages.iter().any(|p| p == name)
    }
}

/// An editable `apkg.toml`.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    path: PathBuf,
    doc: DocumentMut,
}

impl ConfigDocument {
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc = text.parse::<DocumentMut>().map_err(|source| ConfigError::Syntax {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            doc,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current document as a [`DesiredState`], including unsaved edits.
    pub fn desired(&self) -> Result<DesiredState, ConfigError> {
        DesiredState::from_toml(&self.doc.to_string(), &self.path)
    }

    fn packages_mut(&mut self) -> Result<&mut Array, ConfigError> {
        if !self.doc.contains_key("packages") {
            self.doc.insert("packages", toml_edit::value(Array::new()));
        }
        self.doc
            .get_mut("packages")
            .and_then(|item| item.as_array_mut())
            .ok_or_else(|| ConfigError::PackagesShape {
                path: self.path.clone(),
            })
    }

    /// Append `name` unless already present. Returns whether it changed.
    pub fn add_package(&mut self, name: &str) -> Result<bool, ConfigError> {
        let packages = self.packages_mut()?;
        if packages.iter().any(|v| v.as_str() == Some(name)) {
            return Ok(false);
        }
        packages.push(name);
        Ok(true)
    }

    /// Drop every occurrence of `name`. Returns whether it changed.
    pub fn remove_package(&mut self, name: &str) -> Result<bool, ConfigError> {
        let packages = self.packages_mut()?;
        let before = packages.len();
        packages.retain(|v| v.as_str() != Some(name));
        Ok(packages.len() != before)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        apkg_core::write_atomic(&self.path, self.doc.to_string().as_bytes()).map_err(|source| {
            ConfigError::Io {
                path: self.path.clone(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"# edge mirror
repos = [
    "https://dl-cdn.alpinelinux.org/alpine/v3.20/main/x86_64",
]

# keep this short
packages = ["busybox", "curl"]
run_scripts = true
"#;

    fn write_config(text: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("apkg.toml");
        std::fs::write(&path, text).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_defaults() {
        let desired = DesiredState::from_toml("", Path::new("apkg.toml")).unwrap();
        assert!(desired.install);
        assert!(desired.resolve_deps);
        assert!(!desired.run_scripts);
        assert_eq!(desired.install_dir, PathBuf::from("root"));
        assert!(desired.packages.is_empty());
    }

    #[test]
    fn test_install_dir_is_relative_to_config() {
        let desired =
            DesiredState::from_toml("install_dir = \"target\"", Path::new("/etc/apkg/apkg.toml"))
                .unwrap();
        assert_eq!(desired.install_dir, PathBuf::from("/etc/apkg/target"));

        let desired = DesiredState::from_toml("install_dir = \"/\"", Path::new("/etc/apkg/apkg.toml"))
            .unwrap();
        assert_eq!(desired.install_dir, PathBuf::from("/"));
    }

    #[test]
    fn test_load_sample() {
        let (_tmp, path) = write_config(SAMPLE);
        let desired = DesiredState::load(&path).unwrap();
        assert_eq!(desired.repos.len(), 1);
        assert!(desired.wants("curl"));
        assert!(desired.run_scripts);
    }

    #[test]
    fn test_unreadable_config_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = DesiredState::load(&tmp.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let (_tmp, path) = write_config("packages = \"busybox\"");
        assert!(DesiredState::load(&path).is_err());
    }

    #[test]
    fn test_edits_preserve_comments() {
        let (_tmp, path) = write_config(SAMPLE);
        let mut doc = ConfigDocument::open(&path).unwrap();

        assert!(doc.add_package("jq").unwrap());
        assert!(!doc.add_package("jq").unwrap());
        assert!(doc.remove_package("busybox").unwrap());
        assert!(!doc.remove_package("busybox").unwrap());
        doc.save().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("# edge mirror"));
        assert!(text.contains("# keep this short"));

        let desired = DesiredState::load(&path).unwrap();
        let names: Vec<&str> = desired.packages.iter().map(PackageName::as_str).collect();
        assert_eq!(names, vec!["curl", "jq"]);
    }

    #[test]
    fn test_add_creates_packages_key() {
        let (_tmp, path) = write_config("repos = []\n");
        let mut doc = ConfigDocument::open(&path).unwrap();
        assert!(doc.add_package("busybox").unwrap());
        assert!(doc.desired().unwrap().wants("busybox"));
    }
}

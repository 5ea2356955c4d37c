//! Package archive extraction
//!
//! A package is a gzip stream of one or more members wrapping concatenated
//! tar streams (signature, control, data). Entries are split three ways:
//! installable entries go to the staging tree, lifecycle hooks go to the
//! control side directory, and everything else reserved is dropped.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};

use apkg_schema::{LIFECYCLE_HOOKS, PKGINFO, PUBLIC_KEY_SUFFIX, SIGNATURE_PREFIX};
use flate2::read::MultiGzDecoder;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid path in archive: {}", .0.display())]
    UnsafePath(PathBuf),
}

/// Per-package extraction destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedTree {
    /// Installable entries, relative to the target root.
    pub tree: PathBuf,
    /// Preserved hook scripts.
    pub control: PathBuf,
}

impl StagedTree {
    pub fn new(root: &Path) -> Self {
        Self {
            tree: root.join("tree"),
            control: root.join("control"),
        }
    }

    /// Remove both directories. Missing directories are fine.
    pub fn discard(&self) {
        for dir in [&self.tree, &self.control] {
            fs::remove_dir_all(dir).ok();
        }
    }
}

/// What extraction does with one archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryClass {
    Install,
    Hook,
    Drop,
}

/// Classify an archive entry by its path.
///
/// Reserved names only apply at the archive root; a nested `usr/share/.trigger`
/// is an ordinary file.
pub fn classify(path: &Path) -> EntryClass {
    let mut normal = path.components().filter_map(|c| match c {
        Component::Normal(part) => Some(part),
        _ => None,
    });
    let (Some(first), None) = (normal.next(), normal.next()) else {
        return EntryClass::Install;
    };
    let Some(name) = first.to_str() else {
        return EntryClass::Install;
    };

    if LIFECYCLE_HOOKS.contains(&name) {
        EntryClass::Hook
    } else if name == PKGINFO
        || name.starts_with(SIGNATURE_PREFIX)
        || name.ends_with(PUBLIC_KEY_SUFFIX)
    {
        EntryClass::Drop
    } else {
        EntryClass::Install
    }
}

/// Extract `archive` into `staged`, replacing any previous contents.
///
/// On failure the archive and both staging directories are removed, so a
/// failed package leaves nothing behind. Returns the number of regular
/// files written to the tree.
pub fn extract(archive: &Path, staged: &StagedTree) -> Result<usize, ExtractError> {
    let result = unpack(archive, staged);
    if let Err(e) = &result {
        tracing::debug!(archive = %archive.display(), error = %e, "extraction failed, discarding");
        fs::remove_file(archive).ok();
        staged.discard();
    }
    result
}

fn unpack(archive_path: &Path, staged: &StagedTree) -> Result<usize, ExtractError> {
    staged.discard();
    fs::create_dir_all(&staged.tree)?;
    fs::create_dir_all(&staged.control)?;

    let file = File::open(archive_path)?;
    let mut archive = tar::Archive::new(MultiGzDecoder::new(BufReader::new(file)));
    archive.set_ignore_zeros(true);
    archive.set_preserve_permissions(true);

    let mut files = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();

        let dest = match classify(&path) {
            EntryClass::Drop => continue,
            EntryClass::Hook => &staged.control,
            EntryClass::Install => &staged.tree,
        };
        if !entry.unpack_in(dest)? {
            return Err(ExtractError::UnsafePath(path));
        }
        if entry.header().entry_type().is_file() {
            files += 1;
        }
    }

    Ok(files)
}

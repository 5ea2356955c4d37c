//! Placement Engine
//!
//! Copies a staged tree into the target root and records what it placed,
//! and removes a package's recorded files again without pruning
//! directories that another package still owns files in.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

use apkg_schema::LIFECYCLE_HOOKS;
use thiserror::Error;
use walkdir::WalkDir;

use crate::io::extract::StagedTree;

#[derive(Error, Debug)]
pub enum PlaceError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to walk staging tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{failed} of {total} files could not be removed")]
    Incomplete { failed: usize, total: usize },
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> PlaceError + '_ {
    move |source| PlaceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Whether a detected hook script ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// Hook execution is disabled.
    NotRun,
    /// Handed off to the external script runner.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    pub name: String,
    pub outcome: HookOutcome,
}

/// Result of placing one package.
#[derive(Debug, Clone, Default)]
pub struct Placement {
    /// Placed paths relative to the target root, in traversal order.
    pub manifest: Vec<PathBuf>,
    pub hooks: Vec<Hook>,
}

/// Place a staged tree under `target_root`.
///
/// Directories are created with the staged mode, regular files are copied
/// with their mode bits, and symlinks are recreated. Anything already at a
/// destination (other than a directory) is replaced.
pub fn place(
    staged: &StagedTree,
    target_root: &Path,
    run_hooks: bool,
) -> Result<Placement, PlaceError> {
    fs::create_dir_all(target_root).map_err(io_at(target_root))?;
    let mut manifest = Vec::new();

    for entry in walk(&staged.tree) {
        let entry = entry?;
        let Ok(rel) = entry.path().strip_prefix(&staged.tree) else {
            continue;
        };
        let dest = target_root.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            ensure_dir(entry.path(), &dest)?;
            continue;
        }

        clear_destination(&dest)?;
        if file_type.is_symlink() {
            let link = fs::read_link(entry.path()).map_err(io_at(entry.path()))?;
            std::os::unix::fs::symlink(&link, &dest).map_err(io_at(&dest))?;
        } else {
            fs::copy(entry.path(), &dest).map_err(io_at(&dest))?;
        }
        manifest.push(rel.to_path_buf());
    }

    let hooks = detect_hooks(&staged.control, run_hooks);
    Ok(Placement { manifest, hooks })
}

/// Paths `place` would record for a staged tree, without placing anything.
pub fn placeable_paths(tree: &Path) -> Result<Vec<PathBuf>, PlaceError> {
    let mut paths = Vec::new();
    for entry in walk(tree) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(tree) {
            paths.push(rel.to_path_buf());
        }
    }
    Ok(paths)
}

fn walk(root: &Path) -> walkdir::IntoIter {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
}

fn ensure_dir(source: &Path, dest: &Path) -> Result<(), PlaceError> {
    // Follows symlinks, so a merged-/usr host keeps its `lib -> usr/lib`.
    if dest.is_dir() {
        return Ok(());
    }
    clear_destination(dest)?;
    fs::create_dir(dest).map_err(io_at(dest))?;
    let mode = fs::metadata(source).map_err(io_at(source))?.permissions().mode();
    fs::set_permissions(dest, fs::Permissions::from_mode(mode)).map_err(io_at(dest))
}

/// Unlink whatever non-directory sits at `dest`.
fn clear_destination(dest: &Path) -> Result<(), PlaceError> {
    match fs::symlink_metadata(dest) {
        Ok(meta) if !meta.is_dir() => fs::remove_file(dest).map_err(io_at(dest)),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_at(dest)(e)),
    }
}

fn detect_hooks(control: &Path, run_hooks: bool) -> Vec<Hook> {
    let outcome = if run_hooks {
        HookOutcome::Deferred
    } else {
        HookOutcome::NotRun
    };
    LIFECYCLE_HOOKS
        .iter()
        .filter(|name| control.join(name).is_file())
        .map(|name| Hook {
            name: (*name).to_string(),
            outcome,
        })
        .collect()
}

/// Outcome of removing one package's files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveReport {
    pub files_removed: usize,
    pub dirs_pruned: usize,
}

/// Remove the files in `manifest` from `target_root`.
///
/// Missing files are skipped. The parent directory of every entry is then a
/// pruning candidate, evaluated deepest first, and kept if any path in
/// `siblings` (every other installed package's manifest) lies beneath it.
/// Pruning is best effort: a directory that is not empty stays.
///
/// # Errors
///
/// Returns [`PlaceError::Incomplete`] if any listed file could not be
/// removed; the caller must then keep the package recorded as installed.
pub fn remove(
    manifest: &[PathBuf],
    target_root: &Path,
    siblings: &[PathBuf],
) -> Result<RemoveReport, PlaceError> {
    let mut report = RemoveReport::default();
    let mut failed = 0;
    let mut candidates = BTreeSet::new();

    for rel in manifest {
        if !is_contained(rel) {
            tracing::warn!(path = %rel.display(), "manifest path escapes target root, skipping");
            failed += 1;
            continue;
        }
        let path = target_root.join(rel);
        match fs::remove_file(&path) {
            Ok(()) => report.files_removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove file");
                failed += 1;
            }
        }
        if let Some(parent) = rel.parent().filter(|p| !p.as_os_str().is_empty()) {
            candidates.insert(parent.to_path_buf());
        }
    }

    let mut dirs: Vec<PathBuf> = candidates.into_iter().collect();
    dirs.sort_by_key(|d| std::cmp::Reverse(d.as_os_str().len()));

    for dir in dirs {
        if siblings.iter().any(|s| s.starts_with(&dir)) {
            tracing::debug!(dir = %dir.display(), "directory shared with another package");
            continue;
        }
        match fs::remove_dir(target_root.join(&dir)) {
            Ok(()) => report.dirs_pruned += 1,
            Err(e) => tracing::debug!(dir = %dir.display(), error = %e, "directory kept"),
        }
    }

    if failed > 0 {
        return Err(PlaceError::Incomplete {
            failed,
            total: manifest.len(),
        });
    }
    Ok(report)
}

fn is_contained(rel: &Path) -> bool {
    rel.components().all(|c| matches!(c, Component::Normal(_)))
        && rel.components().next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, data: &str, mode: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_place_copies_files_modes_and_links() {
        let tmp = tempfile::tempdir().unwrap();
        let staged = StagedTree::new(&tmp.path().join("staging/hello"));
        write(&staged.tree.join("usr/bin/hello"), "#!/bin/sh\n", 0o755);
        write(&staged.tree.join("etc/hello.conf"), "x=1\n", 0o644);
        std::os::unix::fs::symlink("hello", staged.tree.join("usr/bin/hi")).unwrap();
        fs::create_dir_all(&staged.control).unwrap();

        let root = tmp.path().join("root");
        let placement = place(&staged, &root, false).unwrap();

        assert_eq!(
            placement.manifest,
            paths(&["etc/hello.conf", "usr/bin/hello", "usr/bin/hi"])
        );
        let mode = fs::metadata(root.join("usr/bin/hello")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(
            fs::read_link(root.join("usr/bin/hi")).unwrap(),
            PathBuf::from("hello")
        );
        assert!(placement.hooks.is_empty());
    }

    #[test]
    fn test_place_replaces_existing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let staged = StagedTree::new(&tmp.path().join("staging/p"));
        write(&staged.tree.join("bin/tool"), "new", 0o755);

        let root = tmp.path().join("root");
        fs::create_dir_all(root.join("bin")).unwrap();
        std::os::unix::fs::symlink("/nonexistent", root.join("bin/tool")).unwrap();

        place(&staged, &root, false).unwrap();
        assert_eq!(fs::read_to_string(root.join("bin/tool")).unwrap(), "new");
    }

    #[test]
    fn test_hooks_are_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let staged = StagedTree::new(&tmp.path().join("staging/p"));
        fs::create_dir_all(&staged.tree).unwrap();
        write(&staged.control.join(".post-install"), "#!/bin/sh\n", 0o755);

        let root = tmp.path().join("root");
        let placement = place(&staged, &root, false).unwrap();
        assert_eq!(
            placement.hooks,
            vec![Hook {
                name: ".post-install".into(),
                outcome: HookOutcome::NotRun
            }]
        );

        let placement = place(&staged, &root, true).unwrap();
        assert_eq!(placement.hooks[0].outcome, HookOutcome::Deferred);
    }

    #[test]
    fn test_remove_keeps_shared_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(&root.join("usr/bin/a"), "a", 0o755);
        write(&root.join("usr/lib/shared/x"), "x", 0o644);
        write(&root.join("usr/lib/shared/y"), "y", 0o644);

        let manifest_a = paths(&["usr/bin/a", "usr/lib/shared/x"]);
        let manifest_b = paths(&["usr/lib/shared/y"]);

        let report = remove(&manifest_a, root, &manifest_b).unwrap();

        assert_eq!(report.files_removed, 2);
        assert!(!root.join("usr/bin/a").exists());
        assert!(!root.join("usr/bin").exists());
        assert!(!root.join("usr/lib/shared/x").exists());
        assert!(root.join("usr/lib/shared").is_dir());
        assert!(root.join("usr/lib/shared/y").is_file());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(&root.join("opt/p/file"), "", 0o644);

        let manifest = paths(&["opt/p/file"]);
        remove(&manifest, root, &[]).unwrap();
        let second = remove(&manifest, root, &[]).unwrap();
        assert_eq!(second, RemoveReport::default());
    }

    #[test]
    fn test_remove_leaves_unindexed_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(&root.join("etc/p/p.conf"), "", 0o644);
        write(&root.join("etc/p/local.conf"), "", 0o644);

        remove(&paths(&["etc/p/p.conf"]), root, &[]).unwrap();
        assert!(root.join("etc/p/local.conf").is_file());
    }

    #[test]
    fn test_remove_refuses_escaping_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        fs::create_dir_all(&root).unwrap();
        write(&tmp.path().join("outside"), "keep", 0o644);

        let err = remove(&paths(&["../outside"]), &root, &[]).unwrap_err();
        assert!(matches!(err, PlaceError::Incomplete { failed: 1, total: 1 }));
        assert!(tmp.path().join("outside").exists());
    }

    #[test]
    fn test_placeable_paths_matches_place() {
        let tmp = tempfile::tempdir().unwrap();
        let staged = StagedTree::new(&tmp.path().join("staging/p"));
        write(&staged.tree.join("b/two"), "", 0o644);
        write(&staged.tree.join("a/one"), "", 0o644);

        let listed = placeable_paths(&staged.tree).unwrap();
        let placement = place(&staged, &tmp.path().join("root"), false).unwrap();
        assert_eq!(listed, placement.manifest);
    }
}

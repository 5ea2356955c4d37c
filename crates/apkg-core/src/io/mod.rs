pub mod download;
pub mod extract;

use std::path::{Path, PathBuf};

/// Write `contents` to `path` through a sibling temp file and a rename, so
/// readers never observe a partially written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    std::fs::write(&temp, contents)?;
    std::fs::rename(&temp, path)
}

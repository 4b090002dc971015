//! Common file operations

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::constants::GO_EXT;

/// Recursively copy directory
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), String> {
    if !dst.exists() {
        fs::create_dir_all(dst)
            .map_err(|e| format!("Failed to create dir {}: {}", dst.display(), e))?;
    }

    for entry in fs::read_dir(src)
        .map_err(|e| format!("Failed to read dir {}: {}", src.display(), e))?
    {
        let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
        let path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if path.is_dir() {
            copy_dir_recursive(&path, &dst_path)?;
        } else {
            fs::copy(&path, &dst_path)
                .map_err(|e| format!("Failed to copy {}: {}", path.display(), e))?;
        }
    }

    Ok(())
}

/// Move a directory tree, falling back to copy + remove when `rename`
/// cannot cross filesystems. `dst` must not exist yet.
pub fn move_dir(src: &Path, dst: &Path) -> Result<(), String> {
    if dst.exists() {
        return Err(format!("Destination {} already exists", dst.display()));
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create dir {}: {}", parent.display(), e))?;
    }

    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !src.is_dir() {
                return Err(format!("Failed to move {}: {}", src.display(), rename_err));
            }
            copy_dir_recursive(src, dst).map_err(|e| {
                let _ = fs::remove_dir_all(dst);
                format!("Failed to move {} ({}); copy fallback: {}", src.display(), rename_err, e)
            })?;
            fs::remove_dir_all(src)
                .map_err(|e| format!("Copied {} but failed to remove it: {}", src.display(), e))
        }
    }
}

/// Convert a slash-separated module or package path into a relative path
pub fn module_rel_path(module_path: &str) -> PathBuf {
    module_path
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .collect()
}

/// Whether `path` names a Go source file
pub fn is_go_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == GO_EXT)
}

/// Find all .go files under `dir`, sorted for deterministic order
pub fn find_go_files(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| format!("Failed to walk {}: {}", dir.display(), e))?;
        if entry.file_type().is_file() && is_go_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// SHA-256 of every file under `dir`, keyed by relative path.
pub fn tree_fingerprint(dir: &Path) -> Result<BTreeMap<PathBuf, String>, String> {
    let mut hashes = BTreeMap::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| format!("Failed to walk {}: {}", dir.display(), e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let content = fs::read(entry.path())
            .map_err(|e| format!("Failed to read {}: {}", entry.path().display(), e))?;
        let rel = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_path_buf();
        hashes.insert(rel, hex::encode(Sha256::digest(&content)));
    }
    Ok(hashes)
}

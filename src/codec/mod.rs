// src/codec/mod.rs
//!
//! Path codec
//!
//! Clients never see real paths. Every entry is addressed by an opaque
//! identifier derived from its absolute path, and identifiers are turned
//! back into paths by searching the tree below the root. There is no
//! id → path index: every lookup re-hashes candidates, so a rename or move
//! invalidates the old identifier and nothing has to be kept in sync.
//!
//! Lookup cost is linear in the number of directories below the root.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};


/// Bytes of the SHA-256 digest kept in an identifier
const ID_BYTES: usize = 16;

/// Identifier of an absolute path.
///
/// Pure function of the path string. Collisions are not detected.
pub fn encode(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..ID_BYTES])
}

/// Children of `dir` sorted by file name, with their lossy display names
pub(crate) fn sorted_children(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        children.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
    }
    children.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));
    Ok(children)
}

fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Find the directory whose identifier is `id`, starting at `root`.
///
/// Symlinked directories are neither matched nor descended into, so the
/// result always lies inside `root`. Names refused by `accept` are skipped.
pub fn resolve_dir(id: &str, root: &Path, accept: &dyn Fn(&str) -> bool) -> Option<PathBuf> {
    if encode(root) == id {
        return Some(root.to_path_buf());
    }
    search_dirs(id, root, accept)
}

fn search_dirs(id: &str, dir: &Path, accept: &dyn Fn(&str) -> bool) -> Option<PathBuf> {
    let children = match sorted_children(dir) {
        Ok(children) => children,
        Err(e) => {
            tracing::debug!("Skipping unreadable directory {}: {}", dir.display(), e);
            return None;
        }
    };

    for (name, path) in children {
        if !accept(&name) || !is_real_dir(&path) {
            continue;
        }
        if encode(&path) == id {
            return Some(path);
        }
        if let Some(found) = search_dirs(id, &path, accept) {
            return Some(found);
        }
    }

    None
}

/// Find the immediate child of `parent` (file, directory or symlink) whose
/// identifier is `id`.
pub fn resolve_entry(id: &str, parent: &Path, accept: &dyn Fn(&str) -> bool) -> Option<PathBuf> {
    if !parent.is_dir() {
        return None;
    }

    sorted_children(parent)
        .ok()?
        .into_iter()
        .filter(|(name, _)| accept(name))
        .map(|(_, path)| path)
        .find(|path| encode(path) == id)
}

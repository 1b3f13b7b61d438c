// src/ops/mod.rs
//!
//! Mutating commands
//!
//! Every command follows the same order: resolve the identifiers, check
//! access, do the filesystem work, drop stale thumbnails, re-render the
//! affected listing. Validation and access failures return before anything
//! on disk changes. Batch commands record per-item failures in the request's
//! error map and finish with a summary error.

pub mod create;
pub mod duplicate;
pub mod edit;
pub mod paste;
pub mod remove;
pub mod rename;
pub mod unique_name;

#[cfg(test)]
mod tests;

use crate::access::{has_valid_chars, AccessKind};
use crate::codec;
use crate::connector::context::RequestContext;
use crate::connector::Connector;
use crate::error::ConnectorError;
use std::fs;
use std::path::{Path, PathBuf};

/// Names must be plain (no separators) and visible under the current options
pub(crate) fn validate_name(connector: &Connector, name: &str) -> Result<(), ConnectorError> {
    if has_valid_chars(name) && connector.access().is_name_accepted(name) {
        Ok(())
    } else {
        Err(ConnectorError::InvalidName)
    }
}

pub(crate) fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// The file `path` stands for: `path` itself, or the target of a symlink
/// that stays inside the root. Links leaving the root, or pointing at
/// nothing, are never followed.
pub(crate) fn resolve_contained(
    connector: &Connector,
    path: &Path,
) -> Result<PathBuf, ConnectorError> {
    let meta = fs::symlink_metadata(path).map_err(|_| ConnectorError::NotFound)?;
    if !meta.file_type().is_symlink() {
        return Ok(path.to_path_buf());
    }
    connector
        .catalog()
        .link_target(path)
        .ok_or(ConnectorError::AccessDenied)
}

/// Summary error for a batch where `failed` of `total` items did not go through
pub(crate) fn batch_summary(
    failed: usize,
    total: usize,
    all_failed: &'static str,
    some_failed: &'static str,
) -> Option<ConnectorError> {
    if failed == 0 {
        None
    } else if failed >= total {
        Some(ConnectorError::failed(all_failed))
    } else {
        Some(ConnectorError::failed(some_failed))
    }
}

/// Copy `src` (file, directory or symlink) to the not yet existing `dest`.
///
/// Needs read on `src` and write on the directory receiving `dest`.
/// A symlinked `src` is copied from its target, which must lie inside the
/// root. Directories are copied recursively with their modes; symlinks
/// inside them are recreated as links, never followed.
pub(crate) fn copy_entry(
    connector: &Connector,
    ctx: &mut RequestContext,
    src: &Path,
    dest: &Path,
) -> Result<(), ConnectorError> {
    let src = resolve_contained(connector, src)?;
    let src = src.as_path();
    let access = connector.access();
    if !access.is_allowed(src, AccessKind::Read, &mut ctx.errors) {
        return Err(ConnectorError::AccessDenied);
    }
    let dest_dir = dest.parent().ok_or(ConnectorError::InvalidParameters)?;
    if !access.is_allowed(dest_dir, AccessKind::Write, &mut ctx.errors) {
        return Err(ConnectorError::AccessDenied);
    }
    if exists(dest) {
        return Err(ConnectorError::AlreadyExists);
    }

    let meta = fs::symlink_metadata(src)?;
    if meta.is_dir() {
        copy_tree(src, dest).map_err(ConnectorError::io("Unable to copy files"))?;
    } else {
        // fs::copy carries the permission bits over
        fs::copy(src, dest).map_err(ConnectorError::io("Unable to copy files"))?;
    }

    tracing::debug!("Copied {} to {}", src.display(), dest.display());
    Ok(())
}

fn copy_tree(src: &Path, dest: &Path) -> std::io::Result<()> {
    fs::create_dir(dest)?;

    for (_, child) in codec::sorted_children(src)? {
        let Some(name) = child.file_name() else {
            continue;
        };
        let target = dest.join(name);
        let meta = fs::symlink_metadata(&child)?;

        if meta.file_type().is_symlink() {
            copy_link(&child, &target)?;
        } else if meta.is_dir() {
            copy_tree(&child, &target)?;
        } else {
            fs::copy(&child, &target)?;
        }
    }

    fs::set_permissions(dest, fs::metadata(src)?.permissions())
}

#[cfg(unix)]
fn copy_link(link: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(link)?, target)
}

#[cfg(not(unix))]
fn copy_link(link: &Path, _target: &Path) -> std::io::Result<()> {
    tracing::debug!("Skipping symlink {} while copying", link.display());
    Ok(())
}

/// Drop the thumbnails of `path`, and of everything below it for directories
pub(crate) fn invalidate_thumbnails(connector: &Connector, path: &Path) {
    let cache = connector.thumbnails();
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => cache.invalidate_tree(path),
        Ok(_) => cache.invalidate(path),
        Err(_) => {}
    }
}

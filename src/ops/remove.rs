// src/ops/remove.rs
//!
//! `rm`
//!
//! Targets are removed one at a time and a failure only affects its own
//! target. A directory is refused before anything is deleted if its subtree
//! holds entries hidden from the client.

use super::{batch_summary, invalidate_thumbnails};
use crate::access::AccessKind;
use crate::codec;
use crate::connector::context::RequestContext;
use crate::connector::Connector;
use crate::error::ConnectorError;
use std::fs;
use std::path::Path;

pub fn rm(
    connector: &Connector,
    ctx: &mut RequestContext,
    current: &str,
    targets: &[String],
) -> Result<(), ConnectorError> {
    let dir = connector
        .find_dir(current)
        .ok_or(ConnectorError::InvalidParameters)?;

    let mut failed = 0;
    for id in targets {
        let Some(path) = connector.find_entry(id, &dir) else {
            ctx.errors.record(Path::new(id), ConnectorError::NotFound);
            failed += 1;
            continue;
        };

        match remove_entry(connector, ctx, &path) {
            Ok(()) => tracing::info!("Removed {}", path.display()),
            Err(e) => {
                ctx.errors.record(&path, e);
                failed += 1;
            }
        }
    }

    connector.catalog().content(&dir, true, ctx);

    match batch_summary(
        failed,
        targets.len(),
        "Unable to remove files",
        "Some files were not removed",
    ) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn remove_entry(
    connector: &Connector,
    ctx: &mut RequestContext,
    path: &Path,
) -> Result<(), ConnectorError> {
    if !connector.access().is_allowed(path, AccessKind::Remove, &mut ctx.errors) {
        return Err(ConnectorError::AccessDenied);
    }

    let meta = fs::symlink_metadata(path)?;
    if !meta.is_dir() {
        invalidate_thumbnails(connector, path);
        return fs::remove_file(path).map_err(ConnectorError::io("Remove failed"));
    }

    if has_hidden_entries(connector, path) {
        return Err(ConnectorError::HiddenEntries);
    }
    remove_tree(connector, ctx, path)
}

/// Whether the subtree holds entries the client cannot see
fn has_hidden_entries(connector: &Connector, dir: &Path) -> bool {
    let Ok(children) = codec::sorted_children(dir) else {
        return false;
    };

    children.iter().any(|(name, path)| {
        !connector.access().is_name_accepted(name)
            || (fs::symlink_metadata(path).map(|m| m.is_dir()).unwrap_or(false)
                && has_hidden_entries(connector, path))
    })
}

/// Depth-first removal. Each entry is checked on its own; a child that
/// cannot be removed leaves its directory in place.
fn remove_tree(
    connector: &Connector,
    ctx: &mut RequestContext,
    dir: &Path,
) -> Result<(), ConnectorError> {
    for (_, child) in codec::sorted_children(dir)? {
        if !connector.access().is_allowed(&child, AccessKind::Remove, &mut ctx.errors) {
            ctx.errors.record(&child, ConnectorError::AccessDenied);
            continue;
        }

        let result = match fs::symlink_metadata(&child) {
            Ok(meta) if meta.is_dir() => remove_tree(connector, ctx, &child),
            Ok(_) => {
                invalidate_thumbnails(connector, &child);
                fs::remove_file(&child).map_err(ConnectorError::io("Remove failed"))
            }
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            ctx.errors.record(&child, e);
        }
    }

    fs::remove_dir(dir).map_err(ConnectorError::io("Remove failed"))
}

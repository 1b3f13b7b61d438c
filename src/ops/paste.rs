// src/ops/paste.rs
//!
//! `paste`: copy or move entries between directories
//!
//! All targets are resolved and checked against the containment guard
//! before the first one is touched. Moves stop at the first failure (entries
//! already moved stay moved). Copies carry on past a failed item.

use super::{copy_entry, exists, invalidate_thumbnails};
use crate::access::AccessKind;
use crate::connector::context::RequestContext;
use crate::connector::Connector;
use crate::error::ConnectorError;
use std::fs;
use std::path::{Path, PathBuf};

pub struct PasteRequest<'a> {
    pub current: &'a str,
    pub src: &'a str,
    pub dst: &'a str,
    pub targets: &'a [String],
    pub cut: bool,
}

pub fn paste(
    connector: &Connector,
    ctx: &mut RequestContext,
    request: PasteRequest<'_>,
) -> Result<(), ConnectorError> {
    let (Some(current), Some(src), Some(dst)) = (
        connector.find_dir(request.current),
        connector.find_dir(request.src),
        connector.find_dir(request.dst),
    ) else {
        return Err(ConnectorError::InvalidParameters);
    };

    let access = connector.access();
    let can_read = access.is_allowed(&src, AccessKind::Read, &mut ctx.errors);
    let can_write = access.is_allowed(&dst, AccessKind::Write, &mut ctx.errors);
    if !can_read || !can_write {
        return Err(ConnectorError::AccessDenied);
    }

    let mut entries = Vec::with_capacity(request.targets.len());
    for id in request.targets {
        let entry = connector
            .find_entry(id, &src)
            .ok_or(ConnectorError::NotFound)?;
        if dst.starts_with(&entry) {
            return Err(ConnectorError::CopyIntoItself);
        }
        entries.push(entry);
    }

    let result = if request.cut {
        move_all(connector, ctx, &entries, &dst)
    } else {
        copy_all(connector, ctx, &entries, &dst)
    };

    connector.catalog().content(&current, true, ctx);
    result
}

fn destination(entry: &Path, dst: &Path) -> Result<PathBuf, ConnectorError> {
    entry
        .file_name()
        .map(|name| dst.join(name))
        .ok_or(ConnectorError::InvalidParameters)
}

fn move_all(
    connector: &Connector,
    ctx: &mut RequestContext,
    entries: &[PathBuf],
    dst: &Path,
) -> Result<(), ConnectorError> {
    for entry in entries {
        if !connector.access().is_allowed(entry, AccessKind::Remove, &mut ctx.errors) {
            ctx.errors.record(entry, ConnectorError::AccessDenied);
            return Err(ConnectorError::failed("Move failed"));
        }

        let target = destination(entry, dst)?;
        if exists(&target) {
            ctx.errors.record(entry, ConnectorError::AlreadyExists);
            return Err(ConnectorError::failed("Unable to move files"));
        }

        invalidate_thumbnails(connector, entry);
        if let Err(e) = fs::rename(entry, &target) {
            tracing::warn!("Failed to move {}: {}", entry.display(), e);
            ctx.errors.record(entry, ConnectorError::io("Unable to move")(e));
            return Err(ConnectorError::failed("Unable to move files"));
        }
        tracing::info!("Moved {} to {}", entry.display(), target.display());
    }

    Ok(())
}

fn copy_all(
    connector: &Connector,
    ctx: &mut RequestContext,
    entries: &[PathBuf],
    dst: &Path,
) -> Result<(), ConnectorError> {
    let mut failed = false;

    for entry in entries {
        let result = destination(entry, dst).and_then(|target| copy_entry(connector, ctx, entry, &target));
        if let Err(e) = result {
            tracing::warn!("Failed to copy {}: {}", entry.display(), e);
            ctx.errors.record(entry, e);
            failed = true;
        }
    }

    if failed {
        Err(ConnectorError::failed("Unable to copy files"))
    } else {
        Ok(())
    }
}

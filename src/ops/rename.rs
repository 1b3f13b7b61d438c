// src/ops/rename.rs

use super::{exists, invalidate_thumbnails, validate_name};
use crate::access::AccessKind;
use crate::codec;
use crate::connector::context::RequestContext;
use crate::connector::Connector;
use crate::error::ConnectorError;
use std::fs;

/// Rename `target` inside `current` to `name`.
///
/// Needs write on the directory and rm on the entry. The renamed entry gets
/// a new identifier, which is returned in `select`.
pub fn rename(
    connector: &Connector,
    ctx: &mut RequestContext,
    current: &str,
    target: &str,
    name: &str,
) -> Result<(), ConnectorError> {
    let dir = connector.find_dir(current).ok_or(ConnectorError::NotFound)?;
    let entry = connector
        .find_entry(target, &dir)
        .ok_or(ConnectorError::NotFound)?;

    let access = connector.access();
    let can_write = access.is_allowed(&dir, AccessKind::Write, &mut ctx.errors);
    let can_remove = access.is_allowed(&entry, AccessKind::Remove, &mut ctx.errors);
    if !can_write || !can_remove {
        return Err(ConnectorError::AccessDenied);
    }

    validate_name(connector, name)?;
    let renamed = dir.join(name);
    if exists(&renamed) {
        return Err(ConnectorError::AlreadyExists);
    }

    invalidate_thumbnails(connector, &entry);
    fs::rename(&entry, &renamed).map_err(ConnectorError::io("Unable to rename file"))?;
    tracing::info!("Renamed {} to {}", entry.display(), renamed.display());

    ctx.select(codec::encode(&renamed));
    let is_dir = renamed.is_dir();
    connector.catalog().content(&dir, is_dir, ctx);
    Ok(())
}

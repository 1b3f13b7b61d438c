// src/ops/duplicate.rs

use super::copy_entry;
use super::unique_name::unique_name;
use crate::access::AccessKind;
use crate::codec;
use crate::connector::context::RequestContext;
use crate::connector::Connector;
use crate::error::ConnectorError;

/// Copy `target` next to itself under a fresh " copy" name
pub fn duplicate(
    connector: &Connector,
    ctx: &mut RequestContext,
    current: &str,
    target: &str,
) -> Result<(), ConnectorError> {
    let dir = connector
        .find_dir(current)
        .ok_or(ConnectorError::InvalidParameters)?;
    let entry = connector
        .find_entry(target, &dir)
        .ok_or(ConnectorError::InvalidParameters)?;

    let access = connector.access();
    let can_read = access.is_allowed(&entry, AccessKind::Read, &mut ctx.errors);
    let can_write = access.is_allowed(&dir, AccessKind::Write, &mut ctx.errors);
    if !can_read || !can_write {
        return Err(ConnectorError::AccessDenied);
    }

    let copy = unique_name(&entry)?;
    if let Err(e) = copy_entry(connector, ctx, &entry, &copy) {
        tracing::warn!("Failed to duplicate {}: {}", entry.display(), e);
        ctx.errors.record(&entry, e);
        return Err(ConnectorError::failed("Unable to create file copy"));
    }

    ctx.select(codec::encode(&copy));
    connector.catalog().content(&dir, true, ctx);
    Ok(())
}

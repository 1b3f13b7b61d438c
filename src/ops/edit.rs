// src/ops/edit.rs
//!
//! Text round trip for the client's built-in editor: `read` and `edit`

use super::resolve_contained;
use crate::access::AccessKind;
use crate::connector::context::RequestContext;
use crate::connector::Connector;
use crate::error::ConnectorError;
use std::fs;

pub fn read(
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
    let file = resolve_contained(connector, &entry)?;

    let access = connector.access();
    if !access.is_allowed(&dir, AccessKind::Read, &mut ctx.errors)
        || !access.is_allowed(&file, AccessKind::Read, &mut ctx.errors)
    {
        return Err(ConnectorError::AccessDenied);
    }

    let bytes = fs::read(&file).map_err(ConnectorError::io("Unable to read file"))?;
    ctx.response.content = Some(String::from_utf8_lossy(&bytes).into_owned());
    Ok(())
}

/// Overwrite `target` with `content` and return its fresh projection
pub fn edit(
    connector: &Connector,
    ctx: &mut RequestContext,
    current: &str,
    target: &str,
    content: &str,
) -> Result<(), ConnectorError> {
    let dir = connector
        .find_dir(current)
        .ok_or(ConnectorError::InvalidParameters)?;
    let entry = connector
        .find_entry(target, &dir)
        .ok_or(ConnectorError::InvalidParameters)?;
    let file = resolve_contained(connector, &entry)?;

    if !connector.access().is_allowed(&file, AccessKind::Write, &mut ctx.errors) {
        return Err(ConnectorError::AccessDenied);
    }

    connector.thumbnails().invalidate(&file);
    connector.thumbnails().invalidate(&entry);
    fs::write(&file, content).map_err(ConnectorError::io("Unable to write to file"))?;
    tracing::debug!("Wrote {} bytes to {}", content.len(), file.display());

    let info = connector.catalog().describe(&entry, ctx)?;
    ctx.response.target = Some(info);
    Ok(())
}

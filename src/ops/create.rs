// src/ops/create.rs
//!
//! `mkdir` and `mkfile`
//!
//! Both create exclusively: if something appears under the name between the
//! existence check and the create call, the OS refuses and the command fails.

use super::{exists, validate_name};
use crate::access::AccessKind;
use crate::codec;
use crate::connector::context::RequestContext;
use crate::connector::Connector;
use crate::error::ConnectorError;
use std::fs::{DirBuilder, OpenOptions};
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

/// Common checks; returns the directory and the new entry's path
fn prepare(
    connector: &Connector,
    ctx: &mut RequestContext,
    current: &str,
    name: &str,
) -> Result<(PathBuf, PathBuf), ConnectorError> {
    let dir = connector
        .find_dir(current)
        .ok_or(ConnectorError::InvalidParameters)?;
    if !connector.access().is_allowed(&dir, AccessKind::Write, &mut ctx.errors) {
        return Err(ConnectorError::AccessDenied);
    }

    validate_name(connector, name)?;
    let path = dir.join(name);
    if exists(&path) {
        return Err(ConnectorError::AlreadyExists);
    }

    Ok((dir, path))
}

pub fn mkdir(
    connector: &Connector,
    ctx: &mut RequestContext,
    current: &str,
    name: &str,
) -> Result<(), ConnectorError> {
    let (dir, path) = prepare(connector, ctx, current, name)?;

    let mut builder = DirBuilder::new();
    #[cfg(unix)]
    builder.mode(connector.options().dir_mode);
    builder
        .create(&path)
        .map_err(ConnectorError::io("Unable to create folder"))?;
    tracing::info!("Created directory {}", path.display());

    ctx.select(codec::encode(&path));
    connector.catalog().content(&dir, true, ctx);
    Ok(())
}

pub fn mkfile(
    connector: &Connector,
    ctx: &mut RequestContext,
    current: &str,
    name: &str,
) -> Result<(), ConnectorError> {
    let (dir, path) = prepare(connector, ctx, current, name)?;

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(connector.options().file_mode);
    options
        .open(&path)
        .map_err(ConnectorError::io("Unable to create file"))?;
    tracing::info!("Created file {}", path.display());

    ctx.select(codec::encode(&path));
    connector.catalog().content(&dir, false, ctx);
    Ok(())
}

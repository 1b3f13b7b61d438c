// src/upload/mod.rs
//!
//! Streaming uploads
//!
//! Files are streamed to disk in `uploadWriteChunk` sized pieces while a
//! running total is kept for the whole request. The file that pushes the
//! total past `uploadMaxSize` is deleted and ends the batch; files after it
//! are not looked at. The type filter runs on the stored file, so a rejected
//! upload is written and then removed again.


use crate::access::AccessKind;
use crate::codec;
use crate::connector::context::RequestContext;
use crate::connector::request::Upload;
use crate::connector::Connector;
use crate::error::ConnectorError;
use crate::ops::{batch_summary, validate_name};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

/// Result of streaming one payload
enum Written {
    Complete(u64),
    /// Stopped after the budget ran out
    OverBudget,
}

/// Final path component of a client-supplied name, for either separator style
pub fn sanitize_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

fn stream_to(path: &Path, reader: &mut dyn Read, chunk: usize, budget: u64) -> io::Result<Written> {
    let mut file = File::create(path)?;
    let mut buffer = vec![0u8; chunk.max(1)];
    let mut written: u64 = 0;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        written += n as u64;
        if written > budget {
            return Ok(Written::OverBudget);
        }
        file.write_all(&buffer[..n])?;
    }

    file.flush()?;
    Ok(Written::Complete(written))
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!("Failed to remove rejected upload {}: {}", path.display(), e);
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

pub fn upload(
    connector: &Connector,
    ctx: &mut RequestContext,
    current: &str,
    files: Vec<Upload>,
) -> Result<(), ConnectorError> {
    let dir = connector
        .find_dir(current)
        .ok_or(ConnectorError::InvalidParameters)?;
    if !connector.access().is_allowed(&dir, AccessKind::Write, &mut ctx.errors) {
        return Err(ConnectorError::AccessDenied);
    }
    if files.is_empty() {
        return Err(ConnectorError::NoFileToUpload);
    }

    let options = connector.options();
    let max_bytes = options.upload_max_bytes();
    let mut total: u64 = 0;
    let mut attempted = 0;
    let mut failed = 0;

    for mut upload in files {
        if upload.name.is_empty() {
            continue;
        }
        attempted += 1;

        let name = sanitize_name(&upload.name).to_string();
        if let Err(e) = validate_name(connector, &name) {
            ctx.errors.record(Path::new(&name), e);
            failed += 1;
            continue;
        }

        let path = dir.join(&name);
        let is_link = fs::symlink_metadata(&path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if is_link {
            tracing::warn!("Refusing to upload through symlink {}", path.display());
            ctx.errors.record(&path, ConnectorError::AccessDenied);
            failed += 1;
            continue;
        }
        connector.thumbnails().invalidate(&path);

        let budget = max_bytes.saturating_sub(total);
        match stream_to(&path, upload.reader.as_mut(), options.upload_write_chunk, budget) {
            Ok(Written::Complete(bytes)) => total += bytes,
            Ok(Written::OverBudget) => {
                tracing::warn!("Upload {} exceeds the {} byte limit", path.display(), max_bytes);
                discard(&path);
                ctx.errors.record(&path, ConnectorError::QuotaExceeded);
                failed += 1;
                break;
            }
            Err(e) => {
                tracing::warn!("Failed to save upload {}: {}", path.display(), e);
                if path.is_file() {
                    discard(&path);
                }
                ctx.errors
                    .record(&path, ConnectorError::io("Unable to save uploaded file")(e));
                failed += 1;
                continue;
            }
        }

        if !connector.access().upload_allowed(&name) {
            discard(&path);
            ctx.errors.record(&path, ConnectorError::NotAllowedType);
            failed += 1;
            continue;
        }

        if let Err(e) = apply_mode(&path, options.file_mode) {
            tracing::debug!("Failed to set mode on {}: {}", path.display(), e);
        }
        tracing::info!("Uploaded {}", path.display());
        ctx.select(codec::encode(&path));
    }

    connector.catalog().content(&dir, false, ctx);

    match batch_summary(
        failed,
        attempted,
        "Unable to upload files",
        "Some files were not uploaded",
    ) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

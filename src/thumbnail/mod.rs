// src/thumbnail/mod.rs
//!
//! Lazy thumbnail cache
//!
//! Thumbnails are square PNGs named `<id>.png` in one cache directory. They
//! are never generated while listing: listings only report whether one
//! exists, and the client asks for missing ones in small batches through the
//! `tmb` command. Whatever renames, moves, resizes or removes a source
//! image drops its thumbnail.

pub mod backend;

#[cfg(test)]
mod tests;

use crate::access::mime;
use crate::access::AccessKind;
use crate::codec;
use crate::config::{ConnectorOptions, ImageLibrary};
use crate::connector::context::RequestContext;
use crate::connector::Connector;
use crate::error::ConnectorError;
use crate::ops;
use backend::{DisabledBackend, ImageBackend, ImageBackendError, RasterBackend};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub struct ThumbnailCache {
    backend: Box<dyn ImageBackend>,
    dir: Option<PathBuf>,
    size: u32,
}

impl std::fmt::Debug for ThumbnailCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailCache")
            .field("available", &self.backend.is_available())
            .field("dir", &self.dir)
            .field("size", &self.size)
            .finish()
    }
}

impl ThumbnailCache {
    /// Cache as configured by `imgLib`, `tmbDir` and `tmbSize`
    pub fn new(options: &ConnectorOptions) -> Self {
        let backend: Box<dyn ImageBackend> = match options.img_lib {
            ImageLibrary::Auto => Box::new(RasterBackend),
            ImageLibrary::None => Box::new(DisabledBackend),
        };
        Self::with_backend(options, backend)
    }

    /// Cache over a caller-supplied backend. The cache directory is created
    /// here; if that fails, or it lies outside the root where no URL can
    /// reach it, thumbnails are switched off.
    pub fn with_backend(options: &ConnectorOptions, backend: Box<dyn ImageBackend>) -> Self {
        let dir = options.thumbnail_dir().and_then(|dir| {
            let escapes = dir.components().any(|c| matches!(c, Component::ParentDir));
            if escapes || !dir.starts_with(&options.root) {
                tracing::warn!(
                    "Thumbnails disabled, {} is outside the root",
                    dir.display()
                );
                return None;
            }
            if dir.is_dir() {
                return Some(dir);
            }
            match fs::create_dir_all(&dir) {
                Ok(()) => {
                    tracing::info!("Created thumbnail directory {}", dir.display());
                    Some(dir)
                }
                Err(e) => {
                    tracing::warn!(
                        "Thumbnails disabled, cannot create {}: {}",
                        dir.display(),
                        e
                    );
                    None
                }
            }
        });

        Self {
            backend,
            dir,
            size: options.tmb_size,
        }
    }

    pub fn backend(&self) -> &dyn ImageBackend {
        self.backend.as_ref()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// A backend is available and there is somewhere to put thumbnails
    pub fn is_enabled(&self) -> bool {
        self.backend.is_available() && self.dir.is_some()
    }

    /// Whether `path` is the kind of file a thumbnail can be made for
    pub fn can_thumbnail(&self, path: &Path) -> bool {
        self.is_enabled() && mime::is_image(&mime::mime_type(path))
    }

    /// Entries of the cache directory are their own thumbnails
    pub fn is_thumbnail(&self, path: &Path) -> bool {
        match (&self.dir, path.parent()) {
            (Some(dir), Some(parent)) => parent == dir,
            _ => false,
        }
    }

    /// Where the thumbnail of `path` lives, whether or not it exists yet
    pub fn cache_path(&self, path: &Path) -> Option<PathBuf> {
        if self.is_thumbnail(path) {
            return None;
        }
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.png", codec::encode(path))))
    }

    /// The existing thumbnail of `path`
    pub fn cached(&self, path: &Path) -> Option<PathBuf> {
        self.cache_path(path).filter(|tmb| tmb.is_file())
    }

    /// Thumbnail of `path`, generating it if missing.
    ///
    /// `Ok(None)` means `path` cannot have a thumbnail at all.
    pub fn ensure(&self, path: &Path) -> Result<Option<PathBuf>, ImageBackendError> {
        if !self.can_thumbnail(path) {
            return Ok(None);
        }
        let Some(tmb) = self.cache_path(path) else {
            return Ok(None);
        };
        if tmb.is_file() {
            return Ok(Some(tmb));
        }

        self.backend.crop_resize_save(path, &tmb, self.size)?;
        tracing::debug!("Generated thumbnail for {}", path.display());
        Ok(Some(tmb))
    }

    /// Drop the thumbnail of `path` if there is one
    pub fn invalidate(&self, path: &Path) {
        if let Some(tmb) = self.cached(path) {
            if let Err(e) = fs::remove_file(&tmb) {
                tracing::warn!("Failed to remove thumbnail {}: {}", tmb.display(), e);
            }
        }
    }

    /// Drop thumbnails of every file below `dir`
    pub fn invalidate_tree(&self, dir: &Path) {
        if self.dir.is_none() {
            return;
        }
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            match fs::symlink_metadata(&path) {
                Ok(meta) if meta.is_dir() => self.invalidate_tree(&path),
                Ok(_) => self.invalidate(&path),
                Err(_) => {}
            }
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// `tmb`: generate missing thumbnails for images in `current`, at most
/// `tmbAtOnce` per call (0 = all of them).
pub fn generate_batch(
    connector: &Connector,
    ctx: &mut RequestContext,
    current: &str,
) -> Result<(), ConnectorError> {
    let cache = connector.thumbnails();
    let Some(dir) = connector.find_dir(current) else {
        return Ok(());
    };
    if cache.dir() == Some(dir.as_path()) || !cache.is_enabled() {
        return Ok(());
    }

    let limit = match connector.options().tmb_at_once {
        0 => usize::MAX,
        n => n,
    };

    let mut pending = Vec::new();
    for (name, path) in codec::sorted_children(&dir)? {
        if !connector.access().is_name_accepted(&name)
            || !cache.can_thumbnail(&path)
            || cache.cached(&path).is_some()
        {
            continue;
        }
        let Ok(source) = ops::resolve_contained(connector, &path) else {
            continue;
        };
        if connector.access().is_allowed(&source, AccessKind::Read, &mut ctx.errors) {
            pending.push(path);
        }
    }

    let catalog = connector.catalog();
    let mut images = BTreeMap::new();
    for path in pending.iter().take(limit) {
        match cache.ensure(path) {
            Ok(Some(tmb)) => {
                if let Some(url) = catalog.url_for(&tmb) {
                    images.insert(codec::encode(path), url);
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Thumbnail failed for {}: {}", path.display(), e);
                ctx.debug(format!("tmbFailed_{}", path.display()), e.to_string());
            }
        }
    }

    ctx.response.current = Some(codec::encode(&dir));
    ctx.response.images = Some(images);
    if pending.len() > limit {
        ctx.mark_thumbnails_pending();
    }

    Ok(())
}

/// `resize`: scale an image in place to exactly `width`x`height`
pub fn resize(
    connector: &Connector,
    ctx: &mut RequestContext,
    current: &str,
    target: &str,
    width: u32,
    height: u32,
) -> Result<(), ConnectorError> {
    let dir = connector
        .find_dir(current)
        .ok_or(ConnectorError::InvalidParameters)?;
    let entry = connector
        .find_entry(target, &dir)
        .ok_or(ConnectorError::InvalidParameters)?;
    let file = ops::resolve_contained(connector, &entry)?;

    if !connector.access().is_allowed(&file, AccessKind::Write, &mut ctx.errors) {
        return Err(ConnectorError::AccessDenied);
    }
    if !mime::is_image(&mime::mime_type(&file)) {
        return Err(ConnectorError::InvalidParameters);
    }

    let cache = connector.thumbnails();
    if !cache.backend().is_available() {
        return Err(ConnectorError::UnsupportedOperation {
            reason: "image support is disabled".to_string(),
        });
    }

    ctx.debug("resize", format!("Resize {}: to {}x{}", file.display(), width, height));
    if let Err(e) = cache.backend().resize(&file, width, height) {
        tracing::warn!("Resize failed for {}: {}", file.display(), e);
        ctx.debug(format!("resizeFailed_{}", file.display()), e.to_string());
        return Err(ConnectorError::failed("Unable to resize image"));
    }
    cache.invalidate(&file);
    cache.invalidate(&entry);

    ctx.select(codec::encode(&entry));
    connector.catalog().content(&dir, true, ctx);
    Ok(())
}

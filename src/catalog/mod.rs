// src/catalog/mod.rs
//!
//! Directory listings
//!
//! Everything the client sees about an entry is computed here on demand:
//! projections of single entries, sorted directory contents, the navigation
//! tree and the current-directory header. Nothing is cached between
//! requests.

pub mod date;
pub mod types;


use crate::access::mime::{self, MIME_DIRECTORY, MIME_SYMLINK_BROKEN};
use crate::access::{AccessEvaluator, AccessKind};
use crate::codec;
use crate::config::ConnectorOptions;
use crate::connector::context::RequestContext;
use crate::error::ConnectorError;
use crate::thumbnail::ThumbnailCache;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fs;
use std::path::{Path, PathBuf};
use types::{CwdProjection, Projection, TreeNode};

/// Characters left alone when building file URLs, besides alphanumerics
const URL_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Read-only view over the configured tree, borrowed from a `Connector`
pub struct Catalog<'a> {
    options: &'a ConnectorOptions,
    access: &'a AccessEvaluator,
    thumbnails: &'a ThumbnailCache,
}

impl<'a> Catalog<'a> {
    pub fn new(
        options: &'a ConnectorOptions,
        access: &'a AccessEvaluator,
        thumbnails: &'a ThumbnailCache,
    ) -> Self {
        Self {
            options,
            access,
            thumbnails,
        }
    }

    fn root(&self) -> &Path {
        &self.options.root
    }

    /// Display name of the root: the alias, or the directory's own name
    fn root_name(&self) -> String {
        if self.options.root_alias.is_empty() {
            file_name(self.root())
        } else {
            self.options.root_alias.clone()
        }
    }

    /// "Home/docs/a.txt" style path for client display
    pub fn display_path(&self, path: &Path) -> String {
        let mut display = self.root_name();
        if let Ok(rel) = path.strip_prefix(self.root()) {
            for part in rel.components() {
                display.push('/');
                display.push_str(&part.as_os_str().to_string_lossy());
            }
        }
        display
    }

    /// Public URL of a path below the root, ignoring the `fileURL` switch
    pub fn url_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(self.root()).ok()?;
        let rel = rel
            .components()
            .map(|part| part.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");
        Some(format!(
            "{}/{}",
            self.options.base_url(),
            utf8_percent_encode(&rel, URL_PATH)
        ))
    }

    /// Resolve a symlink and keep it only if it lands inside the root
    pub fn link_target(&self, link: &Path) -> Option<PathBuf> {
        let raw = fs::read_link(link).ok()?;
        let joined = match link.parent() {
            Some(parent) if raw.is_relative() => parent.join(raw),
            _ => raw,
        };
        let target = joined.canonicalize().ok()?;
        if target.starts_with(self.root()) {
            Some(target)
        } else {
            tracing::debug!("Symlink {} points outside the root", link.display());
            None
        }
    }

    /// Recursive byte size of the files below `dir`. Symlinks are not followed.
    pub fn dir_size(&self, dir: &Path) -> u64 {
        if !self.options.dir_size {
            return fs::symlink_metadata(dir).map(|m| m.len()).unwrap_or(0);
        }
        tree_size(dir)
    }

    // ========================================================================
    // Single entries
    // ========================================================================

    pub fn describe(&self, path: &Path, ctx: &mut RequestContext) -> Result<Projection, ConnectorError> {
        let lstat = fs::symlink_metadata(path)?;
        let is_link = lstat.file_type().is_symlink();
        let stat = fs::metadata(path).unwrap_or_else(|_| lstat.clone());
        let mtime = stat.modified().or_else(|_| lstat.modified())?;

        let is_dir = !is_link && lstat.is_dir();
        let mut info = Projection {
            name: file_name(path),
            hash: codec::encode(path),
            mime: if is_dir {
                MIME_DIRECTORY.to_string()
            } else {
                mime::mime_type(path)
            },
            date: ctx.dates.render(mtime),
            size: if is_dir { self.dir_size(path) } else { stat.len() },
            read: self.access.is_allowed(path, AccessKind::Read, &mut ctx.errors),
            write: self.access.is_allowed(path, AccessKind::Write, &mut ctx.errors),
            rm: self.access.is_allowed(path, AccessKind::Remove, &mut ctx.errors),
            url: None,
            dim: None,
            resize: None,
            tmb: None,
            link: None,
            link_to: None,
            parent: None,
        };

        let target = if is_link {
            match self.link_target(path) {
                Some(target) => Some(target),
                None => {
                    info.mime = MIME_SYMLINK_BROKEN.to_string();
                    info.read = false;
                    info.write = false;
                    return Ok(info);
                }
            }
        } else {
            None
        };

        if let Some(target) = &target {
            if target.is_dir() {
                info.mime = MIME_DIRECTORY.to_string();
                info.size = self.dir_size(target);
            } else {
                info.mime = mime::mime_type(target);
                info.parent = target.parent().map(codec::encode);
            }
            info.link = Some(codec::encode(target));
            info.link_to = Some(self.display_path(target));
            info.read = info.read && self.access.is_allowed(target, AccessKind::Read, &mut ctx.errors);
            info.write = info.write && self.access.is_allowed(target, AccessKind::Write, &mut ctx.errors);
        }

        if info.is_directory() {
            return Ok(info);
        }

        let source = target.as_deref().unwrap_or(path);
        if self.options.file_url && info.read {
            info.url = self.url_for(source);
        }

        if mime::is_image(&info.mime) && self.thumbnails.is_enabled() {
            if let Ok((width, height)) = self.thumbnails.backend().measure(source) {
                info.dim = Some(format!("{}x{}", width, height));
                info.resize = Some(true);
            }

            if self.thumbnails.is_thumbnail(path) {
                info.tmb = self.url_for(path);
            } else if let Some(cached) = self.thumbnails.cached(path) {
                info.tmb = self.url_for(&cached);
            } else {
                ctx.mark_thumbnails_pending();
            }
        }

        Ok(info)
    }

    // ========================================================================
    // Listings
    // ========================================================================

    /// Visible entries of `dir`, directories first, each group in name order
    pub fn list_children(&self, dir: &Path, ctx: &mut RequestContext) -> Vec<Projection> {
        let children = match codec::sorted_children(dir) {
            Ok(children) => children,
            Err(e) => {
                tracing::warn!("Failed to list {}: {}", dir.display(), e);
                ctx.errors.record(dir, e.into());
                return Vec::new();
            }
        };

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for (name, path) in children {
            if !self.access.is_name_accepted(&name) {
                continue;
            }
            match self.describe(&path, ctx) {
                Ok(info) if info.is_directory() => dirs.push(info),
                Ok(info) => files.push(info),
                Err(e) => tracing::debug!("Skipping {}: {}", path.display(), e),
            }
        }

        dirs.extend(files);
        dirs
    }

    /// Navigation tree below `dir`. Unreadable directories keep an empty
    /// `dirs`; symlinked directories are left out.
    pub fn build_tree(&self, dir: &Path, ctx: &mut RequestContext) -> TreeNode {
        let name = if dir == self.root() {
            self.root_name()
        } else {
            file_name(dir)
        };
        let read = self.access.is_allowed(dir, AccessKind::Read, &mut ctx.errors);
        let write = self.access.is_allowed(dir, AccessKind::Write, &mut ctx.errors);

        let mut node = TreeNode {
            hash: codec::encode(dir),
            name,
            read,
            write,
            dirs: Vec::new(),
        };

        if !read {
            return node;
        }

        if let Ok(children) = codec::sorted_children(dir) {
            for (name, path) in children {
                if !self.access.is_name_accepted(&name) || !is_real_dir(&path) {
                    continue;
                }
                node.dirs.push(self.build_tree(&path, ctx));
            }
        }

        node
    }

    pub fn render_cwd(&self, dir: &Path, ctx: &mut RequestContext) -> CwdProjection {
        let is_root = dir == self.root();
        let date = fs::metadata(dir)
            .and_then(|m| m.modified())
            .map(|mtime| ctx.dates.render_absolute(mtime))
            .unwrap_or_default();

        CwdProjection {
            hash: codec::encode(dir),
            name: if is_root { self.root_name() } else { file_name(dir) },
            mime: MIME_DIRECTORY.to_string(),
            rel: self.display_path(dir),
            size: 0,
            date,
            read: true,
            write: self.access.is_allowed(dir, AccessKind::Write, &mut ctx.errors),
            rm: !is_root && self.access.is_allowed(dir, AccessKind::Remove, &mut ctx.errors),
        }
    }

    /// Fill `cwd` and `cdc` for `dir`, plus the whole tree when asked
    pub fn content(&self, dir: &Path, with_tree: bool, ctx: &mut RequestContext) {
        let cwd = self.render_cwd(dir, ctx);
        let cdc = self.list_children(dir, ctx);
        ctx.response.cwd = Some(cwd);
        ctx.response.cdc = Some(cdc);

        if with_tree {
            let tree = self.build_tree(self.root(), ctx);
            ctx.response.tree = Some(tree);
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

fn tree_size(dir: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    entries
        .flatten()
        .filter_map(|entry| {
            let meta = fs::symlink_metadata(entry.path()).ok()?;
            if meta.is_dir() {
                Some(tree_size(&entry.path()))
            } else if meta.is_file() {
                Some(meta.len())
            } else {
                None
            }
        })
        .sum()
}

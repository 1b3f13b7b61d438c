// src/connector/mod.rs
//!
//! Command dispatch
//!
//! `Connector::run` is the only entry point: it validates the root, parses
//! the command, runs its handler behind a panic boundary and assembles the
//! reply. A `Connector` holds nothing but read-only configuration and the
//! image backend, so it can be shared between threads.

pub mod context;
pub mod request;
pub mod response;


use crate::access::mime;
use crate::access::{AccessEvaluator, AccessKind};
use crate::catalog::Catalog;
use crate::codec;
use crate::config::{ConfigError, ConnectorOptions};
use crate::error::ConnectorError;
use crate::ops::paste::PasteRequest;
use crate::thumbnail::backend::ImageBackend;
use crate::thumbnail::ThumbnailCache;
use crate::{ops, thumbnail, upload};
use context::RequestContext;
use request::{Command, Request};
use response::{
    ClientParams, ConnectorReply, ReplyBody, CONTENT_TYPE_HTML, CONTENT_TYPE_JSON, HTTP_FORBIDDEN,
    HTTP_NOT_FOUND, HTTP_OK,
};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_CONTENT_DISPOSITION: &str = "Content-Disposition";
pub const HEADER_CONTENT_LOCATION: &str = "Content-Location";
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
pub const HEADER_TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";
pub const HEADER_CONNECTION: &str = "Connection";

#[derive(Debug)]
pub struct Connector {
    options: ConnectorOptions,
    access: AccessEvaluator,
    thumbnails: ThumbnailCache,
}

impl Connector {
    pub fn new(options: ConnectorOptions) -> Result<Self, ConfigError> {
        let options = Self::normalize(options);
        let thumbnails = ThumbnailCache::new(&options);
        Self::assemble(options, thumbnails)
    }

    /// Connector over a caller-supplied image backend
    pub fn with_image_backend(
        options: ConnectorOptions,
        backend: Box<dyn ImageBackend>,
    ) -> Result<Self, ConfigError> {
        let options = Self::normalize(options);
        let thumbnails = ThumbnailCache::with_backend(&options, backend);
        Self::assemble(options, thumbnails)
    }

    /// Canonical root, so hashes and symlink containment agree
    fn normalize(mut options: ConnectorOptions) -> ConnectorOptions {
        if !options.root.as_os_str().is_empty() {
            if let Ok(root) = options.root.canonicalize() {
                options.root = root;
            }
        }
        options
    }

    fn assemble(options: ConnectorOptions, thumbnails: ThumbnailCache) -> Result<Self, ConfigError> {
        let access = AccessEvaluator::new(&options)?;
        tracing::info!(
            "Connector ready at {} (thumbnails {})",
            options.root.display(),
            if thumbnails.is_enabled() { "on" } else { "off" }
        );
        Ok(Self {
            options,
            access,
            thumbnails,
        })
    }

    pub fn options(&self) -> &ConnectorOptions {
        &self.options
    }

    pub fn root(&self) -> &Path {
        &self.options.root
    }

    pub fn access(&self) -> &AccessEvaluator {
        &self.access
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(&self.options, &self.access, &self.thumbnails)
    }

    /// Directory with identifier `id`, searched from the root
    pub fn find_dir(&self, id: &str) -> Option<PathBuf> {
        codec::resolve_dir(id, self.root(), &|name| self.access.is_name_accepted(name))
    }

    /// Immediate child of `parent` with identifier `id`
    pub fn find_entry(&self, id: &str, parent: &Path) -> Option<PathBuf> {
        codec::resolve_entry(id, parent, &|name| self.access.is_name_accepted(name))
    }

    fn check_root(&self, ctx: &mut RequestContext) -> Result<(), ConnectorError> {
        let root = self.root();
        if root.as_os_str().is_empty() || !root.is_dir() {
            tracing::error!("Root {} is missing", root.display());
            return Err(ConnectorError::InvalidConfiguration);
        }
        if !self.access.is_allowed(root, AccessKind::Read, &mut ctx.errors) {
            return Err(ConnectorError::RootAccessDenied {
                root: root.display().to_string(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Entry point
    // ========================================================================

    /// Handle one request
    pub fn run(&self, request: Request) -> ConnectorReply {
        let Request { params, uploads } = request;
        let mut ctx = RequestContext::new(params, self.options.debug);
        let mut headers = BTreeMap::new();

        if let Err(e) = self.check_root(&mut ctx) {
            ctx.fail(&e);
            return json_reply(HTTP_OK, headers, ctx);
        }

        let command = match Command::parse(&ctx.params, uploads, &self.options.disabled) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!("Rejected request {:?}: {}", ctx.params.cmd, e);
                ctx.fail(&e);
                return json_reply(HTTP_OK, headers, ctx);
            }
        };

        match &command {
            Command::OpenFile { current, target } => {
                return self.serve_file(&mut ctx, current, target.as_deref());
            }
            Command::Upload { .. } => {
                headers.insert(HEADER_CONTENT_TYPE.to_string(), CONTENT_TYPE_HTML.to_string());
            }
            Command::Ping => {
                headers.insert(HEADER_CONNECTION.to_string(), "close".to_string());
            }
            _ => {}
        }

        let name = command.name();
        tracing::debug!("Running {}", name);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(command, &mut ctx)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!("{} failed: {}", name, e);
                ctx.fail(&e);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("{} panicked: {}", name, message);
                ctx.debug("exception", message);
            }
        }

        if ctx.params.init {
            ctx.response.disabled = Some(self.options.disabled.clone());
            ctx.response.params = Some(ClientParams {
                dot_files: self.options.dot_files,
                upl_max_size: format!("{}M", self.options.upload_max_size),
                url: if self.options.file_url {
                    self.options.base_url().to_string()
                } else {
                    String::new()
                },
            });
        }

        json_reply(HTTP_OK, headers, ctx)
    }

    fn dispatch(&self, command: Command, ctx: &mut RequestContext) -> Result<(), ConnectorError> {
        match command {
            Command::OpenDir { target, tree } => self.open_dir(ctx, target.as_deref(), tree),
            // Answered before dispatch
            Command::OpenFile { .. } => Ok(()),
            Command::Rename {
                current,
                target,
                name,
            } => ops::rename::rename(self, ctx, &current, &target, &name),
            Command::Mkdir { current, name } => ops::create::mkdir(self, ctx, &current, &name),
            Command::Mkfile { current, name } => ops::create::mkfile(self, ctx, &current, &name),
            Command::Rm { current, targets } => ops::remove::rm(self, ctx, &current, &targets),
            Command::Paste {
                current,
                src,
                dst,
                targets,
                cut,
            } => ops::paste::paste(
                self,
                ctx,
                PasteRequest {
                    current: &current,
                    src: &src,
                    dst: &dst,
                    targets: &targets,
                    cut,
                },
            ),
            Command::Upload { current, files } => upload::upload(self, ctx, &current, files),
            Command::Duplicate { current, target } => {
                ops::duplicate::duplicate(self, ctx, &current, &target)
            }
            Command::Resize {
                current,
                target,
                width,
                height,
            } => thumbnail::resize(self, ctx, &current, &target, width, height),
            Command::Thumbnails { current } => thumbnail::generate_batch(self, ctx, &current),
            Command::Read { current, target } => ops::edit::read(self, ctx, &current, &target),
            Command::Edit {
                current,
                target,
                content,
            } => ops::edit::edit(self, ctx, &current, &target, &content),
            Command::Ping => Ok(()),
        }
    }

    /// `open` without `current`: list `target`, or the root when it is
    /// missing. An unusable target still lists the root.
    fn open_dir(
        &self,
        ctx: &mut RequestContext,
        target: Option<&str>,
        tree: bool,
    ) -> Result<(), ConnectorError> {
        let root = self.root().to_path_buf();
        let (dir, outcome) = match target {
            None => (root, Ok(())),
            Some(id) => match self.find_dir(id) {
                None => (root, Err(ConnectorError::InvalidParameters)),
                Some(dir) if !self.access.is_allowed(&dir, AccessKind::Read, &mut ctx.errors) => {
                    (root, Err(ConnectorError::AccessDenied))
                }
                Some(dir) => (dir, Ok(())),
            },
        };

        self.catalog().content(&dir, tree, ctx);
        outcome
    }

    // ========================================================================
    // File serving
    // ========================================================================

    fn serve_file(&self, ctx: &mut RequestContext, current: &str, target: Option<&str>) -> ConnectorReply {
        match self.open_file(ctx, current, target) {
            Ok((path, file, length)) => {
                let mime = mime::mime_type(&path);
                let disposition = if mime.starts_with("image") || mime.starts_with("text") {
                    "inline"
                } else {
                    "attachment"
                };
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let location = path
                    .strip_prefix(self.root())
                    .map(|rel| format!("/{}", rel.to_string_lossy()))
                    .unwrap_or_default();

                let mut headers = BTreeMap::new();
                headers.insert(HEADER_CONTENT_TYPE.to_string(), mime);
                headers.insert(
                    HEADER_CONTENT_DISPOSITION.to_string(),
                    format!("{}; filename={}", disposition, name),
                );
                headers.insert(HEADER_CONTENT_LOCATION.to_string(), location);
                headers.insert(HEADER_CONTENT_LENGTH.to_string(), length.to_string());
                headers.insert(HEADER_TRANSFER_ENCODING.to_string(), "binary".to_string());
                headers.insert(HEADER_CONNECTION.to_string(), "close".to_string());

                ConnectorReply {
                    status: HTTP_OK,
                    headers,
                    body: ReplyBody::File(file),
                }
            }
            Err(e) => {
                let status = match e {
                    ConnectorError::AccessDenied => HTTP_FORBIDDEN,
                    _ => HTTP_NOT_FOUND,
                };
                let mut headers = BTreeMap::new();
                headers.insert(HEADER_CONTENT_TYPE.to_string(), CONTENT_TYPE_HTML.to_string());
                ConnectorReply {
                    status,
                    headers,
                    body: ReplyBody::Text(e.to_string()),
                }
            }
        }
    }

    fn open_file(
        &self,
        ctx: &mut RequestContext,
        current: &str,
        target: Option<&str>,
    ) -> Result<(PathBuf, File, u64), ConnectorError> {
        let dir = self.find_dir(current).ok_or(ConnectorError::NotFound)?;
        let mut file = target
            .and_then(|id| self.find_entry(id, &dir))
            .ok_or(ConnectorError::NotFound)?;

        let is_link = fs::symlink_metadata(&file)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if is_link {
            file = self
                .catalog()
                .link_target(&file)
                .ok_or(ConnectorError::NotFound)?;
        }
        if file.is_dir() {
            return Err(ConnectorError::NotFound);
        }

        let parent = file.parent().unwrap_or(&dir).to_path_buf();
        if !self.access.is_allowed(&parent, AccessKind::Read, &mut ctx.errors)
            || !self.access.is_allowed(&file, AccessKind::Read, &mut ctx.errors)
        {
            return Err(ConnectorError::AccessDenied);
        }

        let handle = File::open(&file)?;
        let length = handle.metadata()?.len();
        tracing::debug!("Serving {}", file.display());
        Ok((file, handle, length))
    }
}

fn json_reply(status: u16, mut headers: BTreeMap<String, String>, ctx: RequestContext) -> ConnectorReply {
    headers
        .entry(HEADER_CONTENT_TYPE.to_string())
        .or_insert_with(|| CONTENT_TYPE_JSON.to_string());
    ConnectorReply {
        status,
        headers,
        body: ReplyBody::Document(ctx.finish()),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// src/config/mod.rs
//!
//! Connector configuration
//!
//! Options are process-wide and read-only once a `Connector` is built.
//! Keys use the camelCase names the file-manager client already knows
//! (`rootAlias`, `dotFiles`, `tmbAtOnce`, ...), so an options file written
//! for an older connector deserializes unchanged.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;


#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read options file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid options: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },

    #[error("Invalid permission pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Configured default for each access kind
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessDefaults {
    pub read: bool,
    pub write: bool,
    pub rm: bool,
}

impl Default for AccessDefaults {
    fn default() -> Self {
        Self {
            read: true,
            write: true,
            rm: true,
        }
    }
}

/// Per-path override of the access defaults.
///
/// `pattern` is a regular expression matched against the root-relative
/// path (always starting with `/`, the root itself is `/`). Later rules win.
#[derive(Debug, Clone, Deserialize)]
pub struct PermRule {
    pub pattern: String,
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub write: Option<bool>,
    #[serde(default)]
    pub rm: Option<bool>,
}

/// Evaluation order of the upload allow/deny lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub enum UploadOrder {
    #[default]
    DenyAllow,
    AllowDeny,
}

impl TryFrom<Vec<String>> for UploadOrder {
    type Error = String;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        match value.first().map(|s| s.as_str()) {
            Some("deny") => Ok(UploadOrder::DenyAllow),
            Some("allow") => Ok(UploadOrder::AllowDeny),
            other => Err(format!(
                "uploadOrder must start with \"deny\" or \"allow\", got {other:?}"
            )),
        }
    }
}

/// Which image library backs thumbnails and resizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageLibrary {
    #[default]
    Auto,
    None,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectorOptions {
    /// Public URL under which `root` is served (no trailing slash needed)
    #[serde(rename = "URL", alias = "url")]
    pub url: String,
    /// Absolute path of the addressable tree
    pub root: PathBuf,
    /// Display name of the root in listings (default: "Home")
    pub root_alias: String,
    pub defaults: AccessDefaults,
    pub perms: Vec<PermRule>,
    /// Command names removed from the dispatch table
    pub disabled: Vec<String>,
    /// Emit the `debug` map in responses
    pub debug: bool,
    /// Show and accept dot-prefixed names
    pub dot_files: bool,
    /// Report recursive sizes for directories (expensive on large trees)
    pub dir_size: bool,
    /// Include a public `url` for readable files
    #[serde(rename = "fileURL", alias = "fileUrl")]
    pub file_url: bool,
    pub img_lib: ImageLibrary,
    /// Thumbnail directory, relative to `root` unless absolute. `None` disables thumbnails.
    pub tmb_dir: Option<PathBuf>,
    /// Thumbnails generated per `tmb` call (default: 5, 0 = no limit)
    pub tmb_at_once: usize,
    /// Edge length of the square thumbnails in pixels (default: 48)
    pub tmb_size: u32,
    /// Upload budget per request in MiB (default: 256)
    pub upload_max_size: u64,
    /// Chunk size for streaming uploads to disk (default: 8192)
    pub upload_write_chunk: usize,
    /// Mime prefixes (or "all") accepted for upload
    pub upload_allow: Vec<String>,
    /// Mime prefixes (or "all") rejected for upload
    pub upload_deny: Vec<String>,
    pub upload_order: UploadOrder,
    /// Mode of created and uploaded files (default: 0o644)
    pub file_mode: u32,
    /// Mode of created directories (default: 0o755)
    pub dir_mode: u32,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            root: PathBuf::new(),
            root_alias: "Home".to_string(),
            defaults: AccessDefaults::default(),
            perms: Vec::new(),
            disabled: Vec::new(),
            debug: false,
            dot_files: false,
            dir_size: true,
            file_url: true,
            img_lib: ImageLibrary::Auto,
            tmb_dir: Some(PathBuf::from(".tmb")),
            tmb_at_once: 5,
            tmb_size: 48,
            upload_max_size: 256,
            upload_write_chunk: 8192,
            upload_allow: Vec::new(),
            upload_deny: Vec::new(),
            upload_order: UploadOrder::DenyAllow,
            file_mode: 0o644,
            dir_mode: 0o755,
        }
    }
}

impl ConnectorOptions {
    /// Options for `root` with every other setting at its default
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Upload budget in bytes
    pub fn upload_max_bytes(&self) -> u64 {
        self.upload_max_size.saturating_mul(1024 * 1024)
    }

    /// Public base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Absolute thumbnail directory, if thumbnails are configured
    pub fn thumbnail_dir(&self) -> Option<PathBuf> {
        self.tmb_dir
            .as_ref()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| self.root.join(dir))
    }

    pub fn is_disabled(&self, command: &str) -> bool {
        self.disabled.iter().any(|c| c == command)
    }
}

// src/access/mod.rs
//!
//! Access evaluation
//!
//! A path is readable, writable or removable only if BOTH the operating
//! system allows it and the configured policy allows it. The configured
//! policy is the per-kind default, overridden by the last matching
//! per-path rule. Removal is a property of the parent directory.
//!
//! Also home to the two name-based checks: which entry names are visible
//! at all, and which uploads are accepted.

pub mod mime;


use crate::config::{AccessDefaults, ConfigError, ConnectorOptions, UploadOrder};
use crate::connector::context::ErrorAccumulator;
use crate::error::ConnectorError;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Wildcard accepted in the upload allow/deny lists
const UPLOAD_ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
    Remove,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessKind::Read => "read",
            AccessKind::Write => "write",
            AccessKind::Remove => "rm",
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: Regex,
    read: Option<bool>,
    write: Option<bool>,
    rm: Option<bool>,
}

impl CompiledRule {
    fn value(&self, kind: AccessKind) -> Option<bool> {
        match kind {
            AccessKind::Read => self.read,
            AccessKind::Write => self.write,
            AccessKind::Remove => self.rm,
        }
    }
}

/// Combines OS permissions with the configured policy
#[derive(Debug, Clone)]
pub struct AccessEvaluator {
    root: PathBuf,
    defaults: AccessDefaults,
    rules: Vec<CompiledRule>,
    dot_files: bool,
    upload_allow: Vec<String>,
    upload_deny: Vec<String>,
    upload_order: UploadOrder,
}

impl AccessEvaluator {
    pub fn new(options: &ConnectorOptions) -> Result<Self, ConfigError> {
        let rules = options
            .perms
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|pattern| CompiledRule {
                        pattern,
                        read: rule.read,
                        write: rule.write,
                        rm: rule.rm,
                    })
                    .map_err(|source| ConfigError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root: options.root.clone(),
            defaults: options.defaults.clone(),
            rules,
            dot_files: options.dot_files,
            upload_allow: options.upload_allow.clone(),
            upload_deny: options.upload_deny.clone(),
            upload_order: options.upload_order,
        })
    }

    /// Effective permission of `kind` on `path`.
    ///
    /// Missing paths are never allowed. Broken symlinks can still be
    /// removed, nothing else. OS refusals are recorded in `errors` under
    /// the path.
    pub fn is_allowed(&self, path: &Path, kind: AccessKind, errors: &mut ErrorAccumulator) -> bool {
        let exists = match kind {
            AccessKind::Remove => path.symlink_metadata().is_ok(),
            _ => path.exists(),
        };
        if !exists {
            return false;
        }

        let os_allowed = match kind {
            AccessKind::Read => os::readable(path),
            AccessKind::Write => os::writable(path),
            AccessKind::Remove => path.parent().map(os::writable).unwrap_or(false),
        };

        if !os_allowed {
            tracing::debug!("OS denied {} on {}", kind.as_str(), path.display());
            errors.record(path, ConnectorError::AccessDenied);
            return false;
        }

        self.configured(path, kind)
    }

    /// Configured policy for `path`, ignoring the OS
    pub fn configured(&self, path: &Path, kind: AccessKind) -> bool {
        let relative = self.relative(path);
        self.rules
            .iter()
            .filter(|rule| rule.pattern.is_match(&relative))
            .filter_map(|rule| rule.value(kind))
            .last()
            .unwrap_or(match kind {
                AccessKind::Read => self.defaults.read,
                AccessKind::Write => self.defaults.write,
                AccessKind::Remove => self.defaults.rm,
            })
    }

    fn relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) => format!("/{}", rel.to_string_lossy()),
            Err(_) => path.to_string_lossy().to_string(),
        }
    }

    /// Whether an entry with this name is visible and addressable
    pub fn is_name_accepted(&self, name: &str) -> bool {
        if name.is_empty() || name == "." || name == ".." {
            return false;
        }
        if name.starts_with('.') && !self.dot_files {
            return false;
        }
        true
    }

    /// Upload filter over the allow/deny mime lists.
    ///
    /// deny,allow: an allow match wins, else a deny match rejects, else accept.
    /// allow,deny: a deny match rejects, else an allow match accepts, else reject.
    pub fn upload_allowed(&self, name: &str) -> bool {
        let mime = mime::mime_type(Path::new(name));
        let allow = list_matches(&self.upload_allow, &mime);
        let deny = list_matches(&self.upload_deny, &mime);

        match self.upload_order {
            UploadOrder::DenyAllow => allow || !deny,
            UploadOrder::AllowDeny => !deny && allow,
        }
    }
}

fn list_matches(list: &[String], mime: &str) -> bool {
    list.iter()
        .any(|entry| entry == UPLOAD_ALL || mime.starts_with(entry.as_str()))
}

/// Entry names may not contain path separators or drive delimiters
pub fn has_valid_chars(name: &str) -> bool {
    !name.contains(['/', '\\', ':', '<', '>'])
}

#[cfg(unix)]
mod os {
    use rustix::fs::Access;
    use std::path::Path;

    pub fn readable(path: &Path) -> bool {
        rustix::fs::access(path, Access::READ_OK).is_ok()
    }

    pub fn writable(path: &Path) -> bool {
        rustix::fs::access(path, Access::WRITE_OK).is_ok()
    }
}

#[cfg(not(unix))]
mod os {
    use std::path::Path;

    pub fn readable(path: &Path) -> bool {
        std::fs::metadata(path).is_ok()
    }

    pub fn writable(path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|m| !m.permissions().readonly())
            .unwrap_or(false)
    }
}

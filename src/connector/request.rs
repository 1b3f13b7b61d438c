// src/connector/request.rs
//!
//! Inbound parameters and the command set
//!
//! The hosting layer hands over a flat parameter map (form fields or query
//! string) plus any uploaded payloads. `Command::parse` turns that into one
//! variant of a closed command set, each carrying only validated fields.

use crate::error::ConnectorError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::io::Read;

pub const CMD_OPEN: &str = "open";
pub const CMD_RENAME: &str = "rename";
pub const CMD_MKDIR: &str = "mkdir";
pub const CMD_MKFILE: &str = "mkfile";
pub const CMD_RM: &str = "rm";
pub const CMD_PASTE: &str = "paste";
pub const CMD_UPLOAD: &str = "upload";
pub const CMD_DUPLICATE: &str = "duplicate";
pub const CMD_RESIZE: &str = "resize";
pub const CMD_TMB: &str = "tmb";
pub const CMD_READ: &str = "read";
pub const CMD_EDIT: &str = "edit";
pub const CMD_PING: &str = "ping";

/// Recognised scalar parameters. Anything else in the inbound map is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestParams {
    pub cmd: Option<String>,
    pub target: Option<String>,
    #[serde(alias = "targets[]", deserialize_with = "one_or_many")]
    pub targets: Vec<String>,
    pub current: Option<String>,
    pub src: Option<String>,
    pub dst: Option<String>,
    pub name: Option<String>,
    pub content: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub width: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub height: Option<String>,
    /// Client bootstrap: add disabled commands and client params
    #[serde(deserialize_with = "flag")]
    pub init: bool,
    /// Add the full directory tree to the listing
    #[serde(deserialize_with = "flag")]
    pub tree: bool,
    /// `paste` moves instead of copying
    #[serde(deserialize_with = "flag")]
    pub cut: bool,
}

/// One uploaded file: the client-side name and a reader over its bytes
pub struct Upload {
    pub name: String,
    pub reader: Box<dyn Read + Send>,
}

impl Upload {
    pub fn new(name: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self {
            name: name.into(),
            reader: Box::new(reader),
        }
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Everything one call receives from the hosting layer
#[derive(Debug, Default)]
pub struct Request {
    pub params: RequestParams,
    pub uploads: Vec<Upload>,
}

impl Request {
    pub fn new(params: RequestParams) -> Self {
        Self {
            params,
            uploads: Vec::new(),
        }
    }

    /// Parameters from a JSON object such as `{"cmd": "open", "target": "…"}`
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn with_upload(mut self, upload: Upload) -> Self {
        self.uploads.push(upload);
        self
    }
}

/// Validated command with its parameters
#[derive(Debug)]
pub enum Command {
    /// List a directory (root when `target` is absent)
    OpenDir { target: Option<String>, tree: bool },
    /// Serve a file's bytes
    OpenFile { current: String, target: Option<String> },
    Rename { current: String, target: String, name: String },
    Mkdir { current: String, name: String },
    Mkfile { current: String, name: String },
    Rm { current: String, targets: Vec<String> },
    Paste {
        current: String,
        src: String,
        dst: String,
        targets: Vec<String>,
        cut: bool,
    },
    Upload { current: String, files: Vec<Upload> },
    Duplicate { current: String, target: String },
    Resize {
        current: String,
        target: String,
        width: u32,
        height: u32,
    },
    Thumbnails { current: String },
    Read { current: String, target: String },
    Edit { current: String, target: String, content: String },
    Ping,
}

fn required(value: &Option<String>) -> Result<String, ConnectorError> {
    value
        .as_ref()
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or(ConnectorError::InvalidParameters)
}

fn dimension(value: &Option<String>) -> Result<u32, ConnectorError> {
    value
        .as_deref()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v >= 1)
        .ok_or(ConnectorError::InvalidParameters)
}

impl Command {
    /// Build the command named by `params.cmd`.
    ///
    /// No command means `open`. Names in `disabled` are treated exactly
    /// like unknown names.
    pub fn parse(
        params: &RequestParams,
        uploads: Vec<Upload>,
        disabled: &[String],
    ) -> Result<Command, ConnectorError> {
        let name = match params.cmd.as_deref() {
            None | Some("") => CMD_OPEN,
            Some(name) => {
                if disabled.iter().any(|d| d == name) {
                    return Err(ConnectorError::UnknownCommand);
                }
                name
            }
        };

        let command = match name {
            CMD_OPEN => match &params.current {
                Some(current) if !current.is_empty() => Command::OpenFile {
                    current: current.clone(),
                    target: params.target.clone().filter(|t| !t.is_empty()),
                },
                _ => Command::OpenDir {
                    target: params.target.clone().filter(|t| !t.is_empty()),
                    tree: params.tree,
                },
            },
            CMD_RENAME => Command::Rename {
                current: required(&params.current)?,
                target: required(&params.target)?,
                name: required(&params.name)?,
            },
            CMD_MKDIR => Command::Mkdir {
                current: required(&params.current)?,
                name: required(&params.name)?,
            },
            CMD_MKFILE => Command::Mkfile {
                current: required(&params.current)?,
                name: required(&params.name)?,
            },
            CMD_RM => {
                if params.targets.is_empty() {
                    return Err(ConnectorError::InvalidParameters);
                }
                Command::Rm {
                    current: required(&params.current)?,
                    targets: params.targets.clone(),
                }
            }
            CMD_PASTE => {
                if params.targets.is_empty() {
                    return Err(ConnectorError::InvalidParameters);
                }
                Command::Paste {
                    current: required(&params.current)?,
                    src: required(&params.src)?,
                    dst: required(&params.dst)?,
                    targets: params.targets.clone(),
                    cut: params.cut,
                }
            }
            CMD_UPLOAD => Command::Upload {
                current: required(&params.current)?,
                files: uploads,
            },
            CMD_DUPLICATE => Command::Duplicate {
                current: required(&params.current)?,
                target: required(&params.target)?,
            },
            CMD_RESIZE => Command::Resize {
                current: required(&params.current)?,
                target: required(&params.target)?,
                width: dimension(&params.width)?,
                height: dimension(&params.height)?,
            },
            CMD_TMB => Command::Thumbnails {
                current: required(&params.current)?,
            },
            CMD_READ => Command::Read {
                current: required(&params.current)?,
                target: required(&params.target)?,
            },
            CMD_EDIT => Command::Edit {
                current: required(&params.current)?,
                target: required(&params.target)?,
                content: params
                    .content
                    .clone()
                    .ok_or(ConnectorError::InvalidParameters)?,
            },
            CMD_PING => Command::Ping,
            _ => return Err(ConnectorError::UnknownCommand),
        };

        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::OpenDir { .. } | Command::OpenFile { .. } => CMD_OPEN,
            Command::Rename { .. } => CMD_RENAME,
            Command::Mkdir { .. } => CMD_MKDIR,
            Command::Mkfile { .. } => CMD_MKFILE,
            Command::Rm { .. } => CMD_RM,
            Command::Paste { .. } => CMD_PASTE,
            Command::Upload { .. } => CMD_UPLOAD,
            Command::Duplicate { .. } => CMD_DUPLICATE,
            Command::Resize { .. } => CMD_RESIZE,
            Command::Thumbnails { .. } => CMD_TMB,
            Command::Read { .. } => CMD_READ,
            Command::Edit { .. } => CMD_EDIT,
            Command::Ping => CMD_PING,
        }
    }
}

// ============================================================================
// Lenient field decoding
// ============================================================================
//
// Form-encoded requests carry everything as strings, JSON callers send real
// types. Both shapes are accepted.

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
        OneOrMany::Null(()) => Vec::new(),
    })
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    })
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => !matches!(s.as_str(), "" | "0" | "false"),
        _ => true,
    })
}

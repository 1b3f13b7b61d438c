// src/error.rs
//!
//! Connector error types
//!
//! Every message here is user-facing: it ends up verbatim in the `error`
//! field of the response document or in the per-item error map.

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

/// Coarse error classes for callers that need to branch on the failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    InvalidParameters,
    NotFound,
    AccessDenied,
    NameConflict,
    UnsupportedOperation,
    IoFailure,
    QuotaExceeded,
}

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid parameters")]
    InvalidParameters,

    #[error("Unknown command")]
    UnknownCommand,

    #[error("No file to upload")]
    NoFileToUpload,

    #[error("Invalid backend configuration")]
    InvalidConfiguration,

    #[error("File not found")]
    NotFound,

    #[error("Access denied")]
    AccessDenied,

    #[error("Access denied to {root}")]
    RootAccessDenied { root: String },

    #[error("Invalid name")]
    InvalidName,

    #[error("File or folder with the same name already exists")]
    AlreadyExists,

    #[error("Unable to copy into itself")]
    CopyIntoItself,

    #[error("Not allowed file type")]
    NotAllowedType,

    #[error("Directory contains hidden entries")]
    HiddenEntries,

    #[error("File exceeds the maximum allowed filesize")]
    QuotaExceeded,

    #[error("Operation not supported: {reason}")]
    UnsupportedOperation { reason: String },

    /// A filesystem call failed; `message` is what the client sees.
    #[error("{message}")]
    Io {
        message: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Summary failure of a whole command (batch or otherwise) with no
    /// single underlying cause.
    #[error("{message}")]
    OperationFailed { message: &'static str },
}

impl ConnectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectorError::InvalidParameters
            | ConnectorError::UnknownCommand
            | ConnectorError::NoFileToUpload
            | ConnectorError::InvalidConfiguration => ErrorKind::InvalidParameters,
            ConnectorError::NotFound => ErrorKind::NotFound,
            ConnectorError::AccessDenied | ConnectorError::RootAccessDenied { .. } => {
                ErrorKind::AccessDenied
            }
            ConnectorError::InvalidName
            | ConnectorError::AlreadyExists
            | ConnectorError::CopyIntoItself
            | ConnectorError::NotAllowedType
            | ConnectorError::HiddenEntries => ErrorKind::NameConflict,
            ConnectorError::QuotaExceeded => ErrorKind::QuotaExceeded,
            ConnectorError::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            ConnectorError::Io { .. } | ConnectorError::OperationFailed { .. } => {
                ErrorKind::IoFailure
            }
        }
    }

    pub(crate) fn io(message: &'static str) -> impl FnOnce(std::io::Error) -> ConnectorError {
        move |source| ConnectorError::Io { message, source }
    }

    pub(crate) fn failed(message: &'static str) -> ConnectorError {
        ConnectorError::OperationFailed { message }
    }
}

impl From<std::io::Error> for ConnectorError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => ConnectorError::NotFound,
            std::io::ErrorKind::PermissionDenied => ConnectorError::AccessDenied,
            std::io::ErrorKind::AlreadyExists => ConnectorError::AlreadyExists,
            _ => ConnectorError::Io {
                message: "Filesystem operation failed",
                source: e,
            },
        }
    }
}

impl Serialize for ConnectorError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

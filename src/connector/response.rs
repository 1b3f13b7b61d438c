// src/connector/response.rs
//!
//! Outbound documents and transport metadata

use crate::catalog::types::{CwdProjection, Projection, TreeNode};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use ts_rs::TS;

pub const HTTP_OK: u16 = 200;
pub const HTTP_FORBIDDEN: u16 = 403;
pub const HTTP_NOT_FOUND: u16 = 404;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_HTML: &str = "text/html";

/// Bootstrap parameters sent when the client asks for `init`
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ClientParams {
    pub dot_files: bool,
    /// Upload limit, e.g. "256M"
    pub upl_max_size: String,
    /// Base URL of the files, empty when file URLs are disabled
    pub url: String,
}

/// The JSON document returned for every command except file serving
#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub cwd: Option<CwdProjection>,
    /// Entries of the current directory, directories first
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub cdc: Option<Vec<Projection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub tree: Option<TreeNode>,
    /// Identifiers to highlight after a mutation
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub select: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
    /// Identifier → thumbnail URL, from the `tmb` command
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub images: Option<BTreeMap<String, String>>,
    /// Directory the `images` belong to
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub current: Option<String>,
    /// More thumbnails can be generated with another `tmb` call
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub tmb: Option<bool>,
    /// Updated entry after `edit`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub target: Option<Projection>,
    /// File text for `read`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub debug: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub disabled: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub params: Option<ClientParams>,
}

/// What the hosting layer writes as the response body
#[derive(Debug)]
pub enum ReplyBody {
    Document(ResponseDocument),
    /// Plain message for failed file serving
    Text(String),
    /// File to stream back verbatim
    File(File),
}

/// Status, headers and body of one connector call
#[derive(Debug)]
pub struct ConnectorReply {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: ReplyBody,
}

impl ConnectorReply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    /// The JSON document, if this reply carries one
    pub fn document(&self) -> Option<&ResponseDocument> {
        match &self.body {
            ReplyBody::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn into_document(self) -> Option<ResponseDocument> {
        match self.body {
            ReplyBody::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

// src/catalog/types.rs

use serde::Serialize;
use ts_rs::TS;

// ============================================================================
// Entry projections
// ============================================================================

/// Client-facing description of one directory entry
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub name: String,
    pub hash: String,
    pub mime: String,
    pub date: String,
    /// Bytes; for directories the recursive sum of contained files
    #[ts(type = "number")]
    pub size: u64,
    pub read: bool,
    pub write: bool,
    pub rm: bool,
    /// Public URL of the file (or of the link target)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub url: Option<String>,
    /// Image dimensions as "WxH"
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub dim: Option<String>,
    /// The image can be resized in place
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub resize: Option<bool>,
    /// URL of a cached thumbnail
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub tmb: Option<String>,
    /// Identifier of the symlink target
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub link: Option<String>,
    /// Root-relative display path of the symlink target
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub link_to: Option<String>,
    /// Identifier of the directory holding a file symlink's target
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub parent: Option<String>,
}

impl Projection {
    pub fn is_directory(&self) -> bool {
        self.mime == crate::access::mime::MIME_DIRECTORY
    }
}

/// The current working directory
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CwdProjection {
    pub hash: String,
    pub name: String,
    pub mime: String,
    /// Path relative to the root, prefixed with the root's display name
    pub rel: String,
    #[ts(type = "number")]
    pub size: u64,
    pub date: String,
    pub read: bool,
    pub write: bool,
    pub rm: bool,
}

/// One directory of the navigation tree
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct TreeNode {
    pub hash: String,
    pub name: String,
    pub read: bool,
    pub write: bool,
    pub dirs: Vec<TreeNode>,
}

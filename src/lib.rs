// src/lib.rs
//!
//! Hash-addressed file-manager connector
//!
//! Exposes one directory tree to a remote file-manager client. The client
//! never sees real paths: every entry is addressed by an identifier derived
//! from its path, and every call is a single command (`open`, `rename`,
//! `rm`, `upload`, ...) answered with a JSON document or a file stream.
//!
//! ```no_run
//! use hashfs_connector::{Connector, ConnectorOptions, Request};
//!
//! let connector = Connector::new(ConnectorOptions::with_root("/srv/media")).unwrap();
//! let reply = connector.run(Request::from_json(r#"{"cmd": "open", "init": 1}"#).unwrap());
//! assert_eq!(reply.status, 200);
//! ```

pub mod access;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod connector;
pub mod error;
pub mod ops;
pub mod thumbnail;
pub mod upload;

pub use access::{AccessEvaluator, AccessKind};
pub use catalog::types::{CwdProjection, Projection, TreeNode};
pub use config::{ConfigError, ConnectorOptions};
pub use connector::request::{Command, Request, RequestParams, Upload};
pub use connector::response::{ClientParams, ConnectorReply, ReplyBody, ResponseDocument};
pub use connector::Connector;
pub use error::{ConnectorError, ErrorKind};
pub use thumbnail::backend::{DisabledBackend, ImageBackend, ImageBackendError, RasterBackend};

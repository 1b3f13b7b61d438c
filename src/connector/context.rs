// src/connector/context.rs
//!
//! Per-request state
//!
//! A `RequestContext` is built fresh for every call and dropped when the
//! reply is assembled. Nothing in here outlives one request.

use crate::catalog::date::DateBoundaries;
use crate::connector::request::RequestParams;
use crate::connector::response::ResponseDocument;
use crate::error::ConnectorError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

/// Per-item failures of the current request, keyed by path.
///
/// A later failure for the same path replaces the earlier one.
#[derive(Debug, Default)]
pub struct ErrorAccumulator {
    entries: BTreeMap<String, ConnectorError>,
}

impl ErrorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: &Path, error: ConnectorError) {
        tracing::debug!("{}: {}", path.display(), error);
        self.entries.insert(path.to_string_lossy().to_string(), error);
    }

    pub fn get(&self, path: &Path) -> Option<&ConnectorError> {
        self.entries.get(path.to_string_lossy().as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConnectorError)> {
        self.entries.iter().map(|(path, error)| (path.as_str(), error))
    }

    fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(path, error)| (path.clone(), Value::String(error.to_string())))
                .collect(),
        )
    }
}

pub struct RequestContext {
    pub params: RequestParams,
    pub response: ResponseDocument,
    pub errors: ErrorAccumulator,
    pub dates: DateBoundaries,
    debug_enabled: bool,
    debug: BTreeMap<String, Value>,
    started: Instant,
}

impl RequestContext {
    pub fn new(params: RequestParams, debug_enabled: bool) -> Self {
        Self {
            params,
            response: ResponseDocument::default(),
            errors: ErrorAccumulator::new(),
            dates: DateBoundaries::now(),
            debug_enabled,
            debug: BTreeMap::new(),
            started: Instant::now(),
        }
    }

    /// Add a diagnostic entry; dropped unless debug mode is on
    pub fn debug(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        if self.debug_enabled {
            self.debug.insert(key.into(), value.into());
        }
    }

    pub fn fail(&mut self, error: &ConnectorError) {
        self.response.error = Some(error.to_string());
    }

    pub fn select(&mut self, id: String) {
        self.response.select.get_or_insert_with(Vec::new).push(id);
    }

    /// Flag that some listed images still lack a cached thumbnail
    pub fn mark_thumbnails_pending(&mut self) {
        self.response.tmb = Some(true);
    }

    /// Final response document, with diagnostics attached in debug mode
    pub fn finish(mut self) -> ResponseDocument {
        if self.debug_enabled {
            if !self.errors.is_empty() {
                self.debug.insert("errorData".to_string(), self.errors.to_json());
            }
            self.debug.insert(
                "time".to_string(),
                Value::from(self.started.elapsed().as_secs_f64()),
            );
            self.response.debug = Some(self.debug);
        }
        self.response
    }
}

//! The immutable request descriptor and its parameter type.
//!
//! # Design
//! A descriptor is plain data: it describes one HTTP request (method, URI
//! parts, headers, media types, optional JSON payload) and performs no I/O
//! itself. All fields use owned types (`String`, `Vec`) so a descriptor can
//! be built once and handed around freely. Executing a descriptor never
//! mutates it: the same value can launch any number of independent
//! exchanges.
//!
//! Descriptor construction (fluent path/query/header building, collection
//! parameter expansion) belongs to the calling layer; this crate consumes
//! the finished value.

use crate::uri;

/// A key/value pair used for both query and header parameters.
///
/// Values are converted to their string form at construction, so by the
/// time a descriptor reaches the executor every parameter is already a
/// plain string pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

impl Param {
    pub fn new(key: impl Into<String>, value: impl ToString) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

/// The immutable description of one HTTP request.
///
/// - `paths` are concatenated in order with no inserted separator; callers
///   embed any required `/` in the fragments themselves.
/// - `query` holds already-expanded pairs; repeated keys are allowed and
///   emitted in vector order.
/// - Only the first entry of `produces` / `consumes` is sent (as `Accept` /
///   `Content-Type`); additional entries are kept but ignored.
/// - `payload` absent means no request body is written and no output stream
///   is opened.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    pub method: String,
    pub paths: Vec<String>,
    pub query: Vec<Param>,
    pub headers: Vec<Param>,
    pub produces: Vec<String>,
    pub consumes: Vec<String>,
    pub payload: Option<serde_json::Value>,
}

impl RequestDescriptor {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }

    /// The final request URI: concatenated path fragments plus the encoded
    /// query string. Composing twice yields identical strings.
    pub fn uri(&self) -> String {
        uri::compose(&self.paths, &self.query)
    }
}

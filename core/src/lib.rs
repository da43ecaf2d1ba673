//! Execution and decoding core for abstract HTTP request descriptors.
//!
//! # Overview
//! Takes an immutable [`RequestDescriptor`] (method, URI parts, headers,
//! media types, optional JSON payload), executes it against an injected
//! [`Transport`], and decodes the response body in one of three shapes:
//! fire-and-forget completion ([`RequestExecutor::call`]), a single decoded
//! value ([`RequestExecutor::fetch`]), or a lazily-pulled sequence over a
//! JSON array ([`RequestExecutor::stream`]).
//!
//! # Design
//! - The network lives behind the [`Transport`] port; this crate performs
//!   no I/O of its own beyond driving that port, so hosts pick the client
//!   library and tests inject doubles.
//! - Execution is cold and single-shot: a descriptor is inert data, each
//!   `execute` call is one fresh blocking exchange, and nothing is cached
//!   or shared between calls.
//! - The response body is a [`ScopedStream`], released exactly once on
//!   every path out: normal completion, decode failure, or early drop.
//! - Sequence decoding never buffers the whole body; memory is bounded by
//!   the largest single array element.

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod sequence;
pub mod transport;
pub mod uri;

pub use codec::DecodeShape;
pub use descriptor::{Param, RequestDescriptor};
pub use error::{Error, Result};
pub use executor::{RequestExecutor, ScopedStream};
pub use sequence::JsonSequence;
pub use transport::{BodyRead, Connection, Transport};

//! Response codec: the three decode shapes over a scoped stream.
//!
//! # Design
//! The shape is chosen by the call site, so dispatch is a typed API (one
//! function per shape, each returning its own result type) and the closed
//! [`DecodeShape`] enum names the shapes for instrumentation. The shared
//! JSON machinery is `serde_json`'s stateless entry points: nothing here
//! holds per-call state, so concurrent decodes never contend.

use std::io::Read;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::executor::ScopedStream;
use crate::sequence::JsonSequence;

/// Caller-selected interpretation of the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeShape {
    /// Body discarded; completion only.
    None,
    /// Body is one JSON value.
    Single,
    /// Body is a JSON array, decoded element-by-element.
    Sequence,
}

impl DecodeShape {
    pub fn as_str(self) -> &'static str {
        match self {
            DecodeShape::None => "none",
            DecodeShape::Single => "single",
            DecodeShape::Sequence => "sequence",
        }
    }
}

const DRAIN_CHUNK: usize = 8 * 1024;

/// Consume and discard the entire response body, then release the stream.
///
/// The drain is mandatory even though nobody wants the bytes: leaving them
/// unread can corrupt connection reuse on some transports. I/O errors
/// during the drain are swallowed, since no completion semantics depend on
/// that data; a failure of the release itself is reported as
/// [`Error::Close`].
pub fn decode_none(mut stream: ScopedStream) -> Result<()> {
    tracing::trace!(shape = DecodeShape::None.as_str(), "decoding response");
    let mut chunk = [0u8; DRAIN_CHUNK];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring read error while draining unwanted body");
                break;
            }
        }
    }
    stream.release()
}

/// Parse the response body as one JSON value of the target type.
///
/// Exactly one value is read; bytes after it are not inspected. On parse
/// failure the stream is dropped (and thereby released) and the failure
/// surfaces as [`Error::Parse`].
pub fn decode_single<T: DeserializeOwned>(mut stream: ScopedStream) -> Result<T> {
    tracing::trace!(shape = DecodeShape::Single.as_str(), "decoding response");
    let mut de = serde_json::Deserializer::from_reader(&mut stream);
    let value = T::deserialize(&mut de).map_err(Error::Parse)?;
    stream.release()?;
    Ok(value)
}

/// Expose the response body as a lazily-pulled sequence over a JSON array.
pub fn decode_sequence<T: DeserializeOwned>(stream: ScopedStream) -> Result<JsonSequence<T>> {
    tracing::trace!(shape = DecodeShape::Sequence.as_str(), "decoding response");
    JsonSequence::new(stream)
}

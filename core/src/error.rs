//! Error taxonomy for request execution and response decoding.
//!
//! # Design
//! Each variant maps to exactly one failure point in the execution/decode
//! pipeline, so callers can decide retry/fallback policy by matching on the
//! variant alone. Every variant with a low-level cause carries it as a
//! `source` rather than flattening it into a string, so the originating error
//! stays inspectable through the `std::error::Error` chain. Nothing is
//! retried internally.

use std::io;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by [`RequestExecutor`](crate::RequestExecutor) and the
/// response decoders.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Opening the transport connection failed.
    #[error("opening connection")]
    Connection(#[source] io::Error),

    /// Serializing or writing the request payload failed.
    #[error("writing request body")]
    Write(#[source] serde_json::Error),

    /// Obtaining the response stream or status code failed.
    #[error("reading response")]
    Read(#[source] io::Error),

    /// The response status code was outside the accepted set {200, 201, 204}.
    ///
    /// A read-phase rejection: the exchange completed but the status makes
    /// the response unusable. Redirects are not followed, so 3xx lands here
    /// too.
    #[error("unexpected response status {0}")]
    Status(u16),

    /// The response body was not valid JSON of the expected shape, or the
    /// array framing around a streamed element was malformed.
    #[error("parsing response body")]
    Parse(#[source] serde_json::Error),

    /// An element was requested from an already-exhausted sequence.
    #[error("sequence exhausted")]
    Exhausted,

    /// Releasing the response stream failed where the close was mandatory.
    ///
    /// Best-effort closes (drop paths) never produce this; they log and
    /// continue.
    #[error("closing response stream")]
    Close(#[source] io::Error),
}

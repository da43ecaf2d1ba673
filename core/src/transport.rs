//! The transport port: the networking capability this crate consumes but
//! never implements.
//!
//! # Design
//! These traits decouple the executor from any concrete HTTP client. The
//! host supplies a [`Transport`] (backed by `ureq`, `hyper`, a unix socket,
//! an in-memory double, ...) and the core drives it through the narrow
//! surface below: set method and headers, optionally write a body, then
//! perform the exchange and read status plus response stream. Connection
//! pooling, TLS, proxies, retries and timeouts all live behind this
//! boundary.
//!
//! The traits are object-safe on purpose: hosts that need runtime-swappable
//! backends can hand the executor a `Box<dyn Transport>`, while tests pass
//! a borrowed double.

use std::io::{self, Read, Write};

/// Produces one fresh connection per request.
///
/// `connect` must not perform the exchange yet; it hands back a mutable
/// handle the executor configures before driving it.
pub trait Transport {
    fn connect(&self, uri: &str) -> io::Result<Box<dyn Connection>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn connect(&self, uri: &str) -> io::Result<Box<dyn Connection>> {
        (**self).connect(uri)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&self, uri: &str) -> io::Result<Box<dyn Connection>> {
        (**self).connect(uri)
    }
}

/// A single request/response exchange in the making.
///
/// The executor calls the setters first, writes the body through
/// [`request_body`](Connection::request_body) when a payload exists, and
/// finally consumes the handle via
/// [`into_response`](Connection::into_response), which performs the
/// blocking exchange.
pub trait Connection {
    /// Set the request method, verbatim.
    fn set_method(&mut self, method: &str);

    /// Set one request header. Called once per header; later calls with the
    /// same name follow the underlying client's semantics.
    fn set_header(&mut self, name: &str, value: &str);

    /// Open the request body sink. Only called when a payload exists; the
    /// executor drops the writer before reading the response.
    fn request_body(&mut self) -> io::Result<Box<dyn Write + '_>>;

    /// Perform the exchange and yield the status code and response body
    /// stream.
    fn into_response(self: Box<Self>) -> io::Result<(u16, Box<dyn BodyRead>)>;
}

/// A readable response body with an explicit close.
///
/// `close` is called at most once, by the scoped stream that owns the
/// body. Implementations that release resources on drop can keep the
/// default no-op.
pub trait BodyRead: Read {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

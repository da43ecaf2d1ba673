//! Request execution and the scoped response stream.
//!
//! # Design
//! [`RequestExecutor`] orchestrates one request/response cycle on top of the
//! transport port. Execution is cold: nothing touches the network until
//! `execute` (or one of the typed decode fronts) is called, and every call
//! performs one fresh exchange, with no caching and no de-duplication. The
//! descriptor is read-only throughout, so concurrent executions of the same
//! descriptor are independent.
//!
//! The response body comes back as a [`ScopedStream`]: an RAII guard that
//! guarantees the transport stream is released exactly once, whether the
//! consumer finishes normally, fails mid-decode, or is dropped early.

use std::io::{self, Read, Write};

use serde::de::DeserializeOwned;
use serde::ser::Error as _;

use crate::codec;
use crate::descriptor::RequestDescriptor;
use crate::error::{Error, Result};
use crate::sequence::JsonSequence;
use crate::transport::{BodyRead, Connection, Transport};

/// Status codes accepted as success. Anything else, including 3xx, fails
/// the exchange with [`Error::Status`].
const ACCEPTED_STATUS: [u16; 3] = [200, 201, 204];

/// Executes request descriptors against an injected transport.
pub struct RequestExecutor<T: Transport> {
    transport: T,
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Perform one fresh exchange and yield the response body as a
    /// [`ScopedStream`].
    ///
    /// Steps, each with its own error kind: connect
    /// ([`Error::Connection`]), configure method and headers, write the
    /// payload if present ([`Error::Write`]), obtain status and stream
    /// ([`Error::Read`]), validate the status ([`Error::Status`]).
    pub fn execute(&self, descriptor: &RequestDescriptor) -> Result<ScopedStream> {
        let uri = descriptor.uri();
        tracing::debug!(method = %descriptor.method, %uri, "executing request");

        let mut conn = self.transport.connect(&uri).map_err(Error::Connection)?;

        conn.set_method(&descriptor.method);
        if let Some(accept) = descriptor.produces.first() {
            conn.set_header("Accept", accept);
        }
        if let Some(content_type) = descriptor.consumes.first() {
            conn.set_header("Content-Type", content_type);
        }
        for h in &descriptor.headers {
            conn.set_header(&h.key, &h.value);
        }

        if let Some(payload) = &descriptor.payload {
            write_payload(conn.as_mut(), payload)?;
        }

        let (status, body) = conn.into_response().map_err(Error::Read)?;
        let stream = ScopedStream::new(body);
        if !ACCEPTED_STATUS.contains(&status) {
            tracing::debug!(status, "response status rejected");
            return Err(Error::Status(status));
        }
        tracing::debug!(status, "response status accepted");
        Ok(stream)
    }

    /// Execute and discard the response body (fully drained first).
    pub fn call(&self, descriptor: &RequestDescriptor) -> Result<()> {
        codec::decode_none(self.execute(descriptor)?)
    }

    /// Execute and decode the response body as a single JSON value.
    pub fn fetch<V: DeserializeOwned>(&self, descriptor: &RequestDescriptor) -> Result<V> {
        codec::decode_single(self.execute(descriptor)?)
    }

    /// Execute and decode the response body as a lazily-pulled sequence
    /// over a JSON array.
    pub fn stream<V: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<JsonSequence<V>> {
        codec::decode_sequence(self.execute(descriptor)?)
    }
}

/// Serialize the payload into the connection's body sink.
///
/// The sink is dropped (and with it closed) on every path out of this
/// function, including serialization failure.
fn write_payload(conn: &mut dyn Connection, payload: &serde_json::Value) -> Result<()> {
    let mut body = conn
        .request_body()
        .map_err(|e| Error::Write(serde_json::Error::custom(e)))?;
    serde_json::to_writer(&mut body, payload).map_err(Error::Write)?;
    body.flush()
        .map_err(|e| Error::Write(serde_json::Error::custom(e)))?;
    Ok(())
}

/// A response body stream whose release runs exactly once.
///
/// Ownership is transferred to the consumer for one linear read pass.
/// Release is triggered by whichever comes first: an explicit
/// [`release`](ScopedStream::release) (mandatory-close paths, failures
/// surface as [`Error::Close`]) or drop (cancellation and abandonment,
/// best-effort). Reads after release yield EOF.
pub struct ScopedStream {
    body: Option<Box<dyn BodyRead>>,
}

impl std::fmt::Debug for ScopedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedStream")
            .field("released", &self.body.is_none())
            .finish()
    }
}

impl ScopedStream {
    pub(crate) fn new(body: Box<dyn BodyRead>) -> Self {
        Self { body: Some(body) }
    }

    /// True once the underlying stream has been released.
    pub fn is_released(&self) -> bool {
        self.body.is_none()
    }

    /// Close the underlying stream. The first call performs the close and
    /// reports any failure as [`Error::Close`]; later calls are no-ops.
    pub fn release(&mut self) -> Result<()> {
        match self.body.take() {
            Some(mut body) => body.close().map_err(Error::Close),
            None => Ok(()),
        }
    }
}

impl Read for ScopedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.body.as_mut() {
            Some(body) => body.read(buf),
            None => Ok(0),
        }
    }
}

impl Drop for ScopedStream {
    fn drop(&mut self) {
        if let Some(mut body) = self.body.take() {
            if let Err(e) = body.close() {
                tracing::debug!(error = %e, "best-effort close of response stream failed");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory transport double shared by the executor and codec tests.

    use std::io::{self, Cursor, Read, Write};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::transport::{BodyRead, Connection, Transport};

    /// Everything the connection observed, captured at exchange time.
    #[derive(Debug, Default)]
    pub struct Recorded {
        pub method: String,
        pub headers: Vec<(String, String)>,
        pub body: Option<Vec<u8>>,
        pub uri: String,
    }

    /// Scripted transport: records the request, replies with a fixed status
    /// and body, counts closes of the response stream.
    pub struct MockTransport {
        pub status: u16,
        pub response: Vec<u8>,
        pub recorded: Arc<Mutex<Recorded>>,
        pub closes: Arc<AtomicUsize>,
        /// Whether the response body had been read to EOF when it was
        /// closed.
        pub drained_at_close: Arc<AtomicBool>,
        pub fail_connect: bool,
        pub fail_body_open: bool,
        pub fail_exchange: bool,
        /// When set, reads from the response stream fail after this many
        /// bytes were served.
        pub fail_read_after: Option<usize>,
    }

    impl MockTransport {
        pub fn replying(status: u16, response: &[u8]) -> Self {
            Self {
                status,
                response: response.to_vec(),
                recorded: Arc::new(Mutex::new(Recorded::default())),
                closes: Arc::new(AtomicUsize::new(0)),
                drained_at_close: Arc::new(AtomicBool::new(false)),
                fail_connect: false,
                fail_body_open: false,
                fail_exchange: false,
                fail_read_after: None,
            }
        }

        pub fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }

        pub fn drained_at_close(&self) -> bool {
            self.drained_at_close.load(Ordering::SeqCst)
        }
    }

    impl Transport for MockTransport {
        fn connect(&self, uri: &str) -> io::Result<Box<dyn Connection>> {
            if self.fail_connect {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
            }
            Ok(Box::new(MockConnection {
                status: self.status,
                response: self.response.clone(),
                recorded: Arc::clone(&self.recorded),
                closes: Arc::clone(&self.closes),
                drained_at_close: Arc::clone(&self.drained_at_close),
                fail_body_open: self.fail_body_open,
                fail_exchange: self.fail_exchange,
                fail_read_after: self.fail_read_after,
                method: String::new(),
                headers: Vec::new(),
                body: None,
                uri: uri.to_string(),
            }))
        }
    }

    struct MockConnection {
        status: u16,
        response: Vec<u8>,
        recorded: Arc<Mutex<Recorded>>,
        closes: Arc<AtomicUsize>,
        drained_at_close: Arc<AtomicBool>,
        fail_body_open: bool,
        fail_exchange: bool,
        fail_read_after: Option<usize>,
        method: String,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
        uri: String,
    }

    impl Connection for MockConnection {
        fn set_method(&mut self, method: &str) {
            self.method = method.to_string();
        }

        fn set_header(&mut self, name: &str, value: &str) {
            self.headers.push((name.to_string(), value.to_string()));
        }

        fn request_body(&mut self) -> io::Result<Box<dyn Write + '_>> {
            if self.fail_body_open {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "body sink broken"));
            }
            Ok(Box::new(self.body.insert(Vec::new())))
        }

        fn into_response(self: Box<Self>) -> io::Result<(u16, Box<dyn BodyRead>)> {
            let this = *self;
            {
                let mut recorded = this.recorded.lock().unwrap();
                recorded.method = this.method;
                recorded.headers = this.headers;
                recorded.body = this.body;
                recorded.uri = this.uri;
            }
            if this.fail_exchange {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "exchange failed"));
            }
            Ok((
                this.status,
                Box::new(CountingBody {
                    data: Cursor::new(this.response),
                    closes: this.closes,
                    drained_at_close: this.drained_at_close,
                    fail_read_after: this.fail_read_after,
                    served: 0,
                }),
            ))
        }
    }

    /// Response body that counts closes and can inject a read fault.
    pub struct CountingBody {
        data: Cursor<Vec<u8>>,
        closes: Arc<AtomicUsize>,
        drained_at_close: Arc<AtomicBool>,
        fail_read_after: Option<usize>,
        served: usize,
    }

    impl Read for CountingBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if let Some(limit) = self.fail_read_after {
                if self.served >= limit {
                    return Err(io::Error::new(io::ErrorKind::ConnectionReset, "mid-read fault"));
                }
                let take = buf.len().min(limit - self.served);
                let n = self.data.read(&mut buf[..take])?;
                self.served += n;
                if n == 0 {
                    return Err(io::Error::new(io::ErrorKind::ConnectionReset, "mid-read fault"));
                }
                return Ok(n);
            }
            self.data.read(buf)
        }
    }

    impl BodyRead for CountingBody {
        fn close(&mut self) -> io::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            let drained = self.data.position() == self.data.get_ref().len() as u64;
            self.drained_at_close.store(drained, Ordering::SeqCst);
            Ok(())
        }
    }
}

//! Lazy, pull-based decoding of a JSON array, one element at a time.
//!
//! # Design
//! The response body is never buffered whole. A byte scanner frames exactly
//! one array element at a time (tracking brace/bracket depth and
//! string/escape state so commas and brackets inside strings or nested
//! values don't end the frame) and `serde_json` decodes the framed bytes.
//! Memory use is bounded by the largest single element.
//!
//! The sequence is single-pass and non-restartable. The underlying stream
//! is released the moment the closing `]` is consumed, which happens as
//! part of producing the last element; abandoning the sequence early
//! releases it on drop instead.

use std::io::{self, Read};
use std::marker::PhantomData;

use serde::de::{DeserializeOwned, Error as _};

use crate::error::{Error, Result};
use crate::executor::ScopedStream;

/// A lazily-pulled sequence of values decoded from a JSON array.
///
/// Obtained from [`RequestExecutor::stream`](crate::RequestExecutor::stream).
/// Elements can be pulled either through [`has_next`](Self::has_next) /
/// [`next_element`](Self::next_element) or through the [`Iterator`] impl,
/// which yields `Result` items and ends after the first error.
pub struct JsonSequence<T> {
    scanner: ElementScanner,
    state: State,
    buf: Vec<u8>,
    _element: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for JsonSequence<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSequence")
            .field("state", &self.state)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Opening `[` consumed; the next token is an element or the closing
    /// `]`.
    AtElement,
    /// An element was produced and the separating `,` is peeked but not
    /// yet consumed.
    AtSeparator,
    /// Closing `]` consumed and the stream released, or the sequence was
    /// poisoned by an earlier failure.
    Exhausted,
}

impl<T: DeserializeOwned> JsonSequence<T> {
    /// Consume the opening array token. On failure the stream is dropped,
    /// which releases it.
    pub(crate) fn new(stream: ScopedStream) -> Result<Self> {
        let mut scanner = ElementScanner::new(stream);
        match scanner.peek_token()? {
            Some(b'[') => scanner.bump(),
            Some(other) => {
                return Err(framing(format_args!(
                    "expected JSON array, found byte {:?}",
                    other as char
                )))
            }
            None => return Err(framing(format_args!("expected JSON array, found end of stream"))),
        }
        Ok(Self {
            scanner,
            state: State::AtElement,
            buf: Vec::new(),
            _element: PhantomData,
        })
    }

    /// True iff the sequence is not exhausted and another element follows.
    pub fn has_next(&mut self) -> Result<bool> {
        match self.state {
            State::Exhausted => Ok(false),
            State::AtSeparator => Ok(true),
            State::AtElement => match self.scanner.peek_token()? {
                Some(b']') => {
                    self.scanner.bump();
                    self.finish()?;
                    Ok(false)
                }
                Some(_) => Ok(true),
                None => {
                    self.state = State::Exhausted;
                    Err(framing(format_args!("unexpected end of stream inside array")))
                }
            },
        }
    }

    /// Decode the next element.
    ///
    /// Fails with [`Error::Exhausted`], repeatably and never with a stale
    /// value, once the sequence has ended. When the element consumed here turns
    /// out to be the last one, the closing `]` is consumed and the stream
    /// released before this call returns.
    pub fn next_element(&mut self) -> Result<T> {
        if !self.has_next()? {
            return Err(Error::Exhausted);
        }
        if self.state == State::AtSeparator {
            self.scanner.bump();
            self.state = State::AtElement;
        }
        let result = self.decode_one();
        if result.is_err() {
            // Single-pass: a failed sequence stays failed. The stream is
            // released when the sequence is dropped.
            self.state = State::Exhausted;
        }
        result
    }

    fn decode_one(&mut self) -> Result<T> {
        self.scanner.next_element_bytes(&mut self.buf)?;
        let value: T = serde_json::from_slice(&self.buf).map_err(Error::Parse)?;
        match self.scanner.peek_token()? {
            Some(b',') => self.state = State::AtSeparator,
            Some(b']') => {
                self.scanner.bump();
                self.finish()?;
            }
            Some(other) => {
                return Err(framing(format_args!(
                    "expected `,` or `]` after array element, found byte {:?}",
                    other as char
                )))
            }
            None => return Err(framing(format_args!("unexpected end of stream inside array"))),
        }
        Ok(value)
    }

    fn finish(&mut self) -> Result<()> {
        self.state = State::Exhausted;
        self.scanner.release()
    }
}

impl<T: DeserializeOwned> Iterator for JsonSequence<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => Some(self.next_element()),
            Ok(false) => None,
            Err(e) => {
                self.state = State::Exhausted;
                Some(Err(e))
            }
        }
    }
}

fn framing(msg: std::fmt::Arguments<'_>) -> Error {
    Error::Parse(serde_json::Error::custom(msg))
}

/// Byte-level scanner over the scoped stream with one byte of lookahead.
///
/// I/O failures while scanning are reported as [`Error::Parse`]: by this
/// point the response is being interpreted, and a truncated stream is a
/// malformed document from the consumer's point of view.
struct ElementScanner {
    stream: ScopedStream,
    peeked: Option<u8>,
}

impl ElementScanner {
    fn new(stream: ScopedStream) -> Self {
        Self {
            stream,
            peeked: None,
        }
    }

    fn release(&mut self) -> Result<()> {
        self.stream.release()
    }

    /// Ensure one byte of lookahead, without consuming it.
    fn fill_peek(&mut self) -> Result<Option<u8>> {
        if self.peeked.is_none() {
            let mut byte = [0u8; 1];
            loop {
                match self.stream.read(&mut byte) {
                    Ok(0) => break,
                    Ok(_) => {
                        self.peeked = Some(byte[0]);
                        break;
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(Error::Parse(serde_json::Error::custom(e))),
                }
            }
        }
        Ok(self.peeked)
    }

    /// Consume the peeked byte.
    fn bump(&mut self) {
        self.peeked = None;
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let b = self.fill_peek()?;
        self.bump();
        Ok(b)
    }

    /// Skip insignificant whitespace and peek the next structural byte.
    fn peek_token(&mut self) -> Result<Option<u8>> {
        loop {
            match self.fill_peek()? {
                Some(b' ' | b'\t' | b'\n' | b'\r') => self.bump(),
                other => return Ok(other),
            }
        }
    }

    /// Frame the next JSON value into `buf` (cleared first).
    fn next_element_bytes(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        buf.clear();
        let first = match self.peek_token()? {
            Some(b) => b,
            None => return Err(framing(format_args!("unexpected end of stream inside array"))),
        };
        match first {
            b'{' | b'[' => {
                self.bump();
                buf.push(first);
                self.frame_container_tail(buf)
            }
            b'"' => {
                self.bump();
                buf.push(b'"');
                self.frame_string_tail(buf)
            }
            _ => self.frame_scalar(buf),
        }
    }

    /// Frame the remainder of a `{...}` or `[...]` value whose opening byte
    /// is already in `buf`, respecting nesting and strings.
    fn frame_container_tail(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        let mut depth = 1usize;
        while depth > 0 {
            let b = match self.read_byte()? {
                Some(b) => b,
                None => return Err(framing(format_args!("unexpected end of stream inside value"))),
            };
            buf.push(b);
            match b {
                b'"' => self.frame_string_tail(buf)?,
                b'{' | b'[' => depth += 1,
                b'}' | b']' => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    /// Frame the remainder of a string whose opening quote is already in
    /// `buf`, up to and including the closing quote.
    fn frame_string_tail(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        loop {
            let b = match self.read_byte()? {
                Some(b) => b,
                None => return Err(framing(format_args!("unexpected end of stream inside string"))),
            };
            buf.push(b);
            match b {
                b'\\' => {
                    let escaped = match self.read_byte()? {
                        Some(b) => b,
                        None => {
                            return Err(framing(format_args!(
                                "unexpected end of stream inside string"
                            )))
                        }
                    };
                    buf.push(escaped);
                }
                b'"' => return Ok(()),
                _ => {}
            }
        }
    }

    /// Frame a scalar (number, `true`, `false`, `null`). The terminating
    /// byte is left unconsumed; end of stream also terminates, leaving the
    /// missing `]` to be caught by the delimiter check.
    fn frame_scalar(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        loop {
            match self.fill_peek()? {
                None => break,
                Some(b' ' | b'\t' | b'\n' | b'\r' | b',' | b']' | b'}') => break,
                Some(b) => {
                    buf.push(b);
                    self.bump();
                }
            }
        }
        if buf.is_empty() {
            return Err(framing(format_args!("expected array element")));
        }
        Ok(())
    }
}

//! Frames and writes outgoing messages.

use std::io::{self, Write};

use crate::errors::WriteError;
use crate::jsonrpc::Response;

/// Owns the output stream and emits LSP-framed messages.
pub struct MessageWriter<W> {
    writer: W,
}

impl<W: Write> MessageWriter<W> {
    /// Creates a writer over the given stream.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes `body` prefixed by its `Content-Length` header and flushes.
    ///
    /// Header and body go out in a single `write_all` so a concurrent
    /// reader never observes a header without its body.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if writing or flushing fails.
    pub fn write_message(&mut self, body: &str) -> io::Result<()> {
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        let mut frame = Vec::with_capacity(header.len() + body.len());
        frame.extend_from_slice(header.as_bytes());
        frame.extend_from_slice(body.as_bytes());
        self.writer.write_all(&frame)?;
        self.writer.flush()
    }

    /// Serialises and writes a response, returning the body length.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::Encode`] if serialisation fails, or
    /// [`WriteError::Io`] if writing fails.
    pub fn write_response(&mut self, response: &Response) -> Result<usize, WriteError> {
        let body = serde_json::to_string(response)?;
        self.write_message(&body)?;
        Ok(body.len())
    }

    /// Returns the wrapped stream.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

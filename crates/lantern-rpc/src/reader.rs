//! Reads LSP-framed messages from a byte stream.

use std::io::{self, BufRead, Read};
use std::sync::Arc;

use crate::errors::{HeaderError, ReadStage, StreamError};
use crate::header::{DEFAULT_MAX_CONTENT_LENGTH, HeaderParser, HeaderProgress};
use crate::observer::SessionObserver;

/// Maximum accepted length of a single header line, terminator included.
pub const MAX_HEADER_LINE_BYTES: usize = 8 * 1024;

/// Result of reading a header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderOutcome {
    /// A complete header declaring a body of this many bytes.
    ContentLength(usize),
    /// The stream ended before any byte of a new header.
    EndOfStream,
}

/// Result of reading a whole message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete message body, exactly `Content-Length` bytes long.
    Message(Vec<u8>),
    /// The stream ended cleanly between messages.
    EndOfStream,
}

/// Owns the input stream and yields complete message bodies.
pub struct MessageReader<R> {
    reader: R,
    max_content_length: usize,
    observer: Arc<dyn SessionObserver>,
}

impl<R: BufRead> MessageReader<R> {
    /// Creates a reader with the default length limit.
    #[must_use]
    pub fn new(reader: R, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            reader,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            observer,
        }
    }

    /// Overrides the maximum accepted body length.
    #[must_use]
    pub const fn with_max_content_length(mut self, max_content_length: usize) -> Self {
        self.max_content_length = max_content_length;
        self
    }

    /// Receives one framed message, blocking until it is complete.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError`] when the header is malformed, the stream ends
    /// inside a message, or the underlying read fails.
    pub fn read_message(&mut self) -> Result<ReadOutcome, StreamError> {
        match self.read_header()? {
            HeaderOutcome::EndOfStream => Ok(ReadOutcome::EndOfStream),
            HeaderOutcome::ContentLength(length) => self.read_body(length).map(ReadOutcome::Message),
        }
    }

    /// Reads the header block and returns the declared body length.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Header`] for malformed headers and
    /// [`StreamError::UnexpectedEndOfStream`] when the stream ends after the
    /// first header byte.
    pub fn read_header(&mut self) -> Result<HeaderOutcome, StreamError> {
        let mut parser = HeaderParser::new(self.max_content_length, Arc::clone(&self.observer));
        let mut line = Vec::new();
        let mut first = true;

        loop {
            line.clear();
            let bytes_read = self.read_header_line(&mut line)?;
            if bytes_read == 0 {
                return if first {
                    Ok(HeaderOutcome::EndOfStream)
                } else {
                    Err(StreamError::unexpected_eof(ReadStage::Header))
                };
            }
            first = false;

            if !line.ends_with(b"\n") {
                return Err(if bytes_read >= MAX_HEADER_LINE_BYTES {
                    HeaderError::LineTooLong {
                        limit: MAX_HEADER_LINE_BYTES,
                    }
                    .into()
                } else {
                    StreamError::unexpected_eof(ReadStage::Header)
                });
            }

            if let HeaderProgress::Complete(length) = parser.feed_line(&line)? {
                return Ok(HeaderOutcome::ContentLength(length));
            }
        }
    }

    /// Reads exactly `length` body bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::UnexpectedEndOfStream`] when fewer than
    /// `length` bytes remain, or [`StreamError::Io`] if reading fails.
    pub fn read_body(&mut self, length: usize) -> Result<Vec<u8>, StreamError> {
        let mut body = vec![0_u8; length];
        self.reader.read_exact(&mut body).map_err(|error| {
            if error.kind() == io::ErrorKind::UnexpectedEof {
                StreamError::unexpected_eof(ReadStage::Body)
            } else {
                StreamError::Io(error)
            }
        })?;
        self.observer.message_received(length);
        Ok(body)
    }

    /// Reads one line, bounded by [`MAX_HEADER_LINE_BYTES`].
    fn read_header_line(&mut self, line: &mut Vec<u8>) -> io::Result<usize> {
        let limit = u64::try_from(MAX_HEADER_LINE_BYTES).unwrap_or(u64::MAX);
        (&mut self.reader).take(limit).read_until(b'\n', line)
    }
}

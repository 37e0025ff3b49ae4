//! `Content-Length` header block parsing.
//!
//! LSP frames each payload with a header block:
//! ```text
//! Content-Length: <length>\r\n
//! [Other-Header: value\r\n]*
//! \r\n
//! ```
//! The first line must carry the length. Later lines are skipped until the
//! blank separator line.

use std::sync::Arc;

use crate::errors::HeaderError;
use crate::observer::SessionObserver;

/// Name of the mandatory header field, including the separator.
pub const CONTENT_LENGTH_FIELD: &str = "Content-Length:";

/// Default upper bound on a declared body length (64 MiB).
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

/// Progress after feeding one header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProgress {
    /// More header lines are required.
    NeedMore,
    /// The blank separator was reached; the body has this many bytes.
    Complete(usize),
}

/// Incremental parser for one header block.
///
/// A parser is built per message and fed raw lines, including their
/// terminators, until it reports [`HeaderProgress::Complete`].
pub struct HeaderParser {
    max_content_length: usize,
    content_length: Option<usize>,
    observer: Arc<dyn SessionObserver>,
}

impl HeaderParser {
    /// Creates a parser enforcing `max_content_length`.
    #[must_use]
    pub fn new(max_content_length: usize, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            max_content_length,
            content_length: None,
            observer,
        }
    }

    /// Consumes one raw header line.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError`] when the line is not CR LF terminated, is not
    /// UTF-8, or when the first line is not a valid `Content-Length` field.
    pub fn feed_line(&mut self, raw: &[u8]) -> Result<HeaderProgress, HeaderError> {
        let line = decode_line(raw)?;

        let Some(length) = self.content_length else {
            self.content_length = Some(parse_content_length(line, self.max_content_length)?);
            return Ok(HeaderProgress::NeedMore);
        };

        if line.is_empty() {
            return Ok(HeaderProgress::Complete(length));
        }
        self.observer.header_ignored(line);
        Ok(HeaderProgress::NeedMore)
    }
}

/// Strips the CR LF terminator and validates the remaining bytes.
fn decode_line(raw: &[u8]) -> Result<&str, HeaderError> {
    let content = raw
        .strip_suffix(b"\r\n")
        .ok_or(HeaderError::MalformedLineTerminator)?;
    if content.iter().any(|byte| matches!(byte, b'\r' | b'\n')) {
        return Err(HeaderError::MalformedLineTerminator);
    }
    std::str::from_utf8(content).map_err(|_| HeaderError::NonUtf8Line)
}

/// Parses the first header line as `Content-Length: <digits>`.
///
/// Spaces and tabs around the digits are tolerated; anything else in the
/// value is rejected.
///
/// # Errors
///
/// Returns [`HeaderError::MissingContentLength`] when the field name is
/// absent, [`HeaderError::InvalidLength`] when the value is not a decimal
/// integer that fits in `usize`, and [`HeaderError::ContentLengthTooLarge`]
/// when it exceeds `max_content_length`.
pub fn parse_content_length(line: &str, max_content_length: usize) -> Result<usize, HeaderError> {
    let Some(value) = line.strip_prefix(CONTENT_LENGTH_FIELD) else {
        return Err(HeaderError::MissingContentLength {
            found: line.to_owned(),
        });
    };

    let digits = value.trim_matches([' ', '\t']);
    let invalid = || HeaderError::InvalidLength {
        value: digits.to_owned(),
    };
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }
    let length: usize = digits.parse().map_err(|_| invalid())?;

    if length > max_content_length {
        return Err(HeaderError::ContentLengthTooLarge {
            length,
            limit: max_content_length,
        });
    }
    Ok(length)
}

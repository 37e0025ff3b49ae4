//! Error taxonomy for the framing and dispatch core.
//!
//! Framing errors ([`HeaderError`], [`StreamError`]) are fatal to the
//! session because the byte stream can no longer be resynchronised.
//! Message-content errors ([`ProtocolError`], [`HandlerError`]) are isolated
//! to a single request and surface to the client as JSON-RPC error
//! responses.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::jsonrpc::{ErrorCode, ResponseError};

/// Malformed `Content-Length` header block.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The first header line is not a `Content-Length` field.
    #[error("expected a Content-Length header, found '{found}'")]
    MissingContentLength {
        /// The offending first line.
        found: String,
    },

    /// A header line was not terminated by CR LF.
    #[error("header line is not terminated by CR LF")]
    MalformedLineTerminator,

    /// The `Content-Length` value is not a non-negative integer.
    #[error("invalid Content-Length value '{value}'")]
    InvalidLength {
        /// The raw header value.
        value: String,
    },

    /// The declared length exceeds the configured limit.
    #[error("Content-Length {length} exceeds the {limit} byte limit")]
    ContentLengthTooLarge {
        /// Declared body length.
        length: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// A header line exceeded the maximum line length.
    #[error("header line exceeds {limit} bytes")]
    LineTooLong {
        /// Maximum accepted line length in bytes.
        limit: usize,
    },

    /// A header line contained bytes that are not UTF-8.
    #[error("header line is not valid UTF-8")]
    NonUtf8Line,
}

/// Position in the frame where the stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStage {
    /// Inside the header block.
    Header,
    /// Inside the message body.
    Body,
}

impl fmt::Display for ReadStage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Header => "header",
            Self::Body => "body",
        };
        formatter.write_str(label)
    }
}

/// Failures reading a framed message from the input stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The stream ended part-way through a message.
    #[error("stream ended unexpectedly while reading the message {stage}")]
    UnexpectedEndOfStream {
        /// Where the stream ended.
        stage: ReadStage,
    },

    /// The header block was malformed.
    #[error("malformed header: {0}")]
    Header(#[from] HeaderError),

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StreamError {
    /// Creates an end-of-stream error for the given stage.
    #[must_use]
    pub const fn unexpected_eof(stage: ReadStage) -> Self {
        Self::UnexpectedEndOfStream { stage }
    }
}

/// A message body that is not a usable JSON-RPC request.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The body is not valid JSON.
    #[error("invalid JSON: {source}")]
    InvalidJson {
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The body is valid JSON but not an object.
    #[error("expected a JSON object, found {kind}")]
    NotAnObject {
        /// JSON type that was found.
        kind: &'static str,
    },

    /// The `id` member is neither an integer nor a string.
    #[error("request id must be an integer or string, found {kind}")]
    InvalidId {
        /// JSON type that was found.
        kind: &'static str,
    },

    /// The `jsonrpc` member is missing or not "2.0".
    #[error("unsupported JSON-RPC version: {found}")]
    UnsupportedVersion {
        /// Description of what was found.
        found: String,
    },

    /// The `method` member is missing.
    #[error("request has no method")]
    MissingMethod,

    /// A member has the wrong JSON type.
    #[error("invalid request: {message}")]
    InvalidEnvelope {
        /// Description of the problem.
        message: String,
    },
}

impl ProtocolError {
    /// Creates an invalid-envelope error.
    pub fn invalid_envelope(message: impl Into<String>) -> Self {
        Self::InvalidEnvelope {
            message: message.into(),
        }
    }

    /// JSON-RPC error code reported to the client.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidJson { .. } => ErrorCode::ParseError,
            Self::NotAnObject { .. }
            | Self::InvalidId { .. }
            | Self::UnsupportedVersion { .. }
            | Self::MissingMethod
            | Self::InvalidEnvelope { .. } => ErrorCode::InvalidRequest,
        }
    }

    /// Converts the error into a response payload.
    #[must_use]
    pub fn to_response_error(&self) -> ResponseError {
        ResponseError::new(self.error_code(), self.to_string())
    }
}

/// Faults raised by registered handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The handler failed while producing a result.
    #[error("{message}")]
    Failed {
        /// Failure description.
        message: String,
    },

    /// The parameters could not be decoded.
    #[error("invalid params: {message}")]
    InvalidParams {
        /// Decoding failure description.
        message: String,
    },

    /// The request is not acceptable in the current server state.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Reason the request was refused.
        message: String,
    },

    /// The request arrived before the server was initialised.
    #[error("server not initialized")]
    NotInitialized,

    /// The handler panicked.
    #[error("handler panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl HandlerError {
    /// Creates a generic handler failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Creates an invalid-params failure.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Creates an invalid-request failure.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// JSON-RPC error code reported to the client.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Failed { .. } | Self::Panicked { .. } => ErrorCode::InternalError,
            Self::InvalidParams { .. } => ErrorCode::InvalidParams,
            Self::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            Self::NotInitialized => ErrorCode::ServerNotInitialized,
        }
    }

    /// Converts the error into a response payload.
    #[must_use]
    pub fn to_response_error(&self) -> ResponseError {
        ResponseError::new(self.error_code(), self.to_string())
    }
}

/// Errors raised while populating a [`crate::HandlerRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A handler for the method already exists.
    #[error("a handler for '{method}' is already registered")]
    DuplicateMethod {
        /// Method name.
        method: String,
    },
}

/// Failures writing a framed response.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The response could not be serialised.
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    /// Writing or flushing the output stream failed.
    #[error("failed to write response: {0}")]
    Io(#[from] io::Error),
}

/// Conditions that move the session loop into its `Failed` state.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading the input stream failed.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Writing a response failed.
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Returns a short name for the JSON type of `value`.
pub(crate) const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

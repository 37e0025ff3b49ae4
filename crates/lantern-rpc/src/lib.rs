//! Framing and dispatch core for a stdio Language Server.
//!
//! The crate reads `Content-Length` framed JSON-RPC 2.0 messages from a
//! byte stream, routes each request to a handler registered by the embedding
//! application, and writes framed responses back. It knows nothing about
//! individual LSP methods; those are supplied through a [`HandlerRegistry`].
//!
//! A [`Session`] processes one message at a time. Framing faults are fatal
//! because the stream can no longer be resynchronised, while faults in a
//! single message (bad JSON, an unknown method, a failing or panicking
//! handler) are answered with a JSON-RPC error and the loop carries on.
//!
//! All diagnostics flow through an injected [`SessionObserver`]. The default
//! [`TracingObserver`] emits `tracing` events; installing a subscriber is
//! left to the binary.
//!
//! ```
//! use std::io::Cursor;
//!
//! use lantern_rpc::{HandlerRegistry, Session};
//! use serde_json::json;
//!
//! let mut registry = HandlerRegistry::new();
//! registry
//!     .register("ping", |_id, _params| Ok(json!("pong")))
//!     .expect("registration succeeds");
//!
//! let body = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
//! let input = format!("Content-Length: {}\r\n\r\n{body}", body.len());
//! let mut session = Session::new(Cursor::new(input.into_bytes()), Vec::new(), registry);
//! session.run().expect("session closes cleanly");
//!
//! let output = String::from_utf8(session.into_output()).expect("utf8 output");
//! assert!(output.ends_with(r#"{"jsonrpc":"2.0","id":1,"result":"pong"}"#));
//! ```

mod dispatch;
mod errors;
mod header;
mod jsonrpc;
mod observer;
mod reader;
mod registry;
mod session;
mod writer;

pub use dispatch::Dispatcher;
pub use errors::{
    HandlerError, HeaderError, ProtocolError, ReadStage, RegistryError, SessionError, StreamError,
    WriteError,
};
pub use header::{
    CONTENT_LENGTH_FIELD, DEFAULT_MAX_CONTENT_LENGTH, HeaderParser, HeaderProgress,
    parse_content_length,
};
pub use jsonrpc::{
    ErrorCode, JSONRPC_VERSION, RequestEnvelope, RequestId, Response, ResponseError,
    ResponseOutcome,
};
pub use observer::{SessionObserver, TracingObserver};
pub use reader::{HeaderOutcome, MAX_HEADER_LINE_BYTES, MessageReader, ReadOutcome};
pub use registry::{HandlerFn, HandlerRegistry};
pub use session::{
    CloseReason, ExitSignal, Session, SessionOptions, SessionOutcome, SessionState,
};
pub use writer::MessageWriter;

#[cfg(test)]
mod tests;

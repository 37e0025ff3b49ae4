//! Shared doubles for the core test suites.

use std::io::{self, Read, Write};
use std::sync::Mutex;

use serde_json::Value;

use crate::errors::{HandlerError, ProtocolError, SessionError};
use crate::jsonrpc::RequestId;
use crate::observer::SessionObserver;
use crate::session::CloseReason;

/// A single event captured by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    HeaderIgnored(String),
    MessageReceived(usize),
    Dispatched {
        method: String,
        id: Option<RequestId>,
    },
    ProtocolError {
        message: String,
        id: Option<RequestId>,
    },
    MethodNotFound {
        method: String,
        id: Option<RequestId>,
    },
    HandlerFailed {
        method: String,
        id: Option<RequestId>,
        error: HandlerError,
    },
    StrayResponse(Option<RequestId>),
    ResponseSent {
        id: RequestId,
        length: usize,
    },
    Closed {
        reason: CloseReason,
        messages: usize,
    },
    Failed {
        error: String,
        last_seen_id: Option<RequestId>,
    },
}

/// Observer that records every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events
            .lock()
            .expect("observer mutex poisoned")
            .clone()
    }

    pub fn ignored_headers(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::HeaderIgnored(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    pub fn received_lengths(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::MessageReceived(length) => Some(length),
                _ => None,
            })
            .collect()
    }

    pub fn protocol_errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::ProtocolError { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn handler_failures(&self) -> Vec<HandlerError> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::HandlerFailed { error, .. } => Some(error),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ObservedEvent) {
        self.events
            .lock()
            .expect("observer mutex poisoned")
            .push(event);
    }
}

impl SessionObserver for RecordingObserver {
    fn header_ignored(&self, line: &str) {
        self.record(ObservedEvent::HeaderIgnored(line.to_owned()));
    }

    fn message_received(&self, length: usize) {
        self.record(ObservedEvent::MessageReceived(length));
    }

    fn request_dispatched(&self, method: &str, id: Option<&RequestId>) {
        self.record(ObservedEvent::Dispatched {
            method: method.to_owned(),
            id: id.cloned(),
        });
    }

    fn protocol_error(&self, error: &ProtocolError, id: Option<&RequestId>) {
        self.record(ObservedEvent::ProtocolError {
            message: error.to_string(),
            id: id.cloned(),
        });
    }

    fn method_not_found(&self, method: &str, id: Option<&RequestId>) {
        self.record(ObservedEvent::MethodNotFound {
            method: method.to_owned(),
            id: id.cloned(),
        });
    }

    fn handler_failed(&self, method: &str, id: Option<&RequestId>, error: &HandlerError) {
        self.record(ObservedEvent::HandlerFailed {
            method: method.to_owned(),
            id: id.cloned(),
            error: error.clone(),
        });
    }

    fn stray_response(&self, id: Option<&RequestId>) {
        self.record(ObservedEvent::StrayResponse(id.cloned()));
    }

    fn response_sent(&self, id: &RequestId, length: usize) {
        self.record(ObservedEvent::ResponseSent {
            id: id.clone(),
            length,
        });
    }

    fn session_closed(&self, reason: CloseReason, messages: usize) {
        self.record(ObservedEvent::Closed { reason, messages });
    }

    fn session_failed(&self, error: &SessionError, last_seen_id: Option<&RequestId>) {
        self.record(ObservedEvent::Failed {
            error: error.to_string(),
            last_seen_id: last_seen_id.cloned(),
        });
    }
}

/// Frames `body` with a `Content-Length` header.
pub fn frame(body: &str) -> Vec<u8> {
    let mut framed = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
    framed.extend_from_slice(body.as_bytes());
    framed
}

/// Splits written output back into JSON bodies, asserting exact framing.
pub fn parse_frames(mut output: &[u8]) -> Vec<Value> {
    let mut bodies = Vec::new();
    while !output.is_empty() {
        let separator = output
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .expect("header separator");
        let header = std::str::from_utf8(&output[..separator]).expect("utf8 header");
        let length: usize = header
            .strip_prefix("Content-Length: ")
            .expect("content length header")
            .parse()
            .expect("numeric length");
        let start = separator + 4;
        let body = &output[start..start + length];
        bodies.push(serde_json::from_slice(body).expect("json body"));
        output = &output[start + length..];
    }
    bodies
}

/// Reader whose every read fails.
pub struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("read failed"))
    }
}

/// Writer whose every write fails.
pub struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer counting `write` and `flush` calls.
#[derive(Debug, Default)]
pub struct CountingWriter {
    pub bytes: Vec<u8>,
    pub write_calls: usize,
    pub flushes: usize,
}

impl Write for CountingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_calls += 1;
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

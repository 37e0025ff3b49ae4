//! The serve loop tying reader, dispatcher and writer together.
//!
//! A [`Session`] processes messages strictly one at a time: the next header
//! is not read until the current message has been dispatched and its
//! response flushed.

use std::fmt;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::dispatch::Dispatcher;
use crate::errors::SessionError;
use crate::header::DEFAULT_MAX_CONTENT_LENGTH;
use crate::jsonrpc::RequestId;
use crate::observer::{SessionObserver, TracingObserver};
use crate::reader::{HeaderOutcome, MessageReader};
use crate::registry::HandlerRegistry;
use crate::writer::MessageWriter;

/// Position of the session in its read/dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the next header block.
    AwaitingHeader,
    /// A header was parsed; reading the body.
    AwaitingBody,
    /// A body is being routed to its handler.
    Dispatching,
    /// The loop ended cleanly.
    Closed,
    /// The loop ended with an unrecoverable error.
    Failed,
}

impl SessionState {
    /// Returns `true` for `Closed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

/// Why a session closed cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client closed its end of the stream between messages.
    EndOfStream,
    /// A handler raised the [`ExitSignal`].
    ExitRequested,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::EndOfStream => "end of stream",
            Self::ExitRequested => "exit requested",
        };
        formatter.write_str(label)
    }
}

/// Summary of a cleanly closed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Why the loop stopped.
    pub reason: CloseReason,
    /// Number of message bodies read.
    pub messages: usize,
}

/// Flag a handler raises to stop the session after the current message.
#[derive(Debug, Clone, Default)]
pub struct ExitSignal(Arc<AtomicBool>);

impl ExitSignal {
    /// Creates a lowered signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the session stop.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`ExitSignal::raise`] has been called.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Collaborators and limits for a [`Session`].
#[derive(Clone)]
pub struct SessionOptions {
    /// Sink for session events.
    pub observer: Arc<dyn SessionObserver>,
    /// Signal checked after every message.
    pub exit_signal: ExitSignal,
    /// Largest accepted `Content-Length`.
    pub max_content_length: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            observer: TracingObserver::shared(),
            exit_signal: ExitSignal::new(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SessionOptions")
            .field("exit_signal", &self.exit_signal)
            .field("max_content_length", &self.max_content_length)
            .finish_non_exhaustive()
    }
}

/// A single client connection over a byte stream pair.
pub struct Session<R, W> {
    reader: MessageReader<R>,
    writer: MessageWriter<W>,
    dispatcher: Dispatcher,
    observer: Arc<dyn SessionObserver>,
    exit_signal: ExitSignal,
    state: SessionState,
    messages: usize,
}

impl<R: BufRead, W: Write> Session<R, W> {
    /// Creates a session with default options.
    #[must_use]
    pub fn new(input: R, output: W, registry: HandlerRegistry) -> Self {
        Self::with_options(input, output, registry, SessionOptions::default())
    }

    /// Creates a session with explicit collaborators.
    #[must_use]
    pub fn with_options(
        input: R,
        output: W,
        registry: HandlerRegistry,
        options: SessionOptions,
    ) -> Self {
        let SessionOptions {
            observer,
            exit_signal,
            max_content_length,
        } = options;
        Self {
            reader: MessageReader::new(input, Arc::clone(&observer))
                .with_max_content_length(max_content_length),
            writer: MessageWriter::new(output),
            dispatcher: Dispatcher::new(registry, Arc::clone(&observer)),
            observer,
            exit_signal,
            state: SessionState::AwaitingHeader,
            messages: 0,
        }
    }

    /// Serves messages until the stream ends, exit is requested, or a
    /// fatal error occurs.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the input stream is malformed or ends
    /// inside a message, or when a response cannot be written. The session
    /// is then in [`SessionState::Failed`].
    pub fn run(&mut self) -> Result<SessionOutcome, SessionError> {
        loop {
            match self.step() {
                Ok(None) => {}
                Ok(Some(reason)) => {
                    self.state = SessionState::Closed;
                    self.observer.session_closed(reason, self.messages);
                    return Ok(SessionOutcome {
                        reason,
                        messages: self.messages,
                    });
                }
                Err(error) => {
                    self.state = SessionState::Failed;
                    self.observer
                        .session_failed(&error, self.dispatcher.last_seen_id());
                    return Err(error);
                }
            }
        }
    }

    /// Processes one message, returning a close reason when the loop should
    /// stop.
    fn step(&mut self) -> Result<Option<CloseReason>, SessionError> {
        if self.exit_signal.is_raised() {
            return Ok(Some(CloseReason::ExitRequested));
        }

        self.state = SessionState::AwaitingHeader;
        let length = match self.reader.read_header()? {
            HeaderOutcome::EndOfStream => return Ok(Some(CloseReason::EndOfStream)),
            HeaderOutcome::ContentLength(length) => length,
        };

        self.state = SessionState::AwaitingBody;
        let body = self.reader.read_body(length)?;
        self.messages += 1;

        self.state = SessionState::Dispatching;
        if let Some(response) = self.dispatcher.dispatch(&body) {
            let written = self.writer.write_response(&response)?;
            self.observer.response_sent(&response.id, written);
        }

        Ok(self
            .exit_signal
            .is_raised()
            .then_some(CloseReason::ExitRequested))
    }

    /// Current position in the read/dispatch cycle.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Most recent request id seen, for diagnostics.
    #[must_use]
    pub const fn last_seen_id(&self) -> Option<&RequestId> {
        self.dispatcher.last_seen_id()
    }

    /// Number of message bodies read so far.
    #[must_use]
    pub const fn messages(&self) -> usize {
        self.messages
    }

    /// Consumes the session and returns the output stream.
    pub fn into_output(self) -> W {
        self.writer.into_inner()
    }
}

impl<R, W> fmt::Debug for Session<R, W> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("state", &self.state)
            .field("messages", &self.messages)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

//! Injected logging for the framing and dispatch core.
//!
//! Every component receives an `Arc<dyn SessionObserver>` rather than
//! reaching for process-wide state, so tests can record events in isolation.

use std::sync::Arc;

use crate::errors::{HandlerError, ProtocolError, SessionError};
use crate::jsonrpc::RequestId;
use crate::session::CloseReason;

/// Tracing target for framing events.
pub(crate) const FRAMING_TARGET: &str = "lantern_rpc::framing";
/// Tracing target for dispatch events.
pub(crate) const DISPATCH_TARGET: &str = "lantern_rpc::dispatch";
/// Tracing target for session lifecycle events.
pub(crate) const SESSION_TARGET: &str = "lantern_rpc::session";

/// Observer of session events, used as the logging sink of the core.
pub trait SessionObserver: Send + Sync {
    /// A non-`Content-Length` header line was skipped.
    fn header_ignored(&self, line: &str);

    /// A complete message body was read.
    fn message_received(&self, length: usize);

    /// A request or notification is being handed to its handler.
    fn request_dispatched(&self, method: &str, id: Option<&RequestId>);

    /// A message was rejected before reaching a handler.
    fn protocol_error(&self, error: &ProtocolError, id: Option<&RequestId>);

    /// No handler is registered for the method.
    fn method_not_found(&self, method: &str, id: Option<&RequestId>);

    /// A handler returned an error or panicked.
    fn handler_failed(&self, method: &str, id: Option<&RequestId>, error: &HandlerError);

    /// The client sent a response although no request was issued.
    fn stray_response(&self, id: Option<&RequestId>);

    /// A framed response was written.
    fn response_sent(&self, id: &RequestId, length: usize);

    /// The loop terminated cleanly.
    fn session_closed(&self, reason: CloseReason, messages: usize);

    /// The loop terminated with an unrecoverable error.
    fn session_failed(&self, error: &SessionError, last_seen_id: Option<&RequestId>);
}

impl<T> SessionObserver for Arc<T>
where
    T: SessionObserver + ?Sized,
{
    fn header_ignored(&self, line: &str) {
        (**self).header_ignored(line);
    }

    fn message_received(&self, length: usize) {
        (**self).message_received(length);
    }

    fn request_dispatched(&self, method: &str, id: Option<&RequestId>) {
        (**self).request_dispatched(method, id);
    }

    fn protocol_error(&self, error: &ProtocolError, id: Option<&RequestId>) {
        (**self).protocol_error(error, id);
    }

    fn method_not_found(&self, method: &str, id: Option<&RequestId>) {
        (**self).method_not_found(method, id);
    }

    fn handler_failed(&self, method: &str, id: Option<&RequestId>, error: &HandlerError) {
        (**self).handler_failed(method, id, error);
    }

    fn stray_response(&self, id: Option<&RequestId>) {
        (**self).stray_response(id);
    }

    fn response_sent(&self, id: &RequestId, length: usize) {
        (**self).response_sent(id, length);
    }

    fn session_closed(&self, reason: CloseReason, messages: usize) {
        (**self).session_closed(reason, messages);
    }

    fn session_failed(&self, error: &SessionError, last_seen_id: Option<&RequestId>) {
        (**self).session_failed(error, last_seen_id);
    }
}

/// Default observer that records events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    /// Builds a shared observer suitable for injection.
    #[must_use]
    pub fn shared() -> Arc<dyn SessionObserver> {
        Arc::new(Self)
    }
}

impl SessionObserver for TracingObserver {
    fn header_ignored(&self, line: &str) {
        tracing::debug!(target: FRAMING_TARGET, line, "ignoring header line");
    }

    fn message_received(&self, length: usize) {
        tracing::debug!(target: FRAMING_TARGET, length, "received message body");
    }

    fn request_dispatched(&self, method: &str, id: Option<&RequestId>) {
        tracing::debug!(
            target: DISPATCH_TARGET,
            method,
            id = id.map(tracing::field::display),
            notification = id.is_none(),
            "dispatching message"
        );
    }

    fn protocol_error(&self, error: &ProtocolError, id: Option<&RequestId>) {
        tracing::warn!(
            target: DISPATCH_TARGET,
            %error,
            id = id.map(tracing::field::display),
            replied = id.is_some(),
            "rejected message"
        );
    }

    fn method_not_found(&self, method: &str, id: Option<&RequestId>) {
        match id {
            Some(id) => tracing::warn!(
                target: DISPATCH_TARGET,
                method,
                %id,
                "no handler registered for request"
            ),
            None => tracing::debug!(
                target: DISPATCH_TARGET,
                method,
                "ignoring unhandled notification"
            ),
        }
    }

    fn handler_failed(&self, method: &str, id: Option<&RequestId>, error: &HandlerError) {
        tracing::error!(
            target: DISPATCH_TARGET,
            method,
            id = id.map(tracing::field::display),
            %error,
            "handler failed"
        );
    }

    fn stray_response(&self, id: Option<&RequestId>) {
        tracing::warn!(
            target: DISPATCH_TARGET,
            id = id.map(tracing::field::display),
            "ignoring response from client to an unknown request"
        );
    }

    fn response_sent(&self, id: &RequestId, length: usize) {
        tracing::debug!(target: FRAMING_TARGET, %id, length, "sent response");
    }

    fn session_closed(&self, reason: CloseReason, messages: usize) {
        tracing::info!(
            target: SESSION_TARGET,
            event = "session_closed",
            %reason,
            messages,
            "session closed"
        );
    }

    fn session_failed(&self, error: &SessionError, last_seen_id: Option<&RequestId>) {
        tracing::error!(
            target: SESSION_TARGET,
            event = "session_failed",
            %error,
            last_seen_id = last_seen_id.map(tracing::field::display),
            "session failed"
        );
    }
}

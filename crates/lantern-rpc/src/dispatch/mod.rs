//! Routing of decoded messages to registered handlers.
//!
//! The dispatcher turns one message body into at most one response. Requests
//! always receive exactly one response; notifications never do, even when
//! their handler fails.

mod envelope;
mod salvage;


use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;

use crate::errors::HandlerError;
use crate::jsonrpc::{RequestEnvelope, RequestId, Response, ResponseError};
use crate::observer::SessionObserver;
use crate::registry::HandlerRegistry;

use self::envelope::{Incoming, Rejection, decode};

/// Decodes message bodies and routes them through a [`HandlerRegistry`].
pub struct Dispatcher {
    registry: HandlerRegistry,
    observer: Arc<dyn SessionObserver>,
    last_seen_id: Option<RequestId>,
}

impl Dispatcher {
    /// Creates a dispatcher over a populated registry.
    #[must_use]
    pub fn new(registry: HandlerRegistry, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            registry,
            observer,
            last_seen_id: None,
        }
    }

    /// Handles one message body, returning the response to send, if any.
    ///
    /// Faults are contained here: malformed messages and failing handlers
    /// become error responses (when an id is known) and never propagate.
    pub fn dispatch(&mut self, body: &[u8]) -> Option<Response> {
        match decode(body) {
            Ok(Incoming::Request(request)) => self.route(request),
            Ok(Incoming::StrayResponse { id }) => {
                self.observer.stray_response(id.as_ref());
                None
            }
            Err(rejection) => self.reject(rejection),
        }
    }

    /// Most recent request id seen, kept for diagnostics.
    #[must_use]
    pub const fn last_seen_id(&self) -> Option<&RequestId> {
        self.last_seen_id.as_ref()
    }

    fn reject(&mut self, rejection: Rejection) -> Option<Response> {
        let Rejection { error, id } = rejection;
        self.observer.protocol_error(&error, id.as_ref());
        self.remember(id)
            .map(|reply_to| Response::error(reply_to, error.to_response_error()))
    }

    fn route(&mut self, request: RequestEnvelope) -> Option<Response> {
        let RequestEnvelope { id, method, params } = request;
        let reply_to = self.remember(id);

        let Some(handler) = self.registry.get(&method) else {
            self.observer.method_not_found(&method, reply_to.as_ref());
            return reply_to
                .map(|target| Response::error(target, ResponseError::method_not_found(&method)));
        };

        self.observer.request_dispatched(&method, reply_to.as_ref());
        let outcome = invoke(handler, reply_to.as_ref(), params);
        if let Err(error) = &outcome {
            self.observer.handler_failed(&method, reply_to.as_ref(), error);
        }

        let target = reply_to?;
        Some(match outcome {
            Ok(result) => Response::success(target, result),
            Err(error) => Response::error(target, error.to_response_error()),
        })
    }

    fn remember(&mut self, id: Option<RequestId>) -> Option<RequestId> {
        if let Some(seen) = &id {
            self.last_seen_id = Some(seen.clone());
        }
        id
    }
}

/// Runs a handler, converting a panic into [`HandlerError::Panicked`].
fn invoke(
    handler: &crate::registry::HandlerFn,
    id: Option<&RequestId>,
    params: Value,
) -> Result<Value, HandlerError> {
    panic::catch_unwind(AssertUnwindSafe(|| handler(id, params))).unwrap_or_else(|payload| {
        Err(HandlerError::Panicked {
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("last_seen_id", &self.last_seen_id)
            .finish_non_exhaustive()
    }
}

//! Decoding of message bodies into request envelopes.

use serde_json::{Map, Value};

use crate::errors::{ProtocolError, json_kind};
use crate::jsonrpc::{JSONRPC_VERSION, RequestEnvelope, RequestId};

use super::salvage::salvage_id;

/// A successfully decoded message.
#[derive(Debug)]
pub(crate) enum Incoming {
    /// A request (with id) or notification (without).
    Request(RequestEnvelope),
    /// A response from the client; the server never issues requests.
    StrayResponse { id: Option<RequestId> },
}

/// A message rejected before routing, with the id recovered for replying.
#[derive(Debug)]
pub(crate) struct Rejection {
    pub(crate) error: ProtocolError,
    pub(crate) id: Option<RequestId>,
}

impl Rejection {
    const fn new(error: ProtocolError, id: Option<RequestId>) -> Self {
        Self { error, id }
    }

    const fn anonymous(error: ProtocolError) -> Self {
        Self { error, id: None }
    }
}

/// Decodes a raw body into an [`Incoming`] message.
pub(crate) fn decode(body: &[u8]) -> Result<Incoming, Rejection> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|source| Rejection::new(ProtocolError::InvalidJson { source }, salvage_id(body)))?;

    let kind = json_kind(&value);
    let Value::Object(mut object) = value else {
        return Err(Rejection::anonymous(ProtocolError::NotAnObject { kind }));
    };

    let id = take_id(&mut object).map_err(Rejection::anonymous)?;
    if let Err(error) = check_version(&object) {
        return Err(Rejection::new(error, id));
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) => method,
        Some(other) => {
            return Err(Rejection::new(
                ProtocolError::invalid_envelope(format!(
                    "method must be a string, found {}",
                    json_kind(&other)
                )),
                id,
            ));
        }
        None if object.contains_key("result") || object.contains_key("error") => {
            return Ok(Incoming::StrayResponse { id });
        }
        None => return Err(Rejection::new(ProtocolError::MissingMethod, id)),
    };

    let params = match object.remove("params") {
        None => Value::Null,
        Some(params @ (Value::Object(_) | Value::Array(_) | Value::Null)) => params,
        Some(other) => {
            return Err(Rejection::new(
                ProtocolError::invalid_envelope(format!(
                    "params must be an object or array, found {}",
                    json_kind(&other)
                )),
                id,
            ));
        }
    };

    Ok(Incoming::Request(RequestEnvelope { id, method, params }))
}

fn take_id(object: &mut Map<String, Value>) -> Result<Option<RequestId>, ProtocolError> {
    match object.remove("id") {
        None => Ok(None),
        Some(raw) => RequestId::from_value(&raw)
            .map(Some)
            .ok_or(ProtocolError::InvalidId {
                kind: json_kind(&raw),
            }),
    }
}

fn check_version(object: &Map<String, Value>) -> Result<(), ProtocolError> {
    match object.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => Ok(()),
        Some(Value::String(version)) => Err(ProtocolError::UnsupportedVersion {
            found: format!("\"{version}\""),
        }),
        Some(other) => Err(ProtocolError::UnsupportedVersion {
            found: json_kind(other).to_owned(),
        }),
        None => Err(ProtocolError::UnsupportedVersion {
            found: "missing jsonrpc member".to_owned(),
        }),
    }
}

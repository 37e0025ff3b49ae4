//! JSON-RPC 2.0 envelope types exchanged with the editor.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Identifier correlating a request with its response.
///
/// JSON-RPC allows integers and strings. Any other JSON type in the `id`
/// slot is rejected during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Integer identifier.
    Number(i64),
    /// Integer identifier above `i64::MAX`.
    Unsigned(u64),
    /// String identifier.
    String(String),
}

impl RequestId {
    /// Converts a raw JSON value into an identifier.
    ///
    /// Returns `None` for fractional numbers and non-scalar values.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number
                .as_i64()
                .map(Self::Number)
                .or_else(|| number.as_u64().map(Self::Unsigned)),
            Value::String(text) => Some(Self::String(text.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(formatter, "{number}"),
            Self::Unsigned(number) => write!(formatter, "{number}"),
            Self::String(text) => write!(formatter, "{text:?}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// A decoded request or notification.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    /// Identifier; `None` marks a notification.
    pub id: Option<RequestId>,
    /// Method name used for routing.
    pub method: String,
    /// Parameters, `Value::Null` when the message carried none.
    pub params: Value,
}

impl RequestEnvelope {
    /// Returns `true` when no response is expected.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Standard JSON-RPC and LSP error codes used by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The body was not valid JSON.
    ParseError,
    /// The JSON was not a valid request object.
    InvalidRequest,
    /// No handler is registered for the method.
    MethodNotFound,
    /// The parameters did not match what the handler expects.
    InvalidParams,
    /// The handler failed.
    InternalError,
    /// A request arrived before `initialize`.
    ServerNotInitialized,
}

impl ErrorCode {
    /// Numeric value sent on the wire.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerNotInitialized => -32002,
        }
    }
}

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable description.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    /// Builds an error object from a code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Builds the error returned for an unregistered method.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(ErrorCode::MethodNotFound, format!("method not found: {method}"))
    }

    /// Attaches structured detail to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOutcome {
    /// Successful result payload.
    Result(Value),
    /// Failure description.
    Error(ResponseError),
}

/// A JSON-RPC 2.0 response message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// Identifier copied from the originating request.
    pub id: RequestId,
    /// Result or error payload.
    #[serde(flatten)]
    pub outcome: ResponseOutcome,
}

impl Response {
    /// Creates a successful response.
    #[must_use]
    pub const fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: ResponseOutcome::Result(result),
        }
    }

    /// Creates an error response.
    #[must_use]
    pub const fn error(id: RequestId, error: ResponseError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: ResponseOutcome::Error(error),
        }
    }

    /// Returns the error payload, if any.
    #[must_use]
    pub const fn error_payload(&self) -> Option<&ResponseError> {
        match &self.outcome {
            ResponseOutcome::Error(error) => Some(error),
            ResponseOutcome::Result(_) => None,
        }
    }

    /// Returns the result payload, if any.
    #[must_use]
    pub const fn result_payload(&self) -> Option<&Value> {
        match &self.outcome {
            ResponseOutcome::Result(result) => Some(result),
            ResponseOutcome::Error(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn serialises_success_with_id_before_result() {
        let response = Response::success(RequestId::Number(123), json!({"capabilities": {}}));
        let text = serde_json::to_string(&response).expect("serialization failed");

        assert_eq!(
            text,
            r#"{"jsonrpc":"2.0","id":123,"result":{"capabilities":{}}}"#
        );
    }

    #[rstest]
    fn serialises_null_result() {
        let response = Response::success(RequestId::from("abc"), Value::Null);
        let text = serde_json::to_string(&response).expect("serialization failed");

        assert_eq!(text, r#"{"jsonrpc":"2.0","id":"abc","result":null}"#);
    }

    #[rstest]
    fn serialises_error_without_result() {
        let response = Response::error(
            RequestId::Number(7),
            ResponseError::method_not_found("textDocument/hover"),
        );
        let value = serde_json::to_value(&response).expect("serialization failed");

        assert_eq!(value["error"]["code"], json!(-32601));
        assert_eq!(
            value["error"]["message"],
            json!("method not found: textDocument/hover")
        );
        assert!(value.get("result").is_none());
        assert!(value["error"].get("data").is_none());
    }

    #[rstest]
    fn serialises_error_data_when_present() {
        let error = ResponseError::new(ErrorCode::InvalidParams, "bad params")
            .with_data(json!({"field": "position"}));
        let value = serde_json::to_value(Response::error(RequestId::Number(1), error))
            .expect("serialization failed");

        assert_eq!(value["error"]["data"]["field"], json!("position"));
    }

    #[rstest]
    #[case(json!(5), Some(RequestId::Number(5)))]
    #[case(json!(-3), Some(RequestId::Number(-3)))]
    #[case(json!("x-1"), Some(RequestId::String("x-1".to_owned())))]
    #[case(json!(1.5), None)]
    #[case(json!(9_223_372_036_854_775_808_u64), Some(RequestId::Unsigned(9_223_372_036_854_775_808)))]
    #[case(json!(u64::MAX), Some(RequestId::Unsigned(u64::MAX)))]
    #[case(json!(1e3), None)]
    #[case(json!(null), None)]
    #[case(json!(true), None)]
    #[case(json!({"nested": 1}), None)]
    fn converts_request_ids(#[case] raw: Value, #[case] expected: Option<RequestId>) {
        assert_eq!(RequestId::from_value(&raw), expected);
    }

    #[rstest]
    fn echoes_unsigned_ids_verbatim() {
        let response = Response::success(RequestId::Unsigned(u64::MAX), Value::Null);
        let text = serde_json::to_string(&response).expect("serialization failed");

        assert_eq!(
            text,
            r#"{"jsonrpc":"2.0","id":18446744073709551615,"result":null}"#
        );
    }

    #[rstest]
    fn error_codes_match_protocol_values() {
        assert_eq!(ErrorCode::ParseError.code(), -32700);
        assert_eq!(ErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(ErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(ErrorCode::InvalidParams.code(), -32602);
        assert_eq!(ErrorCode::InternalError.code(), -32603);
        assert_eq!(ErrorCode::ServerNotInitialized.code(), -32002);
    }

    #[rstest]
    fn displays_string_ids_quoted() {
        assert_eq!(RequestId::from("abc").to_string(), "\"abc\"");
        assert_eq!(RequestId::Number(9).to_string(), "9");
    }
}

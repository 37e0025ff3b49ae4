//! Best-effort recovery of a request id from a body that failed to parse.
//!
//! Only a top-level `"id"` member that appears before any nested object or
//! array is considered, and only when its value is an integer or a string
//! literal without escapes. Anything less certain yields `None` so the
//! server stays silent instead of answering the wrong request.

use crate::jsonrpc::RequestId;

/// Attempts to recover the id of a malformed request.
pub(crate) fn salvage_id(body: &[u8]) -> Option<RequestId> {
    let text = String::from_utf8_lossy(body);
    let members = text.trim_start().strip_prefix('{')?;
    let top_level = members
        .find(['{', '['])
        .map_or(Some(members), |nested| members.get(..nested))?;
    let (_, after_key) = top_level.split_once("\"id\"")?;
    let value = after_key.trim_start().strip_prefix(':')?.trim_start();
    parse_scalar(value)
}

fn parse_scalar(value: &str) -> Option<RequestId> {
    if let Some(rest) = value.strip_prefix('"') {
        let (text, _) = rest.split_once('"')?;
        if text.contains('\\') {
            return None;
        }
        return Some(RequestId::String(text.to_owned()));
    }

    let end = value
        .find(|ch: char| !(ch.is_ascii_digit() || ch == '-'))
        .filter(|&end| {
            value
                .get(end..)
                .and_then(|rest| rest.chars().next())
                .is_some_and(|next| next == ',' || next == '}' || next.is_whitespace())
        })?;
    let digits = value.get(..end)?;
    digits
        .parse()
        .map(RequestId::Number)
        .or_else(|_| digits.parse().map(RequestId::Unsigned))
        .ok()
}

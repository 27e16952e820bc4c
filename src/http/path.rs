//! Request path decoding

use crate::error::RequestError;
use percent_encoding::percent_decode_str;

/// Percent-decode the path component of a request URI
///
/// The decoded path is both the cache key and the input to prefix rewriting.
/// Invalid UTF-8 and control characters are rejected.
pub fn decode_request_path(raw: &str) -> Result<String, RequestError> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| RequestError::MalformedPath(raw.to_string()))?;

    if decoded.chars().any(char::is_control) {
        return Err(RequestError::MalformedPath(raw.to_string()));
    }

    Ok(decoded.into_owned())
}

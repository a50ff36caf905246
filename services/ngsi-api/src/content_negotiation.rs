//! Accept header handling.
//!
//! Every `/v2` resource is served as JSON only. A request whose Accept header
//! rules JSON out is answered `406 NotAcceptable`.

use axum::http::{header, HeaderMap};
use ngsi_protocol::{media_types, NgsiError, NgsiResult};

/// Media types the API can produce.
pub const SUPPORTED_MEDIA_TYPES: &[&str] = &[media_types::JSON];

/// Check if the Accept header is compatible with the supported media types.
pub fn check_accept_header(headers: &HeaderMap, supported_types: &[&str]) -> NgsiResult<()> {
    // Get Accept header, default to */* if not present
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("*/*");

    // Each entry may carry parameters such as "application/json;q=0.9"
    let accepted_types: Vec<&str> = accept
        .split(',')
        .map(|s| s.split(';').next().unwrap_or("").trim())
        .filter(|s| !s.is_empty())
        .collect();

    if accepted_types.is_empty() {
        return Ok(());
    }

    for accepted in &accepted_types {
        if *accepted == "*/*" {
            return Ok(());
        }

        // type/* wildcards (e.g. "application/*")
        if let Some(prefix) = accepted.strip_suffix('*') {
            if supported_types.iter().any(|s| s.starts_with(prefix)) {
                return Ok(());
            }
            continue;
        }

        if supported_types.iter().any(|s| s.eq_ignore_ascii_case(accepted)) {
            return Ok(());
        }
    }

    Err(NgsiError::NotAcceptable)
}

/// Check that the client accepts JSON.
pub fn check_json_accept(headers: &HeaderMap) -> NgsiResult<()> {
    check_accept_header(headers, SUPPORTED_MEDIA_TYPES)
}

use crate::pipeline::Response as PipelineResponse;
use crate::request::{is_json_media_type, media_type};
use may_minihttp::Response;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Headers whose values are unique per request. They stay on the pipeline
/// response and are never written on the wire, since every wire header line
/// has to be `'static`.
const PER_REQUEST_HEADERS: &[&str] = &["x-request-id"];

/// Upper bound on distinct header lines kept alive for the process.
const MAX_INTERNED_HEADERS: usize = 1024;

/// Header lines handed to the writer. Route-declared headers and content types
/// form a bounded set, so each distinct line is leaked once and reused.
static INTERNED_HEADERS: Lazy<Mutex<HashSet<&'static str>>> = Lazy::new(Default::default);

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

/// Write a pipeline response onto the wire.
///
/// Bodies are JSON-encoded when the declared content type is JSON, or when no
/// content type is declared and the body is not a string. Other string bodies
/// are written verbatim.
pub fn write_response(res: &mut Response, response: &PipelineResponse) {
    res.status_code(response.status as usize, status_reason(response.status));

    let declared = response.get_header("content-type");
    let as_json = match declared {
        Some(ct) => is_json_media_type(&media_type(ct)),
        None => !response.body.is_string(),
    };
    let bytes = match &response.body {
        Value::String(s) if !as_json => s.clone().into_bytes(),
        other => serde_json::to_vec(other).unwrap_or_else(|_| b"null".to_vec()),
    };

    match declared {
        Some("application/json") => res.header("Content-Type: application/json"),
        None if as_json => res.header("Content-Type: application/json"),
        None => res.header("Content-Type: text/plain"),
        Some(ct) => match intern_header("Content-Type", ct) {
            Some(line) => res.header(line),
            None => res.header("Content-Type: application/octet-stream"),
        },
    };
    for (name, value) in &response.headers {
        if name.eq_ignore_ascii_case("content-type") || is_per_request(name) {
            continue;
        }
        if let Some(line) = intern_header(name, value) {
            res.header(line);
        }
    }
    res.body_vec(bytes);
}

fn is_per_request(name: &str) -> bool {
    PER_REQUEST_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// `'static` header line for `name: value`, or `None` once the table is full.
fn intern_header(name: &str, value: &str) -> Option<&'static str> {
    let line = format!("{name}: {value}");
    let mut interned = INTERNED_HEADERS
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(&existing) = interned.get(line.as_str()) {
        return Some(existing);
    }
    if interned.len() >= MAX_INTERNED_HEADERS {
        warn!(header = %name, "Header table full, dropping header line");
        return None;
    }
    let leaked: &'static str = Box::leak(line.into_boxed_str());
    interned.insert(leaked);
    Some(leaked)
}

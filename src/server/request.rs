use crate::request::RawRequest;
use http::Method;
use may_minihttp::Request;
use std::io::{self, Read};
use tracing::debug;

/// Convert a `may_minihttp::Request` into an owned [`RawRequest`].
///
/// Header names are lowercased; the body is read completely.
///
/// # Errors
///
/// Fails when the method is not a valid token or the body cannot be read.
pub fn parse_request(req: Request) -> io::Result<RawRequest> {
    let method = Method::from_bytes(req.method().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let target = req.path().to_string();

    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    let mut body = Vec::new();
    req.body().read_to_end(&mut body)?;

    debug!(
        method = %method,
        target = %target,
        header_count = headers.len(),
        body_size_bytes = body.len(),
        "HTTP request parsed"
    );

    Ok(build_raw_request(method, &target, headers, body))
}

/// Assemble a [`RawRequest`] from already extracted parts.
pub(crate) fn build_raw_request(
    method: Method,
    target: &str,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
) -> RawRequest {
    let mut raw = RawRequest::new(method, target);
    for (name, value) in headers {
        raw = raw.with_header(&name, value);
    }
    raw.with_raw_body(body)
}

//! Text-field extraction from `multipart/form-data` bodies.
//!
//! Only what form validation needs: field names and their textual values.
//! File parts (those carrying a `filename`) are skipped.

use super::MultiMap;

/// Extract the `boundary` parameter from a multipart `Content-Type` value.
#[must_use]
pub fn parse_boundary(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let param = param.trim();
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Parse the text fields of a multipart body.
///
/// Malformed parts are ignored rather than rejected; the schema reports whatever
/// required fields end up missing.
#[must_use]
pub fn parse_text_fields(body: &[u8], boundary: &str) -> MultiMap {
    let text = String::from_utf8_lossy(body);
    let delimiter = format!("--{boundary}");
    let mut fields = MultiMap::new();

    for part in text.split(delimiter.as_str()).skip(1) {
        if part.starts_with("--") {
            break;
        }
        let part = part.strip_prefix("\r\n").unwrap_or(part);
        let Some((head, value)) = part.split_once("\r\n\r\n") else {
            continue;
        };
        let Some((name, is_file)) = disposition(head) else {
            continue;
        };
        if is_file {
            continue;
        }
        let value = value.strip_suffix("\r\n").unwrap_or(value);
        fields.push(name, value);
    }
    fields
}

/// Field name from the part's `Content-Disposition`, and whether it is a file part.
fn disposition(head: &str) -> Option<(String, bool)> {
    let line = head.lines().find(|l| {
        l.split(':')
            .next()
            .is_some_and(|h| h.trim().eq_ignore_ascii_case("content-disposition"))
    })?;
    let (_, params) = line.split_once(':')?;
    let mut name = None;
    let mut is_file = false;
    for param in params.split(';').map(str::trim) {
        if let Some(v) = param.strip_prefix("name=") {
            name = Some(v.trim_matches('"').to_string());
        } else if param.starts_with("filename=") {
            is_file = true;
        }
    }
    name.map(|n| (n, is_file))
}

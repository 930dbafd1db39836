use super::{
    is_json_media_type, media_type, parse_boundary, parse_text_fields, JsonOptions,
    JsonParseError, MultiMap, RequestSource,
};
use http::Method;
use serde_json::Value;

/// Parse a query string (with or without the leading path) into a multi-map.
///
/// Names and values are percent-decoded; repeated keys keep every occurrence.
#[must_use]
pub fn parse_query_string(path_or_query: &str) -> MultiMap {
    let query = match path_or_query.find('?') {
        Some(pos) => &path_or_query[pos + 1..],
        None if path_or_query.starts_with('/') => "",
        None => path_or_query,
    };
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Owned request data implementing [`RequestSource`].
///
/// Built by the HTTP adapter from the wire request, or directly in tests:
///
/// ```rust
/// use brrtvalidate::request::{RawRequest, RequestSource};
/// use http::Method;
/// use serde_json::json;
///
/// let req = RawRequest::new(Method::POST, "/search?limit=1&min_views=2")
///     .with_json(&json!({"search_term": "text"}));
/// assert_eq!(req.raw_query().get_last("limit"), Some("1"));
/// assert_eq!(req.content_type(), Some("application/json"));
/// ```
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    /// Path without the query string
    pub path: String,
    /// Header pairs, names lowercased
    pub headers: Vec<(String, String)>,
    query: MultiMap,
    form: Option<MultiMap>,
    body: Vec<u8>,
}

impl RawRequest {
    /// Create a request for `target`, which may include a query string.
    pub fn new(method: Method, target: &str) -> Self {
        let path = target.split('?').next().unwrap_or("/").to_string();
        Self {
            method,
            path,
            headers: Vec::new(),
            query: parse_query_string(target),
            form: None,
            body: Vec::new(),
        }
    }

    /// Add a header; names are stored lowercased.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        self.headers.retain(|(k, _)| *k != name);
        self.headers.push((name, value.into()));
        self.refresh_form();
        self
    }

    /// Set a raw body and its content type.
    #[must_use]
    pub fn with_body(mut self, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.with_header("content-type", content_type)
    }

    /// Set the body bytes, keeping whatever content type is already declared.
    #[must_use]
    pub fn with_raw_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.refresh_form();
        self
    }

    /// Set a JSON body with `Content-Type: application/json`.
    #[must_use]
    pub fn with_json(self, body: &Value) -> Self {
        self.with_body("application/json", body.to_string())
    }

    /// Set already-parsed form fields with `Content-Type: multipart/form-data`.
    #[must_use]
    pub fn with_form<K, V, I>(mut self, fields: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self = self.with_header("content-type", "multipart/form-data");
        self.form = Some(fields.into_iter().collect());
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    fn refresh_form(&mut self) {
        let Some(content_type) = self.header("content-type").map(str::to_string) else {
            return;
        };
        match media_type(&content_type).as_str() {
            "application/x-www-form-urlencoded" => {
                self.form = Some(
                    url::form_urlencoded::parse(&self.body)
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect(),
                );
            }
            "multipart/form-data" if self.body.is_empty() => {
                self.form = Some(MultiMap::new());
            }
            "multipart/form-data" => {
                if let Some(boundary) = parse_boundary(&content_type) {
                    self.form = Some(parse_text_fields(&self.body, &boundary));
                }
            }
            _ => {}
        }
    }
}

impl RequestSource for RawRequest {
    fn raw_query(&self) -> &MultiMap {
        &self.query
    }

    fn raw_form(&self) -> Option<&MultiMap> {
        self.form.as_ref()
    }

    fn json_body(&self, options: &JsonOptions) -> Result<Option<Value>, JsonParseError> {
        let announced_json = self
            .content_type()
            .map(|ct| is_json_media_type(&media_type(ct)))
            .unwrap_or(false);
        if !announced_json && !options.force {
            return Ok(None);
        }
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(value) => Ok(Some(value)),
            Err(_) if options.silent => Ok(None),
            Err(err) => Err(JsonParseError {
                detail: err.to_string(),
            }),
        }
    }

    fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_query_string() {
        let q = parse_query_string("/arr?arr1=first&arr1=second&name=a%20b");
        assert_eq!(q.get_all("arr1"), vec!["first", "second"]);
        assert_eq!(q.get_last("name"), Some("a b"));
        assert!(parse_query_string("/plain").is_empty());
        assert_eq!(parse_query_string("x=1").get_last("x"), Some("1"));
    }

    #[test]
    fn test_json_body_requires_json_content_type() {
        let req = RawRequest::new(Method::POST, "/").with_body("text/plain", "{\"a\": 1}");
        assert_eq!(req.json_body(&JsonOptions::default()).unwrap(), None);
        let forced = JsonOptions {
            silent: false,
            force: true,
        };
        assert_eq!(req.json_body(&forced).unwrap(), Some(json!({"a": 1})));
    }

    #[test]
    fn test_json_body_malformed() {
        let req = RawRequest::new(Method::POST, "/").with_body("application/json", "{");
        assert!(req.json_body(&JsonOptions::default()).is_err());
        assert_eq!(req.json_body(&JsonOptions::silent()).unwrap(), None);
    }

    #[test]
    fn test_urlencoded_form() {
        let req = RawRequest::new(Method::POST, "/form")
            .with_body("application/x-www-form-urlencoded", "name=geralt&age=95");
        let form = req.raw_form().unwrap();
        assert_eq!(form.get_last("name"), Some("geralt"));
        assert_eq!(form.get_last("age"), Some("95"));
    }

    #[test]
    fn test_with_form_sets_multipart_content_type() {
        let req = RawRequest::new(Method::POST, "/form").with_form([("search_term", "text")]);
        assert_eq!(req.content_type(), Some("multipart/form-data"));
        assert_eq!(req.raw_form().unwrap().get_last("search_term"), Some("text"));
    }

    #[test]
    fn test_empty_multipart_body_is_empty_form() {
        let req = RawRequest::new(Method::POST, "/form")
            .with_body("multipart/form-data; boundary=XyZ", "");
        assert_eq!(req.raw_form(), Some(&MultiMap::new()));
    }

    #[test]
    fn test_no_form_without_form_content_type() {
        let req = RawRequest::new(Method::POST, "/").with_json(&json!({}));
        assert!(req.raw_form().is_none());
    }
}

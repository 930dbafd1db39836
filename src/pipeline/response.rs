use crate::error::PipelineError;
use crate::schema::Instance;
use serde_json::{json, Value};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::error;

/// Maximum number of headers kept inline before spilling to the heap
pub const MAX_INLINE_HEADERS: usize = 16;

/// Response headers; names are shared `Arc<str>` so cloning a response is cheap.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Response envelope returned to the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: Value,
}

impl Response {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with a `content-type: application/json` header.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// `{"error": message}` response.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "error": message }))
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header (names compare case-insensitively).
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Extra element of a tuple reply.
#[derive(Debug, Clone, PartialEq)]
pub enum TupleItem {
    Status(u16),
    Headers(Vec<(String, String)>),
}

impl TupleItem {
    pub fn headers<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        TupleItem::Headers(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// What a handler returns.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A validated instance, serialized with the route's options.
    Model(Instance),
    /// A sequence; required shape for `response_many` routes.
    List(Vec<Reply>),
    /// A reply with up to two extras (status and/or headers) in any order.
    Tuple(Box<Reply>, Vec<TupleItem>),
    /// Plain JSON, passed through without schema serialization.
    Json(Value),
    /// A ready response, returned unchanged.
    Response(Response),
}

impl Reply {
    #[must_use]
    pub fn with_status(self, status: u16) -> Self {
        self.push_item(TupleItem::Status(status))
    }

    #[must_use]
    pub fn with_headers<K, V, I>(self, pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.push_item(TupleItem::headers(pairs))
    }

    fn push_item(self, item: TupleItem) -> Self {
        match self {
            Reply::Tuple(inner, mut items) => {
                items.push(item);
                Reply::Tuple(inner, items)
            }
            other => Reply::Tuple(Box::new(other), vec![item]),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Reply::Model(_) => "model",
            Reply::List(_) => "list",
            Reply::Tuple(..) => "tuple",
            Reply::Json(_) => "json",
            Reply::Response(_) => "response",
        }
    }
}

impl From<Instance> for Reply {
    fn from(instance: Instance) -> Self {
        Reply::Model(instance)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}

/// Per-route serialization switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyOptions {
    pub on_success_status: u16,
    pub exclude_none: bool,
    pub many: bool,
    pub by_alias: bool,
}

impl Default for ReplyOptions {
    fn default() -> Self {
        Self {
            on_success_status: 200,
            exclude_none: false,
            many: false,
            by_alias: false,
        }
    }
}

/// Turn a handler's reply into a response.
///
/// # Errors
///
/// [`PipelineError::InvalidIterableOfModels`] when `many` is set and the reply is
/// not a list made only of model instances.
pub fn serialize_reply(reply: Reply, options: &ReplyOptions) -> Result<Response, PipelineError> {
    if options.many {
        return serialize_many(reply, options);
    }
    match reply {
        Reply::Model(instance) => Ok(Response::json(
            options.on_success_status,
            instance.render(options.exclude_none, options.by_alias),
        )),
        Reply::Tuple(inner, items) => match *inner {
            Reply::Model(instance) if tuple_len_ok(&items) => {
                let body = instance.render(options.exclude_none, options.by_alias);
                Ok(apply_items(
                    Response::json(options.on_success_status, body),
                    &items,
                ))
            }
            inner => Ok(passthrough(Reply::Tuple(Box::new(inner), items), options)),
        },
        other => Ok(passthrough(other, options)),
    }
}

fn serialize_many(reply: Reply, options: &ReplyOptions) -> Result<Response, PipelineError> {
    let Reply::List(items) = reply else {
        return Err(contract_violation(&reply));
    };
    if let Some(bad) = items.iter().find(|r| !matches!(r, Reply::Model(_))) {
        return Err(PipelineError::InvalidIterableOfModels {
            returned: format!("list containing a {} item", bad.kind()),
        });
    }
    let rendered = items
        .into_iter()
        .filter_map(|r| match r {
            Reply::Model(instance) => Some(instance.render(options.exclude_none, options.by_alias)),
            _ => None,
        })
        .collect();
    Ok(Response::json(options.on_success_status, Value::Array(rendered)))
}

fn contract_violation(reply: &Reply) -> PipelineError {
    error!(returned = reply.kind(), "response_many handler returned a non-list reply");
    PipelineError::InvalidIterableOfModels {
        returned: reply.kind().to_string(),
    }
}

fn tuple_len_ok(items: &[TupleItem]) -> bool {
    (1..=2).contains(&items.len())
}

fn apply_items(mut response: Response, items: &[TupleItem]) -> Response {
    for item in items {
        match item {
            TupleItem::Status(status) => response.status = *status,
            TupleItem::Headers(pairs) => {
                for (name, value) in pairs {
                    response.set_header(name, value.clone());
                }
            }
        }
    }
    response
}

/// Framework-default conversion of replies that bypass schema serialization.
fn passthrough(reply: Reply, options: &ReplyOptions) -> Response {
    match reply {
        Reply::Response(response) => response,
        Reply::Json(value) => Response::json(200, value),
        Reply::Tuple(inner, items) => apply_items(passthrough(*inner, options), &items),
        Reply::Model(instance) => Response::json(
            200,
            instance.render(options.exclude_none, options.by_alias),
        ),
        Reply::List(items) => Response::json(
            200,
            Value::Array(
                items
                    .into_iter()
                    .map(|item| passthrough(item, options).body)
                    .collect(),
            ),
        ),
    }
}

/// 415 response for a request whose content type does not fit the validated source.
#[must_use]
pub fn unsupported_media_type(content_type: &str) -> Response {
    Response::json(
        415,
        json!({
            "detail": format!(
                "Unsupported media type '{content_type}' in request. 'application/json' is required."
            )
        }),
    )
}

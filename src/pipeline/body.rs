//! Body and form resolution.
//!
//! Modes are tried in priority order: root value, many objects (body only, when
//! configured), single object. A raw value that cannot be expanded as a mapping
//! is either a content-type problem (415) or a malformed body (hard error),
//! decided by the declared media type.

use super::query::normalize_query;
use crate::error::{ErrorRecord, Loc, ParamSource, PipelineError};
use crate::request::{media_type, JsonOptions, RequestSource};
use crate::schema::{construct, Instance, Schema};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Media type expected for a given source.
#[must_use]
pub const fn expected_media_type(source: ParamSource) -> &'static str {
    match source {
        ParamSource::Form => "multipart/form-data",
        _ => "application/json",
    }
}

/// Resolved body or form parameters.
#[derive(Debug, Clone)]
pub enum Params {
    One(Instance),
    Many(Vec<Instance>),
}

impl Params {
    #[must_use]
    pub fn as_one(&self) -> Option<&Instance> {
        match self {
            Params::One(instance) => Some(instance),
            Params::Many(_) => None,
        }
    }

    #[must_use]
    pub fn as_many(&self) -> Option<&[Instance]> {
        match self {
            Params::One(_) => None,
            Params::Many(items) => Some(items),
        }
    }
}

/// Result of resolving one source that did not fail hard.
#[derive(Debug)]
pub enum Resolution {
    Resolved(Params),
    Invalid(Vec<ErrorRecord>),
    /// Content type does not fit the source; carries the lowercased header value.
    UnsupportedMediaType(String),
}

/// Resolve the JSON body against `schema`.
///
/// # Errors
///
/// [`PipelineError::JsonBodyParsing`] when the body announces JSON but cannot be
/// decoded, or decodes to something other than an object in single-object mode.
pub fn resolve_body<R: RequestSource + ?Sized>(
    schema: &Arc<Schema>,
    request: &R,
    options: &JsonOptions,
    many: bool,
) -> Result<Resolution, PipelineError> {
    let raw = match request.json_body(options) {
        Ok(Some(Value::Null) | None) if options.silent => Some(Value::Object(Map::new())),
        Ok(Some(value)) => Some(value),
        Ok(None) => None,
        Err(err) => {
            warn!(error = %err, "JSON body could not be decoded");
            return Err(PipelineError::JsonBodyParsing {
                source: ParamSource::Body,
                detail: err.detail,
            });
        }
    };

    if schema.is_root() {
        return Ok(from_construct(schema, raw.unwrap_or(Value::Null)));
    }
    if many {
        return Ok(validate_many(schema, raw));
    }
    match raw {
        Some(Value::Object(fields)) => Ok(from_construct(schema, Value::Object(fields))),
        _ => structural_failure(ParamSource::Body, request),
    }
}

/// Resolve the form fields against `schema`.
///
/// Form fields go through the same list-aware flattening as the query string.
pub fn resolve_form<R: RequestSource + ?Sized>(
    schema: &Arc<Schema>,
    request: &R,
) -> Result<Resolution, PipelineError> {
    let Some(raw) = request.raw_form() else {
        return structural_failure(ParamSource::Form, request);
    };
    let fields = Value::Object(normalize_query(raw, schema));
    Ok(from_construct(schema, fields))
}

fn from_construct(schema: &Arc<Schema>, value: Value) -> Resolution {
    match construct(schema, value) {
        Ok(instance) => Resolution::Resolved(Params::One(instance)),
        Err(errors) => Resolution::Invalid(errors),
    }
}

/// Validate every element of an array body; errors of all elements are kept,
/// each located under its element index.
fn validate_many(schema: &Arc<Schema>, raw: Option<Value>) -> Resolution {
    let items = match raw {
        Some(Value::Array(items)) if items.iter().all(Value::is_object) => items,
        _ => {
            debug!(schema = %schema.name(), "Body is not an array of objects");
            return Resolution::Invalid(vec![ErrorRecord::new(
                vec![Loc::field("root")],
                "is not an array of objects",
                "type_error.array",
            )]);
        }
    };

    let mut instances = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (idx, item) in items.into_iter().enumerate() {
        match construct(schema, item) {
            Ok(instance) => instances.push(instance),
            Err(item_errors) => errors.extend(
                item_errors
                    .into_iter()
                    .map(|e| e.nested_under(Loc::Index(idx))),
            ),
        }
    }
    if errors.is_empty() {
        Resolution::Resolved(Params::Many(instances))
    } else {
        Resolution::Invalid(errors)
    }
}

fn structural_failure<R: RequestSource + ?Sized>(
    source: ParamSource,
    request: &R,
) -> Result<Resolution, PipelineError> {
    let content_type = request
        .content_type()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if media_type(&content_type) != expected_media_type(source) {
        debug!(%source, content_type = %content_type, "Unsupported media type");
        return Ok(Resolution::UnsupportedMediaType(content_type));
    }
    warn!(%source, "Request payload could not be read as a mapping");
    Err(PipelineError::JsonBodyParsing {
        source,
        detail: format!("{} is not a mapping", source.arg_name()),
    })
}

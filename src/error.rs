//! # Error Module
//!
//! Error types shared by the schema engine binding and the validation pipeline.
//!
//! Two families live here:
//!
//! - **Recoverable** field-level failures: [`ErrorRecord`]s, one per failing field, which the
//!   pipeline aggregates per [`ParamSource`] before deciding anything.
//! - **Hard** failures: [`PipelineError`] variants that stop the pipeline and propagate to the
//!   transport layer (malformed JSON, handler contract violations, raised validation reports).
//!
//! Startup-time problems (a schema that does not compile, a route whose schemas conflict)
//! are reported through [`SchemaError`] and [`RouteConfigError`].

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;

/// One segment of an error location: a field name or a position in an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Loc {
    Field(String),
    Index(usize),
}

impl Loc {
    pub fn field(name: impl Into<String>) -> Self {
        Loc::Field(name.into())
    }
}

impl Serialize for Loc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Loc::Field(name) => serializer.serialize_str(name),
            Loc::Index(idx) => serializer.serialize_u64(*idx as u64),
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loc::Field(name) => write!(f, "{name}"),
            Loc::Index(idx) => write!(f, "{idx}"),
        }
    }
}

/// A single field-level validation failure.
///
/// Serialized as `{"loc": [...], "msg": "...", "type": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// Path from the validated value's root to the failing field
    pub loc: Vec<Loc>,
    /// Human readable description
    pub msg: String,
    /// Machine readable error kind (`missing`, `type`, `type_error.array`, ...)
    #[serde(rename = "type")]
    pub kind: String,
}

impl ErrorRecord {
    pub fn new(loc: Vec<Loc>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }

    /// Prefix the location with an extra leading segment.
    #[must_use]
    pub fn nested_under(mut self, segment: Loc) -> Self {
        self.loc.insert(0, segment);
        self
    }

    /// Dotted rendering of the location, used in log lines.
    #[must_use]
    pub fn location(&self) -> String {
        self.loc
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Independent channel of request input.
///
/// Declaration order is the order in which the orchestrator resolves sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamSource {
    Path,
    Query,
    Body,
    Form,
}

impl ParamSource {
    /// Key used for this source in validation reports.
    #[must_use]
    pub const fn report_key(self) -> &'static str {
        match self {
            ParamSource::Path => "path_params",
            ParamSource::Query => "query_params",
            ParamSource::Body => "body_params",
            ParamSource::Form => "form_params",
        }
    }

    /// Handler parameter name this source is injected as.
    #[must_use]
    pub const fn arg_name(self) -> &'static str {
        match self {
            ParamSource::Path => "path",
            ParamSource::Query => "query",
            ParamSource::Body => "body",
            ParamSource::Form => "form",
        }
    }
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.report_key())
    }
}

/// Raised form of a validation report.
///
/// Produced instead of an automatic error response when
/// [`ValidationConfig::raise_on_error`](crate::config::ValidationConfig::raise_on_error) is set,
/// so that the caller's own error handling decides the presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub body_params: Option<Vec<ErrorRecord>>,
    pub form_params: Option<Vec<ErrorRecord>>,
    pub path_params: Option<Vec<ErrorRecord>>,
    pub query_params: Option<Vec<ErrorRecord>>,
}

impl ValidationError {
    /// Whether any source produced an error.
    #[must_use]
    pub fn check(&self) -> bool {
        self.body_params.is_some()
            || self.form_params.is_some()
            || self.path_params.is_some()
            || self.query_params.is_some()
    }

    /// Bucket for a given source.
    #[must_use]
    pub fn errors_for(&self, source: ParamSource) -> Option<&[ErrorRecord]> {
        match source {
            ParamSource::Path => self.path_params.as_deref(),
            ParamSource::Query => self.query_params.as_deref(),
            ParamSource::Body => self.body_params.as_deref(),
            ParamSource::Form => self.form_params.as_deref(),
        }
    }

    pub(crate) fn set(&mut self, source: ParamSource, errors: Vec<ErrorRecord>) {
        let slot = match source {
            ParamSource::Path => &mut self.path_params,
            ParamSource::Query => &mut self.query_params,
            ParamSource::Body => &mut self.body_params,
            ParamSource::Form => &mut self.form_params,
        };
        *slot = Some(errors);
    }

    /// Only the populated buckets, keyed by report name.
    #[must_use]
    pub fn to_dict(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }
}

impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for source in [
            ParamSource::Body,
            ParamSource::Form,
            ParamSource::Path,
            ParamSource::Query,
        ] {
            if let Some(errors) = self.errors_for(source) {
                map.serialize_entry(source.report_key(), errors)?;
            }
        }
        map.end()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failing: Vec<&str> = [
            ParamSource::Path,
            ParamSource::Query,
            ParamSource::Body,
            ParamSource::Form,
        ]
        .into_iter()
        .filter(|s| self.errors_for(*s).is_some())
        .map(ParamSource::report_key)
        .collect();
        write!(f, "request validation failed for {}", failing.join(", "))
    }
}

impl std::error::Error for ValidationError {}

/// A schema that could not be turned into a compiled validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub schema: String,
    pub message: String,
}

impl SchemaError {
    pub fn new(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema '{}' is invalid: {}", self.schema, self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Route registration error, detected once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteConfigError {
    /// Both the route options and the handler signature name a schema for the same
    /// source, and neither schema extends the other.
    UnrelatedSchemas {
        source: ParamSource,
        configured: String,
        declared: String,
    },
    /// A path parameter annotation could not be compiled.
    Schema(SchemaError),
}

impl fmt::Display for RouteConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteConfigError::UnrelatedSchemas {
                source,
                configured,
                declared,
            } => write!(
                f,
                "route configuration error: {} schema '{}' and handler schema '{}' are unrelated; \
                 one must extend the other",
                source.arg_name(),
                configured,
                declared
            ),
            RouteConfigError::Schema(err) => write!(f, "route configuration error: {err}"),
        }
    }
}

impl std::error::Error for RouteConfigError {}

impl From<SchemaError> for RouteConfigError {
    fn from(err: SchemaError) -> Self {
        RouteConfigError::Schema(err)
    }
}

/// Failure to turn a Rust model into a validated instance.
#[derive(Debug)]
pub enum ModelError {
    Serialize(serde_json::Error),
    Invalid(Vec<ErrorRecord>),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Serialize(err) => write!(f, "model could not be serialized: {err}"),
            ModelError::Invalid(errors) => {
                let fields: Vec<String> = errors.iter().map(ErrorRecord::location).collect();
                write!(f, "model does not satisfy its schema at: {}", fields.join(", "))
            }
        }
    }
}

impl std::error::Error for ModelError {}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialize(err)
    }
}

/// Hard failures that stop the pipeline and propagate to the transport layer.
#[derive(Debug)]
pub enum PipelineError {
    /// Aggregated validation report, raised because the configuration asks for it.
    Validation(ValidationError),
    /// The body could not be parsed although the content type announced JSON
    /// (or multipart form data for form sources).
    JsonBodyParsing { source: ParamSource, detail: String },
    /// `response_many` was requested but the handler did not return a list of
    /// validated instances. This is a handler bug, never a client error.
    InvalidIterableOfModels { returned: String },
    /// The handler itself failed.
    Handler(anyhow::Error),
}

impl PipelineError {
    /// Status code a transport adapter should use when it has no better policy.
    #[must_use]
    pub fn status_hint(&self) -> u16 {
        match self {
            PipelineError::Validation(_) | PipelineError::JsonBodyParsing { .. } => 400,
            PipelineError::InvalidIterableOfModels { .. } | PipelineError::Handler(_) => 500,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Validation(err) => write!(f, "{err}"),
            PipelineError::JsonBodyParsing {
                source: ParamSource::Form,
                detail,
            } => write!(f, "Failed to decode form data: {detail}"),
            PipelineError::JsonBodyParsing { detail, .. } => {
                write!(f, "Failed to decode JSON object: {detail}")
            }
            PipelineError::InvalidIterableOfModels { returned } => write!(
                f,
                "response_many requires the handler to return a list of models, got {returned}"
            ),
            PipelineError::Handler(err) => write!(f, "handler failed: {err}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Validation(err) => Some(err),
            PipelineError::Handler(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<ValidationError> for PipelineError {
    fn from(err: ValidationError) -> Self {
        PipelineError::Validation(err)
    }
}

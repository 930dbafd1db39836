use crate::error::{ParamSource, RouteConfigError};
use crate::schema::Schema;
use std::sync::Arc;

/// Type the handler declares for its `query`, `body` or `form` parameter.
#[derive(Debug, Clone)]
pub enum Annotation {
    /// A concrete schema.
    Schema(Arc<Schema>),
    /// A generic placeholder, optionally bounded by a schema.
    TypeVar {
        name: String,
        bound: Option<Arc<Schema>>,
    },
}

impl Annotation {
    #[must_use]
    pub fn schema(schema: &Arc<Schema>) -> Self {
        Annotation::Schema(Arc::clone(schema))
    }

    #[must_use]
    pub fn type_var(name: impl Into<String>) -> Self {
        Annotation::TypeVar {
            name: name.into(),
            bound: None,
        }
    }

    #[must_use]
    pub fn bounded_type_var(name: impl Into<String>, bound: &Arc<Schema>) -> Self {
        Annotation::TypeVar {
            name: name.into(),
            bound: Some(Arc::clone(bound)),
        }
    }

    /// Schema this annotation resolves to; `None` for an unbound placeholder.
    #[must_use]
    pub fn concrete(&self) -> Option<&Arc<Schema>> {
        match self {
            Annotation::Schema(schema) => Some(schema),
            Annotation::TypeVar { bound, .. } => bound.as_ref(),
        }
    }
}

/// Outcome of schema source selection for one source.
#[derive(Debug, Clone, Default)]
pub struct SourceBinding {
    /// Effective schema; `None` means the source is not validated
    pub schema: Option<Arc<Schema>>,
    /// Whether the resolved value is passed to the handler as an argument
    pub inject: bool,
}

/// Decide the effective schema of one source.
///
/// The handler annotation wins when it is concrete and the route options name no
/// schema. When both are present, the more specific one (the subtype) wins; two
/// unrelated schemas are rejected.
pub fn select_schema(
    source: ParamSource,
    configured: Option<&Arc<Schema>>,
    declared: Option<&Annotation>,
) -> Result<SourceBinding, RouteConfigError> {
    let inject = declared.is_some();
    let from_signature = declared.and_then(Annotation::concrete);

    let schema = match (configured, from_signature) {
        (None, None) => None,
        (Some(schema), None) | (None, Some(schema)) => Some(Arc::clone(schema)),
        (Some(configured), Some(declared)) => {
            if declared.is_subtype_of(configured) {
                Some(Arc::clone(declared))
            } else if configured.is_subtype_of(declared) {
                Some(Arc::clone(configured))
            } else {
                return Err(RouteConfigError::UnrelatedSchemas {
                    source,
                    configured: configured.name().to_string(),
                    declared: declared.name().to_string(),
                });
            }
        }
    };

    Ok(SourceBinding { schema, inject })
}

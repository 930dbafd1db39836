use crate::error::{ErrorRecord, Loc, SchemaError};
use crate::schema::{Adapter, FieldType};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Path-derived keyword arguments, keyed by parameter name.
pub type PathArgs = BTreeMap<String, Value>;

/// Handler parameter names that never denote path parameters.
pub const RESERVED_PARAM_NAMES: [&str; 4] = ["query", "body", "form", "return"];

/// A path parameter declared by the handler, optionally typed.
#[derive(Debug, Clone)]
pub struct PathParam {
    name: String,
    adapter: Option<Adapter>,
}

impl PathParam {
    /// A parameter validated and coerced to `ty`.
    pub fn typed(name: impl Into<String>, ty: FieldType) -> Result<Self, SchemaError> {
        let name = name.into();
        let adapter = Adapter::new(name.clone(), ty)?;
        Ok(Self {
            name,
            adapter: Some(adapter),
        })
    }

    /// A parameter without a usable annotation; passed through unchanged.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            adapter: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_reserved(&self) -> bool {
        RESERVED_PARAM_NAMES.contains(&self.name.as_str())
    }
}

/// Validate the declared path parameters present in `args`.
///
/// Successful values replace the raw argument; a failure leaves the raw value in
/// place and yields one record located at `[name]`.
pub fn validate_path_params(params: &[PathParam], args: &mut PathArgs) -> Vec<ErrorRecord> {
    let mut errors = Vec::new();
    for param in params {
        if param.is_reserved() {
            continue;
        }
        let Some(adapter) = &param.adapter else {
            continue;
        };
        let Some(raw) = args.get(&param.name) else {
            continue;
        };
        match adapter.adapt(raw.clone()) {
            Ok(value) => {
                args.insert(param.name.clone(), value);
            }
            Err(mut record) => {
                debug!(param = %param.name, error = %record.msg, "Path parameter rejected");
                record.loc = vec![Loc::field(param.name.clone())];
                errors.push(record);
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_param_is_coerced() {
        let params = vec![PathParam::typed("character_id", FieldType::Integer).unwrap()];
        let mut args = PathArgs::from([("character_id".to_string(), json!("2"))]);
        assert!(validate_path_params(&params, &mut args).is_empty());
        assert_eq!(args["character_id"], json!(2));
    }

    #[test]
    fn test_failure_keeps_raw_value() {
        let params = vec![PathParam::typed("character_id", FieldType::Integer).unwrap()];
        let mut args = PathArgs::from([("character_id".to_string(), json!("abc"))]);
        let errors = validate_path_params(&params, &mut args);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].loc, vec![Loc::field("character_id")]);
        assert_eq!(args["character_id"], json!("abc"));
    }

    #[test]
    fn test_untyped_reserved_and_absent_are_skipped() {
        let params = vec![
            PathParam::untyped("slug"),
            PathParam::typed("body", FieldType::Integer).unwrap(),
            PathParam::typed("missing", FieldType::Integer).unwrap(),
        ];
        let mut args = PathArgs::from([
            ("slug".to_string(), json!("x")),
            ("body".to_string(), json!("not-a-number")),
        ]);
        assert!(validate_path_params(&params, &mut args).is_empty());
        assert_eq!(args["slug"], json!("x"));
        assert!(!args.contains_key("missing"));
    }
}

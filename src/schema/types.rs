use super::Schema;
use serde_json::{json, Map, Number, Value};
use std::fmt;
use std::sync::Arc;

/// Declared type of a field or of a root-value schema.
#[derive(Debug, Clone)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// Any JSON value, no type check
    Any,
    Array(Box<FieldType>),
    /// The inner type or `null`
    Optional(Box<FieldType>),
    /// Object with arbitrary keys and uniformly typed values
    Map(Box<FieldType>),
    /// Nested record
    Model(Arc<Schema>),
}

impl FieldType {
    pub fn array(items: FieldType) -> Self {
        FieldType::Array(Box::new(items))
    }

    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    pub fn map(values: FieldType) -> Self {
        FieldType::Map(Box::new(values))
    }

    pub fn model(schema: &Arc<Schema>) -> Self {
        FieldType::Model(Arc::clone(schema))
    }

    /// Whether values of this type are collected from every occurrence of a
    /// multi-valued key rather than from the last one.
    #[must_use]
    pub fn is_list(&self) -> bool {
        match self {
            FieldType::Array(_) => true,
            FieldType::Optional(inner) => inner.is_list(),
            _ => false,
        }
    }

    /// JSON Schema fragment for this type.
    #[must_use]
    pub fn json_schema(&self) -> Value {
        match self {
            FieldType::String => json!({"type": "string"}),
            FieldType::Integer => json!({"type": "integer"}),
            FieldType::Number => json!({"type": "number"}),
            FieldType::Boolean => json!({"type": "boolean"}),
            FieldType::Any => json!({}),
            FieldType::Array(items) => json!({"type": "array", "items": items.json_schema()}),
            FieldType::Optional(inner) => json!({"anyOf": [inner.json_schema(), {"type": "null"}]}),
            FieldType::Map(values) => {
                json!({"type": "object", "additionalProperties": values.json_schema()})
            }
            FieldType::Model(schema) => schema.document().clone(),
        }
    }

    /// Lax coercion of wire values towards this type.
    ///
    /// Query strings, form fields and path segments arrive as strings; numeric and boolean
    /// fields accept their textual form. Values that cannot be converted are returned
    /// unchanged so that validation reports the mismatch.
    #[must_use]
    pub fn coerce(&self, value: Value) -> Value {
        match (self, value) {
            (FieldType::Integer, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::String(s),
            },
            // JSON Schema counts 2.0 as an integer; store it as one
            (FieldType::Integer, Value::Number(n)) => match n.as_f64().and_then(whole_number) {
                Some(i) if !n.is_i64() && !n.is_u64() => Value::from(i),
                _ => Value::Number(n),
            },
            (FieldType::Number, Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(n) => Number::from_f64(n).map(Value::Number).unwrap_or(Value::String(s)),
                Err(_) => Value::String(s),
            },
            (FieldType::Boolean, Value::String(s)) => match parse_bool(&s) {
                Some(b) => Value::Bool(b),
                None => Value::String(s),
            },
            (FieldType::Array(items), Value::Array(values)) => {
                Value::Array(values.into_iter().map(|v| items.coerce(v)).collect())
            }
            (FieldType::Optional(_), Value::Null) => Value::Null,
            (FieldType::Optional(inner), other) => inner.coerce(other),
            (FieldType::Map(values), Value::Object(entries)) => Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, values.coerce(v)))
                    .collect(),
            ),
            (FieldType::Model(schema), other) => schema.prepare(other),
            (_, other) => other,
        }
    }

    /// Render a validated value for a response.
    pub(crate) fn render(&self, value: &Value, exclude_none: bool, by_alias: bool) -> Value {
        match (self, value) {
            (FieldType::Model(schema), _) => schema.render(value, exclude_none, by_alias),
            (FieldType::Array(items), Value::Array(values)) => Value::Array(
                values
                    .iter()
                    .map(|v| items.render(v, exclude_none, by_alias))
                    .collect(),
            ),
            (FieldType::Optional(_), Value::Null) => Value::Null,
            (FieldType::Optional(inner), _) => inner.render(value, exclude_none, by_alias),
            (FieldType::Map(values), Value::Object(entries)) => {
                let mut out = Map::new();
                for (k, v) in entries {
                    if exclude_none && v.is_null() {
                        continue;
                    }
                    out.insert(k.clone(), values.render(v, exclude_none, by_alias));
                }
                Value::Object(out)
            }
            (FieldType::Any, _) if exclude_none => strip_nulls(value),
            _ => value.clone(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => f.write_str("string"),
            FieldType::Integer => f.write_str("integer"),
            FieldType::Number => f.write_str("number"),
            FieldType::Boolean => f.write_str("boolean"),
            FieldType::Any => f.write_str("any"),
            FieldType::Array(items) => write!(f, "list[{items}]"),
            FieldType::Optional(inner) => write!(f, "optional[{inner}]"),
            FieldType::Map(values) => write!(f, "map[string, {values}]"),
            FieldType::Model(schema) => f.write_str(schema.name()),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "y" | "t" => Some(true),
        "false" | "0" | "no" | "off" | "n" | "f" => Some(false),
        _ => None,
    }
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(entries) => Value::Object(
            entries
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        Value::Array(values) => Value::Array(values.iter().map(strip_nulls).collect()),
        other => other.clone(),
    }
}

/// Declaration of one record field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Canonical field name
    pub name: String,
    pub ty: FieldType,
    /// Value used when the field is absent; `None` makes the field required
    pub default: Option<Value>,
    /// Alternative key accepted on input and emitted when serializing by alias
    pub alias: Option<String>,
    /// Extra JSON Schema keywords merged into the property (`minimum`, `pattern`, ...)
    pub constraints: Map<String, Value>,
}

impl FieldSpec {
    /// A field that must be present.
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            alias: None,
            constraints: Map::new(),
        }
    }

    /// A nullable field defaulting to `null`.
    pub fn optional(name: impl Into<String>, inner: FieldType) -> Self {
        Self {
            default: Some(Value::Null),
            ..Self::required(name, FieldType::optional(inner))
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn constraint(mut self, keyword: impl Into<String>, value: Value) -> Self {
        self.constraints.insert(keyword.into(), value);
        self
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// Key under which the field is emitted.
    #[must_use]
    pub fn output_key(&self, by_alias: bool) -> &str {
        match (&self.alias, by_alias) {
            (Some(alias), true) => alias,
            _ => &self.name,
        }
    }

    /// Whether `key` names this field on input.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.name == key || self.alias.as_deref() == Some(key)
    }

    pub(crate) fn property_schema(&self) -> Value {
        let mut property = self.ty.json_schema();
        if let Value::Object(ref mut obj) = property {
            for (k, v) in &self.constraints {
                obj.insert(k.clone(), v.clone());
            }
        }
        property
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn whole_number(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then(|| f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_list_through_optional() {
        assert!(FieldType::array(FieldType::String).is_list());
        assert!(FieldType::optional(FieldType::array(FieldType::Integer)).is_list());
        assert!(!FieldType::optional(FieldType::String).is_list());
        assert!(!FieldType::Integer.is_list());
    }

    #[test]
    fn test_coerce_scalars() {
        assert_eq!(FieldType::Integer.coerce(json!("42")), json!(42));
        assert_eq!(FieldType::Integer.coerce(json!("limit")), json!("limit"));
        assert_eq!(FieldType::Number.coerce(json!("1.5")), json!(1.5));
        assert_eq!(FieldType::Boolean.coerce(json!("TRUE")), json!(true));
        assert_eq!(FieldType::Boolean.coerce(json!("off")), json!(false));
        assert_eq!(FieldType::String.coerce(json!(7)), json!(7));
    }

    #[test]
    fn test_coerce_whole_float_to_integer() {
        let coerced = FieldType::Integer.coerce(json!(2.0));
        assert!(coerced.is_i64());
        assert_eq!(coerced, json!(2));
        assert_eq!(FieldType::Integer.coerce(json!(2.5)), json!(2.5));
        assert_eq!(FieldType::Integer.coerce(json!(u64::MAX)), json!(u64::MAX));
        let optional = FieldType::optional(FieldType::Integer);
        assert_eq!(optional.coerce(json!(35.0)), json!(35));
    }

    #[test]
    fn test_coerce_nested_containers() {
        let ty = FieldType::optional(FieldType::array(FieldType::Integer));
        assert_eq!(ty.coerce(json!(["1", "2", "x"])), json!([1, 2, "x"]));
        assert_eq!(ty.coerce(Value::Null), Value::Null);
        let map = FieldType::map(FieldType::Boolean);
        assert_eq!(map.coerce(json!({"a": "yes"})), json!({"a": true}));
    }

    #[test]
    fn test_property_schema_merges_constraints() {
        let field = FieldSpec::required("views", FieldType::Integer).constraint("minimum", json!(0));
        assert_eq!(
            field.property_schema(),
            json!({"type": "integer", "minimum": 0})
        );
    }

    #[test]
    fn test_display() {
        let ty = FieldType::optional(FieldType::array(FieldType::Integer));
        assert_eq!(ty.to_string(), "optional[list[integer]]");
    }

    #[test]
    fn test_output_key() {
        let field = FieldSpec::required("result_of_addition", FieldType::Integer)
            .with_alias("resultOfAddition");
        assert_eq!(field.output_key(false), "result_of_addition");
        assert_eq!(field.output_key(true), "resultOfAddition");
        assert!(field.matches("resultOfAddition"));
        assert!(field.matches("result_of_addition"));
    }
}

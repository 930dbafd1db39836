use crate::request::MultiMap;
use crate::schema::Schema;
use serde_json::{Map, Value};

/// Flatten a multi-valued mapping according to the schema's field types.
///
/// List-typed fields receive every raw value in order; every other key keeps its
/// last value. Keys the schema does not declare pass through as plain strings.
/// Nothing is rejected here; the schema reports type and shape problems.
#[must_use]
pub fn normalize_query(raw: &MultiMap, schema: &Schema) -> Map<String, Value> {
    let mut out = Map::new();
    for key in raw.keys() {
        let value = if schema.is_list_field(key) {
            Value::Array(
                raw.get_all(key)
                    .into_iter()
                    .map(|v| Value::String(v.to_string()))
                    .collect(),
            )
        } else {
            match raw.get_last(key) {
                Some(v) => Value::String(v.to_string()),
                None => continue,
            }
        };
        out.insert(key.to_string(), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType};
    use serde_json::json;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Schema::record("QueryModel")
            .field(FieldSpec::required("arr1", FieldType::array(FieldType::String)))
            .field(FieldSpec::optional("tags", FieldType::array(FieldType::Integer)))
            .field(FieldSpec::required("limit", FieldType::Integer))
            .build()
            .unwrap()
    }

    #[test]
    fn test_list_fields_keep_every_value_in_order() {
        let raw: MultiMap = vec![("arr1", "first"), ("arr1", "second"), ("tags", "3")]
            .into_iter()
            .collect();
        let out = normalize_query(&raw, &schema());
        assert_eq!(out["arr1"], json!(["first", "second"]));
        assert_eq!(out["tags"], json!(["3"]));
    }

    #[test]
    fn test_scalar_fields_take_last_value() {
        let raw: MultiMap = vec![("limit", "1"), ("limit", "5")].into_iter().collect();
        let out = normalize_query(&raw, &schema());
        assert_eq!(out["limit"], json!("5"));
    }

    #[test]
    fn test_unknown_keys_pass_through_and_absent_lists_stay_absent() {
        let raw: MultiMap = vec![("other", "x")].into_iter().collect();
        let out = normalize_query(&raw, &schema());
        assert_eq!(out.get("other"), Some(&json!("x")));
        assert!(!out.contains_key("arr1"));
    }
}

use super::types::{FieldSpec, FieldType};
use crate::error::{ErrorRecord, Loc, ModelError, SchemaError};
use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError as EngineError, Validator};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Shape of a schema: a record of named fields, or a bare value.
#[derive(Debug, Clone)]
pub enum SchemaKind {
    Record(Vec<FieldSpec>),
    RootValue(FieldType),
}

/// Immutable, compiled description of a record type or a root value.
///
/// Schemas are declared once at startup and shared between requests through `Arc`.
/// The JSON Schema document is generated from the declaration and compiled with
/// `jsonschema` when the schema is built, never per request.
pub struct Schema {
    name: String,
    kind: SchemaKind,
    parent: Option<Arc<Schema>>,
    forbid_extra: bool,
    document: Value,
    validator: Validator,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .field("forbid_extra", &self.forbid_extra)
            .finish()
    }
}

impl Schema {
    /// Start declaring a record schema.
    pub fn record(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            parent: None,
            forbid_extra: false,
        }
    }

    /// Start declaring a record schema that extends `parent`.
    ///
    /// The parent's fields are inherited; redeclaring a field replaces it.
    /// The result is a subtype of `parent` for schema source selection.
    pub fn extend(name: impl Into<String>, parent: &Arc<Schema>) -> SchemaBuilder {
        let fields = match &parent.kind {
            SchemaKind::Record(fields) => fields.clone(),
            SchemaKind::RootValue(_) => Vec::new(),
        };
        SchemaBuilder {
            name: name.into(),
            fields,
            parent: Some(Arc::clone(parent)),
            forbid_extra: parent.forbid_extra,
        }
    }

    /// Build a root-value schema validating a bare value of type `ty`.
    pub fn root(name: impl Into<String>, ty: FieldType) -> Result<Arc<Schema>, SchemaError> {
        let name = name.into();
        let document = ty.json_schema();
        let validator = compile(&name, &document)?;
        Ok(Arc::new(Schema {
            name,
            kind: SchemaKind::RootValue(ty),
            parent: None,
            forbid_extra: false,
            document,
            validator,
        }))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Generated JSON Schema document.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Whether this schema validates a bare value rather than a field mapping.
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self.kind, SchemaKind::RootValue(_))
    }

    /// Declared fields; empty for root-value schemas.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        match &self.kind {
            SchemaKind::Record(fields) => fields,
            SchemaKind::RootValue(_) => &[],
        }
    }

    /// Field declared under `key`, either by canonical name or by alias.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        let fields = self.fields();
        fields
            .iter()
            .find(|f| f.name == key)
            .or_else(|| fields.iter().find(|f| f.matches(key)))
    }

    /// Whether `key` is declared list-typed (directly or through an optional wrapper).
    #[must_use]
    pub fn is_list_field(&self, key: &str) -> bool {
        self.field(key).is_some_and(|f| f.ty.is_list())
    }

    /// Whether this schema is `other` or (transitively) extends it.
    #[must_use]
    pub fn is_subtype_of(&self, other: &Schema) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        let mut current = self.parent.as_deref();
        while let Some(schema) = current {
            if std::ptr::eq(schema, other) {
                return true;
            }
            current = schema.parent.as_deref();
        }
        false
    }

    /// Normalize raw input before validation: alias keys are renamed to canonical
    /// names, absent fields receive their defaults, and values are coerced towards
    /// their declared type.
    #[must_use]
    pub fn prepare(&self, input: Value) -> Value {
        match &self.kind {
            SchemaKind::RootValue(ty) => ty.coerce(input),
            SchemaKind::Record(fields) => {
                let Value::Object(raw) = input else {
                    return input;
                };
                let mut out = Map::new();
                for (key, value) in raw {
                    match fields.iter().find(|f| f.matches(&key)) {
                        Some(field) if field.name != key => {
                            // canonical key wins when both spellings are supplied
                            if !out.contains_key(&field.name) {
                                out.insert(field.name.clone(), value);
                            }
                        }
                        _ => {
                            out.insert(key, value);
                        }
                    }
                }
                for field in fields {
                    match out.remove(&field.name) {
                        Some(value) => {
                            out.insert(field.name.clone(), field.ty.coerce(value));
                        }
                        None => {
                            if let Some(default) = &field.default {
                                out.insert(field.name.clone(), default.clone());
                            }
                        }
                    }
                }
                Value::Object(out)
            }
        }
    }

    /// Prepare and validate `input`, returning the normalized value or one
    /// error record per failure reported by the engine.
    pub fn validate_value(&self, input: Value) -> Result<Value, Vec<ErrorRecord>> {
        let prepared = self.prepare(input);
        let errors: Vec<ErrorRecord> = self
            .validator
            .iter_errors(&prepared)
            .flat_map(|e| engine_error_to_records(&e))
            .collect();
        if errors.is_empty() {
            Ok(prepared)
        } else {
            debug!(
                schema = %self.name,
                error_count = errors.len(),
                "Schema validation failed"
            );
            Err(errors)
        }
    }

    /// Render a validated value, optionally dropping `null` fields and emitting aliases.
    #[must_use]
    pub fn render(&self, value: &Value, exclude_none: bool, by_alias: bool) -> Value {
        match &self.kind {
            SchemaKind::RootValue(ty) => ty.render(value, exclude_none, by_alias),
            SchemaKind::Record(fields) => {
                let Value::Object(entries) = value else {
                    return value.clone();
                };
                let mut out = Map::new();
                for (key, v) in entries {
                    if exclude_none && v.is_null() {
                        continue;
                    }
                    match fields.iter().find(|f| &f.name == key) {
                        Some(field) => {
                            out.insert(
                                field.output_key(by_alias).to_string(),
                                field.ty.render(v, exclude_none, by_alias),
                            );
                        }
                        None => {
                            out.insert(key.clone(), v.clone());
                        }
                    }
                }
                Value::Object(out)
            }
        }
    }
}

/// Builder for record schemas.
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
    parent: Option<Arc<Schema>>,
    forbid_extra: bool,
}

impl SchemaBuilder {
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.retain(|f| f.name != field.name);
        self.fields.push(field);
        self
    }

    /// Reject keys that are not declared fields.
    #[must_use]
    pub fn forbid_extra(mut self) -> Self {
        self.forbid_extra = true;
        self
    }

    pub fn build(self) -> Result<Arc<Schema>, SchemaError> {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            properties.insert(field.name.clone(), field.property_schema());
            if field.is_required() {
                required.push(Value::String(field.name.clone()));
            }
        }
        let mut document = json!({
            "title": self.name,
            "type": "object",
            "properties": properties,
            "required": required,
        });
        if self.forbid_extra {
            document["additionalProperties"] = Value::Bool(false);
        }
        let validator = compile(&self.name, &document)?;
        Ok(Arc::new(Schema {
            name: self.name,
            kind: SchemaKind::Record(self.fields),
            parent: self.parent,
            forbid_extra: self.forbid_extra,
            document,
            validator,
        }))
    }
}

fn compile(name: &str, document: &Value) -> Result<Validator, SchemaError> {
    jsonschema::validator_for(document).map_err(|e| SchemaError::new(name, e.to_string()))
}

/// Construct a validated instance of `schema` from a raw value.
pub fn construct(schema: &Arc<Schema>, input: Value) -> Result<Instance, Vec<ErrorRecord>> {
    let value = schema.validate_value(input)?;
    Ok(Instance {
        schema: Arc::clone(schema),
        value,
    })
}

/// A value that passed validation against its schema.
#[derive(Debug, Clone)]
pub struct Instance {
    schema: Arc<Schema>,
    value: Value,
}

impl Instance {
    /// Serialize a Rust model and validate it against the model's schema.
    pub fn from_model<M: Model>(model: &M) -> Result<Self, ModelError> {
        let value = serde_json::to_value(model)?;
        construct(&M::schema(), value).map_err(ModelError::Invalid)
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Field by canonical name.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    /// Deserialize into a typed model.
    pub fn to_model<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.value)
    }

    /// Response rendering of this instance.
    #[must_use]
    pub fn render(&self, exclude_none: bool, by_alias: bool) -> Value {
        self.schema.render(&self.value, exclude_none, by_alias)
    }
}

/// A Rust type bound to a schema.
///
/// Implementors serialize with canonical field names; aliases are applied by the
/// schema when rendering responses.
pub trait Model: Serialize + DeserializeOwned {
    fn schema() -> Arc<Schema>;
}

/// Single-value adapter used for path parameters.
///
/// Wraps a compiled root-value schema over one declared type.
#[derive(Debug, Clone)]
pub struct Adapter {
    schema: Arc<Schema>,
}

impl Adapter {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Result<Self, SchemaError> {
        Ok(Self {
            schema: Schema::root(name, ty)?,
        })
    }

    /// Coerce and validate one value, returning the first failure.
    pub fn adapt(&self, value: Value) -> Result<Value, ErrorRecord> {
        self.schema.validate_value(value).map_err(|mut errors| {
            if errors.is_empty() {
                ErrorRecord::new(Vec::new(), "invalid value", "value_error")
            } else {
                errors.swap_remove(0)
            }
        })
    }
}

fn engine_error_to_records(error: &EngineError<'_>) -> Vec<ErrorRecord> {
    let loc = pointer_to_loc(error.instance_path.as_str());
    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| property.to_string());
            let mut loc = loc;
            loc.push(Loc::Field(name));
            vec![ErrorRecord::new(loc, "Field required", "missing")]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|key| {
                let mut loc = loc.clone();
                loc.push(Loc::field(key.clone()));
                ErrorRecord::new(loc, "Extra inputs are not permitted", "extra_forbidden")
            })
            .collect(),
        _ => {
            let keyword = error
                .schema_path
                .as_str()
                .rsplit('/')
                .next()
                .filter(|k| !k.is_empty())
                .unwrap_or("value_error")
                .to_string();
            vec![ErrorRecord::new(loc, error.to_string(), keyword)]
        }
    }
}

/// Split a JSON pointer into location segments.
pub(crate) fn pointer_to_loc(pointer: &str) -> Vec<Loc> {
    pointer
        .split('/')
        .skip(1)
        .map(|segment| {
            let segment = segment.replace("~1", "/").replace("~0", "~");
            match segment.parse::<usize>() {
                Ok(idx) => Loc::Index(idx),
                Err(_) => Loc::Field(segment),
            }
        })
        .collect()
}

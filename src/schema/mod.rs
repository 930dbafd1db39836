//! # Schema Module
//!
//! Declarative record and root-value schemas backed by compiled JSON Schema validators.
//!
//! ## Overview
//!
//! A [`Schema`] describes either a record (named fields with a type, an optional default
//! and an optional alias) or a bare root value such as a top-level list. Declarations are
//! turned into a JSON Schema document and compiled once with `jsonschema`; requests only
//! run the compiled validator.
//!
//! ```rust
//! use brrtvalidate::schema::{construct, FieldSpec, FieldType, Schema};
//! use serde_json::json;
//!
//! let query = Schema::record("QueryModel")
//!     .field(FieldSpec::required("limit", FieldType::Integer))
//!     .field(FieldSpec::optional("min_views", FieldType::Integer))
//!     .build()
//!     .unwrap();
//!
//! let instance = construct(&query, json!({"limit": "2"})).unwrap();
//! assert_eq!(instance.get("limit"), Some(&json!(2)));
//! assert_eq!(instance.get("min_views"), Some(&json!(null)));
//! ```
//!
//! ## Construction
//!
//! [`construct`] renames alias keys to canonical names, fills defaults, coerces textual
//! scalars towards their declared type, then validates. Every validator failure becomes
//! one [`ErrorRecord`](crate::error::ErrorRecord).
//!
//! ## Typed access
//!
//! Rust types implementing [`Model`] bind a `serde` struct to its schema so handlers can
//! read validated input as typed values and reply with typed values.

mod core;
mod types;

pub use self::core::{construct, Adapter, Instance, Model, Schema, SchemaBuilder, SchemaKind};
pub use types::{FieldSpec, FieldType};

//! # Pipeline Module
//!
//! Parameter resolution, validation dispatch and reply serialization for one route.
//!
//! ## Overview
//!
//! A [`Route`] is registered once with [`ValidateOptions`] (the schemas and switches
//! configured for the route) and a [`HandlerSignature`] (the sources the handler itself
//! declares). Registration selects the effective schema of every source and fails with
//! a [`RouteConfigError`](crate::error::RouteConfigError) when the two disagree.
//!
//! Per request, [`Pipeline::run`] walks the stages in order:
//!
//! ```text
//! Start -> PathValidated -> QueryValidated -> BodyValidated -> FormValidated
//!       -> ErrorResponse | HandlerInvoked -> ResponseBuilt
//! ```
//!
//! Every stage runs regardless of earlier failures so the report lists all failing
//! sources at once. A content type that does not fit the body or form source ends the
//! run immediately with a 415 response.
//!
//! ## Example
//!
//! ```rust
//! use brrtvalidate::config::ValidationConfig;
//! use brrtvalidate::pipeline::{HandlerSignature, PathArgs, Pipeline, Reply, Route, ValidateOptions};
//! use brrtvalidate::request::RawRequest;
//! use brrtvalidate::schema::{FieldSpec, FieldType, Schema};
//! use http::Method;
//! use serde_json::json;
//!
//! let query = Schema::record("Query")
//!     .field(FieldSpec::required("limit", FieldType::Integer))
//!     .build()
//!     .unwrap();
//! let route = Route::new(
//!     "list",
//!     &ValidateOptions::new().query(&query),
//!     &HandlerSignature::new(),
//!     |ctx, _args| {
//!         let limit = ctx.query_params.as_ref().and_then(|q| q.get("limit")).cloned();
//!         Ok(Reply::Json(json!({ "limit": limit })))
//!     },
//! )
//! .unwrap();
//!
//! let pipeline = Pipeline::new(ValidationConfig::default());
//! let ok = pipeline
//!     .run(&route, &RawRequest::new(Method::GET, "/?limit=3"), PathArgs::new())
//!     .unwrap();
//! assert_eq!(ok.body, json!({"limit": 3}));
//!
//! let bad = pipeline
//!     .run(&route, &RawRequest::new(Method::GET, "/?limit=x"), PathArgs::new())
//!     .unwrap();
//! assert_eq!(bad.status, 400);
//! ```

mod body;
mod core;
mod path;
mod query;
mod report;
mod response;
mod route;
mod selector;

pub use self::core::{HandlerArgs, Pipeline, PipelineState, RequestContext};
pub use body::{expected_media_type, resolve_body, resolve_form, Params, Resolution};
pub use path::{validate_path_params, PathArgs, PathParam, RESERVED_PARAM_NAMES};
pub use query::normalize_query;
pub use report::{decide, Decision, ValidationReport};
pub use response::{
    serialize_reply, unsupported_media_type, HeaderVec, Reply, ReplyOptions, Response, TupleItem,
    MAX_INLINE_HEADERS,
};
pub use route::{Handler, HandlerSignature, Route, RoutePlan, ValidateOptions};
pub use selector::{select_schema, Annotation, SourceBinding};

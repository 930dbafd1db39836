//! # brrtvalidate
//!
//! **brrtvalidate** validates the query string, JSON body, form data and path
//! parameters of an HTTP request against declared schemas before a route handler
//! runs, and serializes the handler's reply back into a JSON response.
//!
//! ## Overview
//!
//! Schemas are declared once at startup ([`schema`]) and compiled into JSON Schema
//! validators. Each route is registered with its validation options and the
//! parameters its handler declares ([`pipeline::Route`]); registration decides which
//! schema applies to every parameter source and rejects inconsistent declarations.
//! Per request the [`pipeline::Pipeline`] resolves and validates every source,
//! aggregates failures into one report, and either answers with a validation error
//! response, raises a [`error::ValidationError`], or calls the handler and
//! serializes what it returns.
//!
//! ## Architecture
//!
//! - **[`schema`]** - record and root-value schemas, construction, typed models
//! - **[`request`]** - the request boundary: multi-valued query/form maps, JSON decoding
//! - **[`pipeline`]** - parameter resolution, validation dispatch, reply serialization
//! - **[`router`]** - regex route table mapping method + path to routes
//! - **[`server`]** - `may_minihttp` service and coroutine HTTP server
//! - **[`config`]** - validation and runtime configuration (environment or YAML)
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`demo`]** - the demo routes served by the binary
//! - **[`cli`]** - command-line interface of the binary
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as server::AppService
//!     participant Router as router::Router
//!     participant Pipeline as pipeline::Pipeline
//!     participant Handler
//!
//!     Client->>Server: HTTP request
//!     Server->>Router: route(method, path)
//!     Router-->>Server: RouteMatch (route + raw path params)
//!     Server->>Pipeline: run(route, request, path args)
//!     Pipeline->>Pipeline: path -> query -> body -> form
//!     alt validation failed
//!         Pipeline-->>Server: {"validation_error": ...} or ValidationError
//!     else
//!         Pipeline->>Handler: call(ctx, args)
//!         Handler-->>Pipeline: Reply
//!         Pipeline->>Pipeline: serialize_reply
//!         Pipeline-->>Server: Response
//!     end
//!     Server-->>Client: HTTP response
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtvalidate::config::ValidationConfig;
//! use brrtvalidate::pipeline::{HandlerSignature, Pipeline, Reply, Route, ValidateOptions};
//! use brrtvalidate::request::RawRequest;
//! use brrtvalidate::router::Router;
//! use brrtvalidate::schema::{FieldSpec, FieldType, Schema};
//! use brrtvalidate::server::AppService;
//! use http::Method;
//! use serde_json::json;
//!
//! let body = Schema::record("Greeting")
//!     .field(FieldSpec::required("name", FieldType::String))
//!     .build()
//!     .unwrap();
//!
//! let mut router = Router::new();
//! router
//!     .add(
//!         Method::POST,
//!         "/hello",
//!         Route::new(
//!             "hello",
//!             &ValidateOptions::new().body(&body),
//!             &HandlerSignature::new(),
//!             |ctx, _args| {
//!                 let name = ctx
//!                     .body_params
//!                     .as_ref()
//!                     .and_then(|p| p.as_one())
//!                     .and_then(|b| b.get("name"))
//!                     .cloned();
//!                 Ok(Reply::Json(json!({ "hello": name })))
//!             },
//!         )
//!         .unwrap(),
//!     )
//!     .unwrap();
//!
//! let service = AppService::new(router, Pipeline::new(ValidationConfig::default()));
//! let request = RawRequest::new(Method::POST, "/hello").with_json(&json!({"name": "Geralt"}));
//! let response = service.handle(&request);
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body, json!({"hello": "Geralt"}));
//! ```
//!
//! ## Configuration
//!
//! Validation behaviour is configured through [`config::ValidationConfig`], loaded
//! from `BRRTV_VALIDATION_*` environment variables or the `validation:` section of a
//! YAML file, and passed to [`pipeline::Pipeline::new`]. Logging is configured with
//! `BRRTV_LOG_*` variables, see [`logging`].

pub mod cli;
pub mod config;
pub mod demo;
pub mod error;
pub mod ids;
pub mod logging;
pub mod pipeline;
pub mod request;
pub mod router;
pub mod schema;
pub mod server;

pub use error::{ErrorRecord, ParamSource, PipelineError, RouteConfigError, ValidationError};
pub use pipeline::{Pipeline, Reply, Route, ValidateOptions};

use super::body::{resolve_body, resolve_form, Params, Resolution};
use super::path::{validate_path_params, PathArgs};
use super::query::normalize_query;
use super::report::{decide, Decision, ValidationReport};
use super::response::{serialize_reply, unsupported_media_type, Response};
use super::route::{Route, RoutePlan};
use crate::config::ValidationConfig;
use crate::error::{ParamSource, PipelineError};
use crate::ids::RequestId;
use crate::request::RequestSource;
use crate::schema::{construct, Instance};
use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Stage a request has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    PathValidated,
    QueryValidated,
    BodyValidated,
    FormValidated,
    ErrorResponse,
    HandlerInvoked,
    ResponseBuilt,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Start => "start",
            PipelineState::PathValidated => "path_validated",
            PipelineState::QueryValidated => "query_validated",
            PipelineState::BodyValidated => "body_validated",
            PipelineState::FormValidated => "form_validated",
            PipelineState::ErrorResponse => "error_response",
            PipelineState::HandlerInvoked => "handler_invoked",
            PipelineState::ResponseBuilt => "response_built",
        };
        f.write_str(name)
    }
}

/// Per-request state threaded through every stage and handed to the handler.
///
/// Resolved parameter sets are always available here, whether or not the
/// handler also receives them as arguments.
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub route: String,
    /// Path arguments, coerced where validation succeeded
    pub path_args: PathArgs,
    pub query_params: Option<Instance>,
    pub body_params: Option<Params>,
    pub form_params: Option<Instance>,
    state: PipelineState,
    report: ValidationReport,
}

impl RequestContext {
    fn new(request_id: RequestId, route: &str, path_args: PathArgs) -> Self {
        Self {
            request_id,
            route: route.to_string(),
            path_args,
            query_params: None,
            body_params: None,
            form_params: None,
            state: PipelineState::Start,
            report: ValidationReport::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn advance(&mut self, state: PipelineState) {
        debug!(
            request_id = %self.request_id,
            route = %self.route,
            from = %self.state,
            to = %state,
            "Pipeline stage"
        );
        self.state = state;
    }
}

/// Arguments passed to the handler.
///
/// Path arguments are always present; `query`, `body` and `form` only when the
/// handler signature declares them.
#[derive(Debug, Clone, Default)]
pub struct HandlerArgs {
    pub path: PathArgs,
    pub query: Option<Instance>,
    pub body: Option<Params>,
    pub form: Option<Instance>,
}

impl HandlerArgs {
    fn from_context(ctx: &RequestContext, plan: &RoutePlan) -> Self {
        Self {
            path: ctx.path_args.clone(),
            query: plan.query.inject.then(|| ctx.query_params.clone()).flatten(),
            body: plan.body.inject.then(|| ctx.body_params.clone()).flatten(),
            form: plan.form.inject.then(|| ctx.form_params.clone()).flatten(),
        }
    }

    /// Typed query parameters.
    pub fn query_as<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        instance_as(self.query.as_ref(), "query")
    }

    /// Typed single-object body.
    pub fn body_as<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        instance_as(self.body.as_ref().and_then(Params::as_one), "body")
    }

    /// Typed many-object body.
    pub fn body_many_as<T: DeserializeOwned>(&self) -> anyhow::Result<Vec<T>> {
        let items = self
            .body
            .as_ref()
            .and_then(Params::as_many)
            .ok_or_else(|| anyhow!("handler did not receive a list body"))?;
        items
            .iter()
            .map(|i| i.to_model().context("body item does not match the requested type"))
            .collect()
    }

    /// Typed form parameters.
    pub fn form_as<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        instance_as(self.form.as_ref(), "form")
    }

    /// Typed path parameter.
    pub fn path_as<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .path
            .get(name)
            .ok_or_else(|| anyhow!("path parameter '{name}' is missing"))?;
        T::deserialize(value).with_context(|| format!("path parameter '{name}' has the wrong type"))
    }

    #[must_use]
    pub fn path(&self, name: &str) -> Option<&Value> {
        self.path.get(name)
    }
}

fn instance_as<T: DeserializeOwned>(instance: Option<&Instance>, source: &str) -> anyhow::Result<T> {
    instance
        .ok_or_else(|| anyhow!("handler did not receive '{source}'"))?
        .to_model()
        .with_context(|| format!("'{source}' does not match the requested type"))
}

/// The validation orchestrator.
///
/// Stateless across requests; one instance serves every route.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: ValidationConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Run a request through `route` with a fresh request id.
    pub fn run<R: RequestSource + ?Sized>(
        &self,
        route: &Route,
        request: &R,
        path_args: PathArgs,
    ) -> Result<Response, PipelineError> {
        self.run_with_id(route, request, path_args, RequestId::new())
    }

    /// Run a request through `route`.
    ///
    /// Every source is resolved before any decision so that all errors surface
    /// together; only a content-type mismatch short-circuits.
    ///
    /// # Errors
    ///
    /// Hard failures: malformed bodies, raised validation reports, handler errors
    /// and handler contract violations.
    pub fn run_with_id<R: RequestSource + ?Sized>(
        &self,
        route: &Route,
        request: &R,
        path_args: PathArgs,
        request_id: RequestId,
    ) -> Result<Response, PipelineError> {
        let plan = route.plan();
        let mut ctx = RequestContext::new(request_id, route.name(), path_args);

        self.validate_path(plan, &mut ctx);
        self.validate_query(plan, request, &mut ctx);
        if let Some(resp) = self.validate_body(plan, request, &mut ctx)? {
            return Ok(resp);
        }
        if let Some(resp) = self.validate_form(plan, request, &mut ctx)? {
            return Ok(resp);
        }

        let report = std::mem::take(&mut ctx.report);
        if !report.is_empty() {
            info!(
                request_id = %ctx.request_id,
                route = %ctx.route,
                sources = ?report.sources().map(ParamSource::report_key).collect::<Vec<_>>(),
                error_count = report.error_count(),
                "Request validation failed"
            );
        }
        match decide(report, &self.config) {
            Decision::Proceed => {}
            Decision::Respond(resp) => {
                ctx.advance(PipelineState::ErrorResponse);
                return Ok(resp);
            }
            Decision::Raise(err) => {
                ctx.advance(PipelineState::ErrorResponse);
                return Err(PipelineError::Validation(err));
            }
        }

        let args = HandlerArgs::from_context(&ctx, plan);
        let reply = route.handler().call(&ctx, args).map_err(|err| {
            warn!(request_id = %ctx.request_id, route = %ctx.route, error = %err, "Handler failed");
            PipelineError::Handler(err)
        })?;
        ctx.advance(PipelineState::HandlerInvoked);

        let response = serialize_reply(reply, &plan.reply).inspect_err(|err| {
            error!(request_id = %ctx.request_id, route = %ctx.route, error = %err, "Reply serialization failed");
        })?;
        ctx.advance(PipelineState::ResponseBuilt);
        Ok(response)
    }

    fn validate_path(&self, plan: &RoutePlan, ctx: &mut RequestContext) {
        let errors = validate_path_params(&plan.path_params, &mut ctx.path_args);
        ctx.report.record(ParamSource::Path, errors);
        ctx.advance(PipelineState::PathValidated);
    }

    fn validate_query<R: RequestSource + ?Sized>(
        &self,
        plan: &RoutePlan,
        request: &R,
        ctx: &mut RequestContext,
    ) {
        if let Some(schema) = &plan.query.schema {
            let fields = normalize_query(request.raw_query(), schema);
            match construct(schema, Value::Object(fields)) {
                Ok(instance) => ctx.query_params = Some(instance),
                Err(errors) => ctx.report.record(ParamSource::Query, errors),
            }
        }
        ctx.advance(PipelineState::QueryValidated);
    }

    fn validate_body<R: RequestSource + ?Sized>(
        &self,
        plan: &RoutePlan,
        request: &R,
        ctx: &mut RequestContext,
    ) -> Result<Option<Response>, PipelineError> {
        if let Some(schema) = &plan.body.schema {
            let resolution =
                resolve_body(schema, request, &plan.json_options, plan.request_body_many)?;
            if let Some(resp) = apply(resolution, ParamSource::Body, ctx) {
                return Ok(Some(resp));
            }
        }
        ctx.advance(PipelineState::BodyValidated);
        Ok(None)
    }

    fn validate_form<R: RequestSource + ?Sized>(
        &self,
        plan: &RoutePlan,
        request: &R,
        ctx: &mut RequestContext,
    ) -> Result<Option<Response>, PipelineError> {
        if let Some(schema) = &plan.form.schema {
            let resolution = resolve_form(schema, request)?;
            if let Some(resp) = apply(resolution, ParamSource::Form, ctx) {
                return Ok(Some(resp));
            }
        }
        ctx.advance(PipelineState::FormValidated);
        Ok(None)
    }
}

/// Store a resolution in the context; a media type mismatch yields the 415 response.
fn apply(resolution: Resolution, source: ParamSource, ctx: &mut RequestContext) -> Option<Response> {
    match resolution {
        Resolution::Resolved(params) => {
            match source {
                ParamSource::Form => ctx.form_params = params.as_one().cloned(),
                _ => ctx.body_params = Some(params),
            }
            None
        }
        Resolution::Invalid(errors) => {
            ctx.report.record(source, errors);
            None
        }
        Resolution::UnsupportedMediaType(content_type) => {
            info!(
                request_id = %ctx.request_id,
                route = %ctx.route,
                %source,
                content_type = %content_type,
                "Unsupported media type"
            );
            ctx.advance(PipelineState::ResponseBuilt);
            Some(unsupported_media_type(&content_type))
        }
    }
}

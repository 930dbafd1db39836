use super::core::{HandlerArgs, RequestContext};
use super::path::PathParam;
use super::response::{Reply, ReplyOptions};
use super::selector::{select_schema, Annotation, SourceBinding};
use crate::error::{ParamSource, RouteConfigError};
use crate::request::JsonOptions;
use crate::schema::{FieldType, Schema};
use std::fmt;
use std::sync::Arc;

/// Route-level validation options.
///
/// ```rust
/// use brrtvalidate::pipeline::ValidateOptions;
/// use brrtvalidate::schema::{FieldSpec, FieldType, Schema};
///
/// let body = Schema::record("Body")
///     .field(FieldSpec::required("search_term", FieldType::String))
///     .build()
///     .unwrap();
/// let options = ValidateOptions::new().body(&body).on_success_status(201);
/// assert_eq!(options.on_success_status, 201);
/// ```
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub body: Option<Arc<Schema>>,
    pub query: Option<Arc<Schema>>,
    pub form: Option<Arc<Schema>>,
    pub on_success_status: u16,
    pub exclude_none: bool,
    pub response_many: bool,
    pub request_body_many: bool,
    pub response_by_alias: bool,
    pub get_json_params: JsonOptions,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            body: None,
            query: None,
            form: None,
            on_success_status: 200,
            exclude_none: false,
            response_many: false,
            request_body_many: false,
            response_by_alias: false,
            get_json_params: JsonOptions::default(),
        }
    }
}

impl ValidateOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn body(mut self, schema: &Arc<Schema>) -> Self {
        self.body = Some(Arc::clone(schema));
        self
    }

    #[must_use]
    pub fn query(mut self, schema: &Arc<Schema>) -> Self {
        self.query = Some(Arc::clone(schema));
        self
    }

    #[must_use]
    pub fn form(mut self, schema: &Arc<Schema>) -> Self {
        self.form = Some(Arc::clone(schema));
        self
    }

    #[must_use]
    pub fn on_success_status(mut self, status: u16) -> Self {
        self.on_success_status = status;
        self
    }

    #[must_use]
    pub fn exclude_none(mut self) -> Self {
        self.exclude_none = true;
        self
    }

    #[must_use]
    pub fn response_many(mut self) -> Self {
        self.response_many = true;
        self
    }

    #[must_use]
    pub fn request_body_many(mut self) -> Self {
        self.request_body_many = true;
        self
    }

    #[must_use]
    pub fn response_by_alias(mut self) -> Self {
        self.response_by_alias = true;
        self
    }

    #[must_use]
    pub fn json_params(mut self, params: JsonOptions) -> Self {
        self.get_json_params = params;
        self
    }
}

/// Parameters the handler declares: its `query`/`body`/`form` annotations and
/// its path parameters.
#[derive(Debug, Clone, Default)]
pub struct HandlerSignature {
    pub query: Option<Annotation>,
    pub body: Option<Annotation>,
    pub form: Option<Annotation>,
    pub path: Vec<PathParam>,
}

impl HandlerSignature {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn query(mut self, annotation: Annotation) -> Self {
        self.query = Some(annotation);
        self
    }

    #[must_use]
    pub fn body(mut self, annotation: Annotation) -> Self {
        self.body = Some(annotation);
        self
    }

    #[must_use]
    pub fn form(mut self, annotation: Annotation) -> Self {
        self.form = Some(annotation);
        self
    }

    /// Declare a typed path parameter.
    pub fn path_param(mut self, name: &str, ty: FieldType) -> Result<Self, RouteConfigError> {
        self.path.push(PathParam::typed(name, ty)?);
        Ok(self)
    }

    /// Declare a path parameter without a type.
    #[must_use]
    pub fn raw_path_param(mut self, name: &str) -> Self {
        self.path.push(PathParam::untyped(name));
        self
    }
}

/// Everything the pipeline needs for one route, computed once at registration.
#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub query: SourceBinding,
    pub body: SourceBinding,
    pub form: SourceBinding,
    pub path_params: Vec<PathParam>,
    pub request_body_many: bool,
    pub json_options: JsonOptions,
    pub reply: ReplyOptions,
}

impl RoutePlan {
    /// Select the schema of every source.
    ///
    /// # Errors
    ///
    /// [`RouteConfigError::UnrelatedSchemas`] when options and signature name
    /// unrelated schemas for the same source.
    pub fn new(
        options: &ValidateOptions,
        signature: &HandlerSignature,
    ) -> Result<Self, RouteConfigError> {
        Ok(Self {
            query: select_schema(
                ParamSource::Query,
                options.query.as_ref(),
                signature.query.as_ref(),
            )?,
            body: select_schema(
                ParamSource::Body,
                options.body.as_ref(),
                signature.body.as_ref(),
            )?,
            form: select_schema(
                ParamSource::Form,
                options.form.as_ref(),
                signature.form.as_ref(),
            )?,
            path_params: signature.path.clone(),
            request_body_many: options.request_body_many,
            json_options: options.get_json_params,
            reply: ReplyOptions {
                on_success_status: options.on_success_status,
                exclude_none: options.exclude_none,
                many: options.response_many,
                by_alias: options.response_by_alias,
            },
        })
    }
}

/// A route handler.
///
/// Implemented for every `Fn(&RequestContext, HandlerArgs) -> anyhow::Result<Reply>`.
pub trait Handler: Send + Sync {
    fn call(&self, ctx: &RequestContext, args: HandlerArgs) -> anyhow::Result<Reply>;
}

impl<F> Handler for F
where
    F: Fn(&RequestContext, HandlerArgs) -> anyhow::Result<Reply> + Send + Sync,
{
    fn call(&self, ctx: &RequestContext, args: HandlerArgs) -> anyhow::Result<Reply> {
        self(ctx, args)
    }
}

/// A handler together with its validation plan.
#[derive(Clone)]
pub struct Route {
    name: String,
    plan: RoutePlan,
    handler: Arc<dyn Handler>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("plan", &self.plan)
            .finish()
    }
}

impl Route {
    /// Build the route plan and bind the handler.
    pub fn new<F>(
        name: impl Into<String>,
        options: &ValidateOptions,
        signature: &HandlerSignature,
        handler: F,
    ) -> Result<Self, RouteConfigError>
    where
        F: Fn(&RequestContext, HandlerArgs) -> anyhow::Result<Reply> + Send + Sync + 'static,
    {
        Ok(Self {
            name: name.into(),
            plan: RoutePlan::new(options, signature)?,
            handler: Arc::new(handler),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn plan(&self) -> &RoutePlan {
        &self.plan
    }

    pub(crate) fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

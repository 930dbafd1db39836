use super::request::parse_request;
use super::response::write_response;
use crate::error::{PipelineError, ValidationError};
use crate::ids::RequestId;
use crate::pipeline::{Pipeline, Response};
use crate::request::RawRequest;
use crate::router::Router;
use http::Method;
use may_minihttp::{HttpService, Request, Response as WireResponse};
use serde_json::json;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Presentation of raised validation errors.
pub type ValidationErrorHandler = Arc<dyn Fn(&ValidationError) -> Response + Send + Sync>;

/// `may_minihttp` service: routing, the validation pipeline and error presentation.
///
/// Cheap to clone; every connection coroutine gets its own clone.
#[derive(Clone)]
pub struct AppService {
    router: Arc<Router>,
    pipeline: Arc<Pipeline>,
    error_handler: Option<ValidationErrorHandler>,
}

impl fmt::Debug for AppService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppService")
            .field("routes", &self.router.len())
            .field("pipeline", &self.pipeline)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

impl AppService {
    #[must_use]
    pub fn new(router: Router, pipeline: Pipeline) -> Self {
        Self {
            router: Arc::new(router),
            pipeline: Arc::new(pipeline),
            error_handler: None,
        }
    }

    /// Present raised [`ValidationError`]s with `handler` instead of the default
    /// `validation_error` body.
    pub fn register_error_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ValidationError) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handle one request independently of the transport.
    #[must_use]
    pub fn handle(&self, request: &RawRequest) -> Response {
        if request.method == Method::GET && request.path == "/health" {
            return health_response();
        }

        let request_id = RequestId::from_header_or_new(request.header("x-request-id"));
        let Some(route_match) = self.router.route(&request.method, &request.path) else {
            let status = if self.router.matches_other_method(&request.method, &request.path) {
                405
            } else {
                404
            };
            warn!(
                request_id = %request_id,
                method = %request.method,
                path = %request.path,
                status,
                "No route for request"
            );
            return Response::json(
                status,
                json!({
                    "error": if status == 405 { "Method Not Allowed" } else { "Not Found" },
                    "method": request.method.as_str(),
                    "path": request.path,
                }),
            );
        };

        let result = self.pipeline.run_with_id(
            &route_match.route,
            request,
            route_match.path_args(),
            request_id,
        );
        let mut response = match result {
            Ok(response) => response,
            Err(err) => self.error_response(&err, request_id),
        };
        response.set_header("x-request-id", request_id.to_string());
        info!(
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
            route = %route_match.route.name(),
            status = response.status,
            "Request completed"
        );
        response
    }

    fn error_response(&self, err: &PipelineError, request_id: RequestId) -> Response {
        match err {
            PipelineError::Validation(validation) => match &self.error_handler {
                Some(handler) => handler(validation),
                None => Response::json(
                    self.pipeline.config().error_status_code,
                    json!({ "validation_error": validation.to_dict() }),
                ),
            },
            PipelineError::JsonBodyParsing { .. } => {
                warn!(request_id = %request_id, error = %err, "Malformed request body");
                Response::error(400, &err.to_string())
            }
            PipelineError::InvalidIterableOfModels { .. } | PipelineError::Handler(_) => {
                error!(request_id = %request_id, error = %err, "Request failed");
                Response::error(err.status_hint(), "Internal Server Error")
            }
        }
    }
}

fn health_response() -> Response {
    Response::json(200, json!({ "status": "ok" }))
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut WireResponse) -> io::Result<()> {
        let request = match parse_request(req) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Malformed HTTP request");
                write_response(res, &Response::error(400, "Bad Request"));
                return Ok(());
            }
        };
        let response = self.handle(&request);
        write_response(res, &response);
        Ok(())
    }
}

use crate::pipeline::{PathArgs, Route};
use http::Method;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Extracted path parameters; names are shared with the route table.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of matching a request path to a registered route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    /// Registered pattern, e.g. `/character/{character_id}`
    pub pattern: Arc<str>,
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Path parameter by name.
    ///
    /// "Last write wins" when a name occurs at several depths.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Raw path arguments for the pipeline; values stay strings until validated.
    #[must_use]
    pub fn path_args(&self) -> PathArgs {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
            .collect()
    }
}

struct CompiledRoute {
    method: Method,
    pattern: Arc<str>,
    regex: Regex,
    param_names: Vec<Arc<str>>,
    route: Arc<Route>,
}

/// Regex route table.
///
/// Routes are tried in registration order; the first match wins.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Arc<CompiledRoute>>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `route` for `method` on `pattern` (`{name}` segments capture parameters).
    ///
    /// # Errors
    ///
    /// Fails when the pattern does not compile to a regex.
    pub fn add(&mut self, method: Method, pattern: &str, route: Route) -> Result<(), regex::Error> {
        let (regex, param_names) = Self::path_to_regex(pattern)?;
        info!(method = %method, pattern = %pattern, route = %route.name(), "Route registered");
        self.routes.push(Arc::new(CompiledRoute {
            method,
            pattern: Arc::from(pattern),
            regex,
            param_names: param_names.into_iter().map(Arc::from).collect(),
            route: Arc::new(route),
        }));
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// `METHOD pattern -> route` lines, in registration order.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|r| format!("{} {} -> {}", r.method, r.pattern, r.route.name()))
            .collect()
    }

    /// Match a request; `path` must not contain the query string.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        for compiled in &self.routes {
            if compiled.method != *method {
                continue;
            }
            let Some(captures) = compiled.regex.captures(path) else {
                continue;
            };
            let path_params: ParamVec = compiled
                .param_names
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    captures
                        .get(i + 1)
                        .map(|m| (Arc::clone(name), decode_segment(m.as_str())))
                })
                .collect();
            debug!(
                method = %method,
                path = %path,
                pattern = %compiled.pattern,
                path_params = ?path_params,
                "Route matched"
            );
            return Some(RouteMatch {
                route: Arc::clone(&compiled.route),
                pattern: Arc::clone(&compiled.pattern),
                path_params,
            });
        }
        debug!(method = %method, path = %path, "No route matched");
        None
    }

    /// Whether any route matches `path` under another method.
    #[must_use]
    pub fn matches_other_method(&self, method: &Method, path: &str) -> bool {
        self.routes
            .iter()
            .any(|r| r.method != *method && r.regex.is_match(path))
    }

    /// Convert a path pattern such as `/users/{id}` into `^/users/([^/]+)$`
    /// and its ordered parameter names.
    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<String>), regex::Error> {
        if path == "/" {
            return Ok((Regex::new(r"^/$")?, Vec::new()));
        }

        let mut pattern = String::with_capacity(path.len() + 5);
        pattern.push('^');
        let mut param_names = Vec::with_capacity(path.matches('{').count());

        for segment in path.split('/') {
            if segment.starts_with('{') && segment.ends_with('}') {
                let param_name = segment
                    .trim_start_matches('{')
                    .trim_end_matches('}')
                    .to_string();
                pattern.push_str("/([^/]+)");
                param_names.push(param_name);
            } else if !segment.is_empty() {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
            }
        }

        pattern.push('$');
        Ok((Regex::new(&pattern)?, param_names))
    }
}

/// Percent-decode a captured segment; invalid UTF-8 keeps the raw text.
fn decode_segment(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8()
        .map_or_else(|_| raw.to_string(), |decoded| decoded.into_owned())
}

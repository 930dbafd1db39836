//! # Router Module
//!
//! Regex-based path matching from request paths to registered [`Route`](crate::pipeline::Route)s.
//!
//! ## Architecture
//!
//! 1. **Compilation**: at startup each path pattern (e.g. `/character/{character_id}`)
//!    becomes an anchored regex plus the ordered list of its parameter names.
//! 2. **Matching**: per request the path is tested against the patterns registered for
//!    the request method; the first match yields the route and the raw path parameters.
//!
//! Path parameters leave the router as strings. Typing them is the pipeline's job.

mod core;
#[cfg(test)]
mod tests;

pub use self::core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};

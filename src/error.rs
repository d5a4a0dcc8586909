//! Defines the error types used throughout the `segroute` crate.
//!
//! Errors split into two families, matching the definition-time /
//! dispatch-time split a host framework needs: configuration mistakes
//! raised while building a router, and ordinary "no such route"
//! outcomes raised while resolving a request.

use thiserror::Error;

/// The primary error type for `segroute` operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// No route matched the given method and path.
    #[error("route not found for path '{path}'")]
    NotFound {
        /// The path that could not be resolved.
        path: String,
    },

    /// A route matched the path but not the requested method.
    #[error("method '{method}' not allowed, expected one of {allowed_methods:?}")]
    NoMethod {
        /// The HTTP method that was requested.
        method: String,
        /// The method set actually registered for the matched route.
        allowed_methods: Vec<String>,
    },

    /// `add()` was called with a method outside the router's configured
    /// allowed-methods set.
    #[error("bad method '{method}', must be one of {allowed:?}")]
    BadMethod {
        /// The offending method.
        method: String,
        /// The allowed method set.
        allowed: Vec<String>,
    },

    /// A route with an identical (segment tuple, method set, requirements)
    /// key was already registered, and neither `overwrite` nor `append`
    /// was requested.
    #[error("route already registered: {path} [{methods}]")]
    RouteExists {
        /// The conflicting path.
        path: String,
        /// The conflicting method set, rendered for display.
        methods: String,
    },

    /// The router's finalization lifecycle was violated: `finalize()`
    /// called twice, on an empty router, or `add()`/`register_pattern()`
    /// called after finalization.
    #[error("finalization error: {0}")]
    FinalizationError(String),

    /// A malformed path pattern, parameter declaration, or mutually
    /// exclusive flag combination.
    #[error("invalid usage: {0}")]
    InvalidUsage(String),

    /// Two parameter slots within the same route declared the same name.
    #[error("parameter name conflicts in route '{path}': {name}")]
    ParameterNameConflicts {
        /// The route's canonical path.
        path: String,
        /// The name declared more than once.
        name: String,
    },
}

impl RouterError {
    /// `true` for the two dispatch-time variants (`NotFound`, `NoMethod`)
    /// that a host framework is expected to map to a 404/405 response
    /// rather than treat as a programmer error.
    pub fn is_dispatch_error(&self) -> bool {
        matches!(self, RouterError::NotFound { .. } | RouterError::NoMethod { .. })
    }
}

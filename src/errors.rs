//! Error handling types for the servlet module.
//!
//! The taxonomy follows the way the host pipeline renders failures:
//! routing problems are client errors, engine problems are server errors,
//! and initialization problems keep the module from being activated.
//!
//! # Examples
//!
//! ```rust,ignore
//! use servlet_dispatch::errors::{ModuleError, RoutingError};
//!
//! match module.process(&request, &mut response, &context, hook).await {
//!     Ok(()) => {}
//!     Err(ModuleError::BadRequest(RoutingError::NoApplicationMatch(uri))) => {
//!         eprintln!("Nobody serves {}", uri);
//!     }
//!     Err(other) => eprintln!("Module failed with {}: {}", other.status(), other),
//! }
//! ```

use http::StatusCode;
use thiserror::Error;

/// Top-level error surfaced by the servlet module to the host pipeline.
///
/// Every variant maps to the HTTP status the host must render, see
/// [`ModuleError::status`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModuleError {
    /// Any failure while running `init`; the host must refuse to activate the module
    #[error("Module initialization failed: {0}")]
    Initialization(String),

    /// `process` was called before a successful `init`
    #[error("Module has not been initialized")]
    NotInitialized,

    /// The request could not be routed to an application/servlet
    #[error("Bad request: {0}")]
    BadRequest(#[from] RoutingError),

    /// The engine failed while handling the request
    #[error("Handling failed: {0}")]
    Handling(#[from] ExecutionError),
}

impl ModuleError {
    /// Returns the status code the host renders for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ModuleError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ModuleError::Initialization(_)
            | ModuleError::NotInitialized
            | ModuleError::Handling(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true when the failure was caused by the client's request.
    pub fn is_client_error(&self) -> bool {
        self.status()
            .is_client_error()
    }
}

/// Configuration-related errors.
///
/// These errors occur during the parsing and validation of the server,
/// virtual host and handler configuration, and while compiling the
/// application patterns.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// Invalid virtual host configuration
    #[error("Invalid virtual host config: {0}")]
    VirtualHost(String),

    /// Invalid handler configuration
    #[error("Invalid handler config: {0}")]
    Handler(String),

    /// Invalid session cookie configuration
    #[error("Invalid session config: {0}")]
    Session(String),

    /// Invalid application configuration
    #[error("Invalid application config: {0}")]
    Application(String),

    /// An application pattern failed to compile
    #[error("Invalid application pattern: {0}")]
    Pattern(String),

    /// The configuration file could not be read or parsed
    #[error("Failed to load config: {0}")]
    Load(String),
}

/// Routing errors.
///
/// Both variants are raised before the engine is involved and are
/// rendered as `400 Bad Request`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoutingError {
    /// No application pattern matched the host and URI
    #[error("Can't find application for URI {0}")]
    NoApplicationMatch(String),

    /// No path segment carries an extension registered for this module
    #[error("Can't find servlet for URI {0}")]
    UnresolvedPath(String),
}

/// Cookie parsing errors.
///
/// Only ever raised for a single token; the translator drops the token
/// and keeps parsing the rest of the header.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CookieError {
    /// The token has no separable name/value pair
    #[error("Malformed cookie token: {0}")]
    Malformed(String),
}

/// Errors raised by an isolated execution unit.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    /// The engine reported a failure while handling the request
    #[error("Engine error: {0}")]
    Engine(String),

    /// The handling code panicked inside the unit
    #[error("Handler panicked: {0}")]
    Panicked(String),

    /// The caller stopped waiting for the unit
    #[error("Execution cancelled")]
    Cancelled,

    /// The unit terminated without reporting a result
    #[error("Execution interrupted: {0}")]
    Interrupted(String),
}

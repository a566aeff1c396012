//! Host pipeline contract and the routing/execution building blocks.
//!
//! The host web server drives a chain of [`Module`]s for every request.
//! This module defines that contract (hooks, server vars, contexts,
//! response states) and the components the servlet module wires together.
//!
//! # Modules
//!
//! - [`virtual_host`]: configured virtual hosts
//! - [`application`]: deployed applications and their container
//! - [`matcher`]: host + URI to application matching
//! - [`path`]: servlet path / path info resolution
//! - [`cookie`]: request cookie parsing and `Set-Cookie` rendering
//! - [`dispatch`]: routed request/response types
//! - [`router`]: the routing pipeline
//! - [`execution`]: isolated execution of the engine
//!
//! # Examples
//!
//! ```rust,ignore
//! use servlet_dispatch::server::{Module, ModuleHook, RequestContext, SERVER_HANDLER};
//!
//! let mut context = RequestContext::new();
//! context.set_server_var(SERVER_HANDLER, "servlet");
//!
//! module
//!     .process(&request, &mut response, &context, ModuleHook::RequestPost)
//!     .await?;
//! ```

use std::{collections::HashMap, fmt, future::Future, pin::Pin, sync::Arc};

use crate::{
    config::ServerConfig,
    errors::ModuleError,
    server::{
        application::Container,
        dispatch::{AuthenticationManager, SessionManager},
    },
    Request, Response,
};

pub mod application;
pub mod cookie;
pub mod dispatch;
pub mod execution;
pub mod matcher;
pub mod path;
pub mod router;
pub mod virtual_host;

/// Server var naming the module designated to handle the request.
pub const SERVER_HANDLER: &str = "SERVER_HANDLER";
/// Server var holding the document root of the request's server.
pub const DOCUMENT_ROOT: &str = "DOCUMENT_ROOT";
/// Server var holding the server name the request was received for.
pub const SERVER_NAME: &str = "SERVER_NAME";

/// Stages of the host pipeline at which modules are invoked.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModuleHook {
    RequestPre,
    RequestPost,
    ResponsePre,
    ResponsePost,
    Shutdown,
}

impl fmt::Display for ModuleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleHook::RequestPre => "request-pre",
            ModuleHook::RequestPost => "request-post",
            ModuleHook::ResponsePre => "response-pre",
            ModuleHook::ResponsePost => "response-post",
            ModuleHook::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// State of the outward response as seen by the host pipeline.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ResponseState {
    /// No module has produced the response yet
    #[default]
    Initial,
    /// The response is complete; the host sends it without calling further modules
    Dispatch,
    /// The response has been sent
    Final,
}

/// Per-request context supplied by the host.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    server_vars: HashMap<String, String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_server_var(&mut self, name: &str, value: &str) {
        self.server_vars
            .insert(name.to_string(), value.to_string());
    }

    pub fn server_var(&self, name: &str) -> Option<&str> {
        self.server_vars
            .get(name)
            .map(String::as_str)
    }

    pub fn server_vars(&self) -> &HashMap<String, String> {
        &self.server_vars
    }
}

/// Server-wide context handed to modules at initialization.
///
/// Holds the server configuration and the collaborators owned by the
/// application server: the deployment container and the session and
/// authentication managers.
#[derive(Clone)]
pub struct ServerContext {
    config: ServerConfig,
    container: Arc<dyn Container>,
    session_manager: Option<Arc<dyn SessionManager>>,
    authentication_manager: Option<Arc<dyn AuthenticationManager>>,
}

impl ServerContext {
    pub fn new(config: ServerConfig, container: Arc<dyn Container>) -> Self {
        Self { config, container, session_manager: None, authentication_manager: None }
    }

    pub fn with_session_manager(mut self, session_manager: Arc<dyn SessionManager>) -> Self {
        self.session_manager = Some(session_manager);
        self
    }

    pub fn with_authentication_manager(
        mut self,
        authentication_manager: Arc<dyn AuthenticationManager>,
    ) -> Self {
        self.authentication_manager = Some(authentication_manager);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn container(&self) -> &Arc<dyn Container> {
        &self.container
    }

    pub fn session_manager(&self) -> Option<&Arc<dyn SessionManager>> {
        self.session_manager
            .as_ref()
    }

    pub fn authentication_manager(&self) -> Option<&Arc<dyn AuthenticationManager>> {
        self.authentication_manager
            .as_ref()
    }
}

/// Trait implemented by every module plugged into the host pipeline.
///
/// The host calls [`Module::init`] once at startup, refusing to activate
/// the module if it fails, and [`Module::process`] for every request and
/// hook.
pub trait Module: Send + Sync {
    /// Returns the unique module name in the web server context.
    fn module_name(&self) -> &'static str;

    /// Returns the names of the modules that have to run first.
    fn dependencies(&self) -> Vec<&'static str>;

    /// One-time setup.
    ///
    /// # Errors
    ///
    /// Any failure is reported as [`ModuleError::Initialization`].
    fn init(&mut self, context: &ServerContext) -> Result<(), ModuleError>;

    /// Prepares the module for upcoming requests in a worker context.
    fn prepare(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Processes the request for the given hook.
    fn process<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
        context: &'a RequestContext,
        hook: ModuleHook,
    ) -> Pin<Box<dyn Future<Output = Result<(), ModuleError>> + Send + 'a>>;
}

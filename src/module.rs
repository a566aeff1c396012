//! The servlet module plugged into the host pipeline.
//!
//! For every request the host designates to it, the module runs
//!
//! ```text
//! Idle ─> Routing ─> Executing ─> Responding ─> Idle
//! ```
//!
//! Routing builds a fresh [`RoutedRequest`](crate::server::dispatch::RoutedRequest),
//! execution happens in an [`IsolatedExecutionUnit`] and the engine's
//! response is merged into the host's [`Response`]. Nothing produced for
//! one request is kept for the next.

use std::{future::Future, pin::Pin, sync::Arc};

use http::{header::SET_COOKIE, HeaderValue};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::{
    errors::ModuleError,
    server::{
        dispatch::RoutedResponse,
        execution::{Engine, IsolatedExecutionUnit},
        router::RequestRouter,
        Module, ModuleHook, RequestContext, ResponseState, ServerContext, SERVER_HANDLER,
    },
    Request, Response,
};

/// Name the module is registered under, and the handler name it serves.
pub const MODULE_NAME: &str = "servlet";

/// Routes designated requests to servlets and runs them in isolation.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use servlet_dispatch::{module::ServletModule, server::Module};
///
/// let mut module = ServletModule::new(Arc::new(MyEngine));
/// module.init(&server_context)?;
///
/// module
///     .process(&request, &mut response, &context, ModuleHook::RequestPost)
///     .await?;
/// ```
pub struct ServletModule {
    unit: IsolatedExecutionUnit,
    router: Option<RequestRouter>,
    shutdown: Option<CancellationToken>,
}

impl ServletModule {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { unit: IsolatedExecutionUnit::new(engine), router: None, shutdown: None }
    }

    /// Stops waiting for running servlets once `token` is cancelled.
    ///
    /// Requests cut short this way fail with
    /// [`ExecutionError::Cancelled`](crate::errors::ExecutionError::Cancelled).
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Returns the router, once the module has been initialized.
    pub fn router(&self) -> Option<&RequestRouter> {
        self.router
            .as_ref()
    }

    async fn dispatch(
        &self,
        request: &Request,
        response: &mut Response,
        context: &RequestContext,
    ) -> Result<(), ModuleError> {
        let router = self
            .router
            .as_ref()
            .ok_or(ModuleError::NotInitialized)?;

        let routed = router.route(request, context)?;
        debug!("Dispatching {:?}", routed);

        let result = match &self.shutdown {
            Some(token) => {
                self.unit
                    .execute_with_cancellation(routed, token.child_token())
                    .await
            }
            None => {
                self.unit
                    .execute(routed)
                    .await
            }
        };

        match result {
            Ok(routed_response) => {
                merge_response(response, routed_response);
                response.set_state(ResponseState::Dispatch);
                Ok(())
            }
            Err(failure) => {
                let (cause, partial) = failure.into_parts();
                if let Some(partial) = partial {
                    merge_response(response, partial);
                }
                Err(ModuleError::Handling(cause))
            }
        }
    }
}

impl Module for ServletModule {
    fn module_name(&self) -> &'static str {
        MODULE_NAME
    }

    fn dependencies(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn init(&mut self, context: &ServerContext) -> Result<(), ModuleError> {
        let router = RequestRouter::new(context, MODULE_NAME)
            .map_err(|e| ModuleError::Initialization(e.to_string()))?;

        info!(
            "Servlet module initialized: {} bindings, {} virtual hosts",
            router
                .matcher()
                .len(),
            context
                .config()
                .virtual_hosts()
                .len()
        );

        self.router = Some(router);
        Ok(())
    }

    fn process<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
        context: &'a RequestContext,
        hook: ModuleHook,
    ) -> Pin<Box<dyn Future<Output = Result<(), ModuleError>> + Send + 'a>> {
        Box::pin(async move {
            if hook != ModuleHook::RequestPost {
                return Ok(());
            }

            if context.server_var(SERVER_HANDLER) != Some(MODULE_NAME) {
                return Ok(());
            }

            self.dispatch(request, response, context)
                .await
        })
    }
}

/// Copies status, headers, cookies and body of the engine's response into
/// the outward response.
fn merge_response(response: &mut Response, mut routed: RoutedResponse) {
    response.set_status(routed.status());

    let headers = response.headers_mut();
    for (name, value) in routed.headers() {
        headers.append(name.clone(), value.clone());
    }

    for cookie in routed.cookies() {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => warn!("Skipping cookie {}: {}", cookie.name(), e),
        }
    }

    response.append_body(&routed.take_body());
}

//! Shared fixtures: a two-application deployment and a few engines.

use std::{
    io::Write,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use bytes::Bytes;
use http::{header::HOST, HeaderName, HeaderValue, StatusCode};
use tokio::sync::oneshot;

use crate::{
    config::{HandlerConfig, ServerConfig, VirtualHostConfig},
    errors::{ConfigError, ExecutionError},
    module::MODULE_NAME,
    server::{
        application::{Application, StaticContainer},
        cookie::ResponseCookie,
        dispatch::{RoutedRequest, RoutedResponse},
        execution::{Engine, OutputBuffer},
        RequestContext, ServerContext, SERVER_HANDLER,
    },
    Request,
};

pub const DOCUMENT_ROOT: &str = "/opt/appserver/webapps";

/// `shop.local` is a virtual host of `shop`; `example` has none.
pub fn server_config() -> Result<ServerConfig, ConfigError> {
    ServerConfig::builder()
        .document_root(DOCUMENT_ROOT)
        .add_virtual_host(
            VirtualHostConfig::builder()
                .domain("shop.local")
                .document_root("/opt/appserver/webapps/shop")
                .build()?,
        )
        .handler(
            ".phtml",
            HandlerConfig::builder()
                .name(MODULE_NAME)
                .build()?,
        )
        .handler(
            ".php",
            HandlerConfig::builder()
                .name("fastcgi")
                .build()?,
        )
        .build()
}

pub fn applications() -> Vec<Arc<Application>> {
    vec![
        Arc::new(Application::new("example", "/opt/appserver/webapps/example")),
        Arc::new(Application::new("shop", "/opt/appserver/webapps/shop")),
    ]
}

pub fn server_context() -> Result<ServerContext, ConfigError> {
    let container = StaticContainer::new(vec![
        Application::new("example", "/opt/appserver/webapps/example"),
        Application::new("shop", "/opt/appserver/webapps/shop"),
    ]);
    Ok(ServerContext::new(server_config()?, Arc::new(container)))
}

pub fn request(host: &str, uri: &str) -> Result<Request, http::Error> {
    Ok(Request::from_http(
        http::Request::builder()
            .uri(uri)
            .header(HOST, host)
            .body(Bytes::new())?,
    ))
}

/// Request context designating the servlet module as handler.
pub fn servlet_context() -> RequestContext {
    let mut context = RequestContext::new();
    context.set_server_var(SERVER_HANDLER, MODULE_NAME);
    context
}

/// Writes `servlet_path|path_info` and echoes the routing in headers.
pub struct EchoEngine;

impl Engine for EchoEngine {
    fn process(
        &self,
        request: &RoutedRequest,
        response: &mut RoutedResponse,
        output: &mut OutputBuffer,
    ) -> Result<(), ExecutionError> {
        let servlet_path = HeaderValue::from_str(request.servlet_path())
            .map_err(|e| ExecutionError::Engine(e.to_string()))?;
        response.add_header(HeaderName::from_static("x-servlet-path"), servlet_path);
        response.set_status(StatusCode::CREATED);
        response.add_cookie(
            ResponseCookie::new("SESSID", "abc")
                .path(request.context_path())
                .http_only(true),
        );

        write!(output, "{}|{}", request.servlet_path(), request.path_info())
            .map_err(|e| ExecutionError::Engine(e.to_string()))
    }
}

/// Writes to the response and the output buffer, then panics.
pub struct PanickingEngine;

impl Engine for PanickingEngine {
    fn process(
        &self,
        _request: &RoutedRequest,
        response: &mut RoutedResponse,
        output: &mut OutputBuffer,
    ) -> Result<(), ExecutionError> {
        response.append_body(b"head:");
        output
            .write_all(b"partial")
            .map_err(|e| ExecutionError::Engine(e.to_string()))?;
        panic!("boom");
    }
}

/// Writes some output and reports a failure.
pub struct FailingEngine;

impl Engine for FailingEngine {
    fn process(
        &self,
        _request: &RoutedRequest,
        response: &mut RoutedResponse,
        output: &mut OutputBuffer,
    ) -> Result<(), ExecutionError> {
        response.set_status(StatusCode::SERVICE_UNAVAILABLE);
        output
            .write_all(b"before failure")
            .map_err(|e| ExecutionError::Engine(e.to_string()))?;
        Err(ExecutionError::Engine("database unavailable".to_string()))
    }
}

/// Counts its invocations.
#[derive(Default)]
pub struct CountingEngine {
    calls: AtomicUsize,
}

impl CountingEngine {
    pub fn calls(&self) -> usize {
        self.calls
            .load(Ordering::SeqCst)
    }
}

impl Engine for CountingEngine {
    fn process(
        &self,
        _request: &RoutedRequest,
        _response: &mut RoutedResponse,
        _output: &mut OutputBuffer,
    ) -> Result<(), ExecutionError> {
        self.calls
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Runs until the request is cancelled, then reports that it stopped.
pub struct CooperativeEngine {
    stopped: Mutex<Option<oneshot::Sender<()>>>,
}

impl CooperativeEngine {
    pub fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { stopped: Mutex::new(Some(tx)) }, rx)
    }
}

impl Engine for CooperativeEngine {
    fn process(
        &self,
        request: &RoutedRequest,
        _response: &mut RoutedResponse,
        _output: &mut OutputBuffer,
    ) -> Result<(), ExecutionError> {
        while !request
            .cancellation_token()
            .is_cancelled()
        {
            thread::sleep(Duration::from_millis(5));
        }

        if let Some(stopped) = self
            .stopped
            .lock()
            .map_err(|e| ExecutionError::Engine(e.to_string()))?
            .take()
        {
            let _ = stopped.send(());
        }
        Err(ExecutionError::Cancelled)
    }
}

//! # servlet-dispatch
//!
//! **Servlet routing and isolated request execution for a modular web server**
//!
//! This crate is the servlet module of an application server's web
//! server. For every request the host designates to it, the module
//! answers two questions and acts on them:
//!
//! - **Which application?** The host and URI are matched against patterns
//!   built from the configured virtual hosts and the deployed
//!   applications. Named virtual hosts win over the generic
//!   `/<application>/...` routing.
//! - **Which servlet?** The path is split into the servlet path, ending at
//!   the first segment whose extension is handled by this module, and the
//!   remaining path info.
//!
//! The routed request is then handled by the servlet engine in an isolated
//! unit, so a panicking servlet cannot take the server down, and the
//! result is merged back into the host's response.
//!
//! ## Basic Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use servlet_dispatch::{
//!     config::{HandlerConfig, ServerConfig},
//!     module::ServletModule,
//!     server::{
//!         application::{Application, StaticContainer},
//!         Module, ModuleHook, RequestContext, ServerContext, SERVER_HANDLER,
//!     },
//!     Request, Response,
//! };
//!
//! let config = ServerConfig::builder()
//!     .document_root("/opt/appserver/webapps")
//!     .handler(".phtml", HandlerConfig::builder().name("servlet").build()?)
//!     .build()?;
//! let container = StaticContainer::new(vec![Application::new("example", "/opt/appserver/webapps/example")]);
//!
//! let mut module = ServletModule::new(Arc::new(MyEngine));
//! module.init(&ServerContext::new(config, Arc::new(container)))?;
//!
//! let mut context = RequestContext::new();
//! context.set_server_var(SERVER_HANDLER, "servlet");
//!
//! let mut response = Response::default();
//! module
//!     .process(&request, &mut response, &context, ModuleHook::RequestPost)
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Server, virtual host, handler and application configuration
//! - [`errors`]: Error types and their HTTP status mapping
//! - [`module`]: The servlet module plugged into the host pipeline
//! - [`server`]: Host pipeline contract, routing and isolated execution

use bytes::{Bytes, BytesMut};
use http_body_util::Full;

use crate::server::ResponseState;

pub mod config;
pub mod errors;
pub mod module;
pub mod server;
mod tests;
pub mod utils;

/// HTTP request as handed over by the host pipeline.
///
/// # Examples
///
/// ```rust,ignore
/// use bytes::Bytes;
/// use servlet_dispatch::Request;
///
/// let request = Request::from_http(
///     http::Request::builder()
///         .uri("/example/index.phtml?page=1")
///         .header("host", "localhost:9080")
///         .body(Bytes::new())?,
/// );
///
/// assert_eq!(request.uri().path(), "/example/index.phtml");
/// ```
#[derive(Debug)]
pub struct Request {
    inner: http::Request<Bytes>,
}

impl Request {
    /// Creates a `Request` from a parsed HTTP request.
    pub fn from_http(req: http::Request<Bytes>) -> Self {
        Self { inner: req }
    }

    /// Returns the request URI.
    pub fn uri(&self) -> &http::Uri {
        self.inner.uri()
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &http::HeaderMap {
        self.inner
            .headers()
    }

    /// Returns the request headers (mutable).
    pub fn headers_mut(&mut self) -> &mut http::HeaderMap {
        self.inner
            .headers_mut()
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &http::Method {
        self.inner
            .method()
    }

    /// Returns the request body.
    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        Self::from_http(req)
    }
}

/// Builder for creating HTTP responses.
///
/// # Examples
///
/// ```rust,ignore
/// use http::StatusCode;
/// use servlet_dispatch::Response;
///
/// let response = Response::builder()
///     .status(StatusCode::NOT_FOUND)
///     .header(http::header::CONTENT_TYPE, "text/plain".parse()?)
///     .text("Not found");
/// ```
pub struct ResponseBuilder {
    status: http::StatusCode,
    headers: Option<http::HeaderMap>,
}

impl ResponseBuilder {
    /// Sets the HTTP status code for the response.
    pub fn status(mut self, status: http::StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a header to the response.
    pub fn header<K>(mut self, key: K, value: http::header::HeaderValue) -> Self
    where
        K: http::header::IntoHeaderName,
    {
        self.headers
            .get_or_insert_with(http::HeaderMap::new)
            .append(key, value);
        self
    }

    /// Sets the headers for the response.
    ///
    /// This replaces all existing headers.
    pub fn headers(mut self, headers: http::HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Sets the body from a text string and creates the final `Response`.
    pub fn text(self, text: &str) -> Response {
        self.body(Bytes::copy_from_slice(text.as_bytes()))
    }

    /// Sets the body and creates the final `Response`.
    pub fn body(self, body: Bytes) -> Response {
        let (mut parts, body) = http::Response::new(body).into_parts();
        parts.status = self.status;
        if let Some(headers) = self.headers {
            parts.headers = headers;
        }

        Response { inner: http::Response::from_parts(parts, body), state: ResponseState::Initial }
    }
}

/// HTTP response shared by the modules of the host pipeline.
///
/// Besides status, headers and body it carries the [`ResponseState`]
/// the host uses to decide whether further modules must run.
#[derive(Debug)]
pub struct Response {
    inner: http::Response<Bytes>,
    state: ResponseState,
}

impl Response {
    /// Creates a new `ResponseBuilder` with default settings.
    ///
    /// The builder starts with:
    /// - Status: 200 OK
    /// - No headers
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder {
            status: http::StatusCode::OK,
            headers: None,
        }
    }

    pub fn status(&self) -> http::StatusCode {
        self.inner.status()
    }

    pub fn set_status(&mut self, status: http::StatusCode) {
        *self
            .inner
            .status_mut() = status;
    }

    pub fn headers(&self) -> &http::HeaderMap {
        self.inner
            .headers()
    }

    pub fn headers_mut(&mut self) -> &mut http::HeaderMap {
        self.inner
            .headers_mut()
    }

    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    /// Appends `data` to the response body.
    pub fn append_body(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        let body = self
            .inner
            .body_mut();
        let mut appended = BytesMut::with_capacity(body.len() + data.len());
        appended.extend_from_slice(body);
        appended.extend_from_slice(data);
        *body = appended.freeze();
    }

    pub fn state(&self) -> ResponseState {
        self.state
    }

    pub fn set_state(&mut self, state: ResponseState) {
        self.state = state;
    }

    /// Converts the response into an `http::Response` ready to be served.
    pub fn into_inner(self) -> http::Response<Full<Bytes>> {
        self.inner
            .map(Full::new)
    }
}

impl Default for Response {
    fn default() -> Self {
        Response::builder().body(Bytes::new())
    }
}

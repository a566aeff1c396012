//! Routed request and response types.
//!
//! A [`RoutedRequest`] is the fully routed request handed to the engine.
//! It can only be built for a matched application, so a request that no
//! application serves never reaches the engine. A [`RoutedResponse`] is
//! filled by the engine and merged back into the outward response.

use std::{collections::HashMap, fmt, sync::Arc};

use bytes::{Bytes, BytesMut};
use http::{header::HeaderName, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use tokio_util::sync::CancellationToken;

use crate::server::{application::Application, cookie::ParsedCookie, cookie::ResponseCookie};

/// Session store owned by the application server.
///
/// The servlet module only threads it through to the engine.
pub trait SessionManager: Send + Sync {}

/// Authentication manager owned by the application server.
///
/// The servlet module only threads it through to the engine.
pub trait AuthenticationManager: Send + Sync {}

/// Builder for [`RoutedRequest`].
pub struct RoutedRequestBuilder {
    request: RoutedRequest,
}

impl RoutedRequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.request.method = method;
        self
    }

    /// Sets the request URI; the query string is taken from it.
    pub fn uri(mut self, uri: Uri) -> Self {
        self.request.query_string = uri
            .query()
            .map(str::to_string);
        self.request.uri = uri;
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.request.headers = headers;
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.request.body = body;
        self
    }

    pub fn cookies(mut self, cookies: Vec<ParsedCookie>) -> Self {
        self.request.cookies = cookies;
        self
    }

    pub fn requested_session_id(mut self, session_id: Option<String>) -> Self {
        self.request.requested_session_id = session_id;
        self
    }

    pub fn servlet_path(mut self, servlet_path: &str) -> Self {
        self.request.servlet_path = servlet_path.to_string();
        self
    }

    pub fn path_info(mut self, path_info: &str) -> Self {
        self.request.path_info = path_info.to_string();
        self
    }

    pub fn context_path(mut self, context_path: &str) -> Self {
        self.request.context_path = context_path.to_string();
        self
    }

    pub fn server_vars(mut self, server_vars: HashMap<String, String>) -> Self {
        self.request.server_vars = server_vars;
        self
    }

    pub fn session_manager(mut self, session_manager: Option<Arc<dyn SessionManager>>) -> Self {
        self.request.session_manager = session_manager;
        self
    }

    pub fn authentication_manager(
        mut self,
        authentication_manager: Option<Arc<dyn AuthenticationManager>>,
    ) -> Self {
        self.request.authentication_manager = authentication_manager;
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.request.cancellation_token = token;
        self
    }

    pub fn build(self) -> RoutedRequest {
        self.request
    }
}

/// A request routed to an application and servlet.
pub struct RoutedRequest {
    method: Method,
    uri: Uri,
    query_string: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    cookies: Vec<ParsedCookie>,
    requested_session_id: Option<String>,
    servlet_path: String,
    path_info: String,
    context_path: String,
    server_vars: HashMap<String, String>,
    application: Arc<Application>,
    session_manager: Option<Arc<dyn SessionManager>>,
    authentication_manager: Option<Arc<dyn AuthenticationManager>>,
    cancellation_token: CancellationToken,
}

impl RoutedRequest {
    /// Starts building a request routed to `application`.
    pub fn builder(application: Arc<Application>) -> RoutedRequestBuilder {
        RoutedRequestBuilder {
            request: RoutedRequest {
                method: Method::GET,
                uri: Uri::default(),
                query_string: None,
                headers: HeaderMap::new(),
                body: Bytes::new(),
                cookies: Vec::new(),
                requested_session_id: None,
                servlet_path: String::new(),
                path_info: String::new(),
                context_path: String::new(),
                server_vars: HashMap::new(),
                application,
                session_manager: None,
                authentication_manager: None,
                cancellation_token: CancellationToken::new(),
            },
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query_string
            .as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn cookies(&self) -> &[ParsedCookie] {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&ParsedCookie> {
        self.cookies
            .iter()
            .find(|cookie| cookie.name() == name)
    }

    pub fn requested_session_id(&self) -> Option<&str> {
        self.requested_session_id
            .as_deref()
    }

    pub fn servlet_path(&self) -> &str {
        &self.servlet_path
    }

    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    pub fn server_var(&self, name: &str) -> Option<&str> {
        self.server_vars
            .get(name)
            .map(String::as_str)
    }

    pub fn server_vars(&self) -> &HashMap<String, String> {
        &self.server_vars
    }

    pub fn application(&self) -> &Arc<Application> {
        &self.application
    }

    pub fn session_manager(&self) -> Option<&Arc<dyn SessionManager>> {
        self.session_manager
            .as_ref()
    }

    pub fn authentication_manager(&self) -> Option<&Arc<dyn AuthenticationManager>> {
        self.authentication_manager
            .as_ref()
    }

    /// Token cancelled when the caller stops waiting for the request.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }
}

impl fmt::Debug for RoutedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutedRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("application", &self.application.name())
            .field("context_path", &self.context_path)
            .field("servlet_path", &self.servlet_path)
            .field("path_info", &self.path_info)
            .field("requested_session_id", &self.requested_session_id)
            .field("cookies", &self.cookies)
            .finish_non_exhaustive()
    }
}

/// Response produced by the engine.
#[derive(Clone, Debug, Default)]
pub struct RoutedResponse {
    status: StatusCode,
    reason_phrase: Option<String>,
    headers: HeaderMap,
    body: BytesMut,
    cookies: Vec<ResponseCookie>,
}

impl RoutedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the custom reason phrase, or the canonical one of the status.
    pub fn reason_phrase(&self) -> &str {
        self.reason_phrase
            .as_deref()
            .or(self
                .status
                .canonical_reason())
            .unwrap_or("")
    }

    pub fn set_reason_phrase(&mut self, reason_phrase: &str) {
        self.reason_phrase = Some(reason_phrase.to_string());
    }

    /// Returns the HTTP/1.1 status line, e.g. `HTTP/1.1 404 Not Found`.
    pub fn status_line(&self) -> String {
        format!("HTTP/1.1 {} {}", self.status.as_u16(), self.reason_phrase())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn add_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers
            .append(name, value);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn append_body(&mut self, data: &[u8]) {
        self.body
            .extend_from_slice(data);
    }

    /// Takes the body out of the response, leaving it empty.
    pub fn take_body(&mut self) -> Bytes {
        self.body
            .split()
            .freeze()
    }

    pub fn cookies(&self) -> &[ResponseCookie] {
        &self.cookies
    }

    pub fn add_cookie(&mut self, cookie: ResponseCookie) {
        self.cookies
            .push(cookie);
    }
}

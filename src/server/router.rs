//! The routing pipeline.
//!
//! ```text
//! Request ─> cookies ─> servlet path / path info ─> application ─> RoutedRequest
//! ```
//!
//! Cookies are parsed first so the requested session is known to the
//! routed request. Path resolution and application matching do not
//! depend on each other; both must succeed before a [`RoutedRequest`]
//! exists.

use std::sync::Arc;

use http::{header::HOST, HeaderMap, Uri};
use log::warn;

use crate::{
    errors::{ConfigError, RoutingError},
    server::{
        cookie::CookieTranslator,
        dispatch::{AuthenticationManager, RoutedRequest, SessionManager},
        matcher::ApplicationMatcher,
        path::PathResolver,
        virtual_host::VirtualHostRegistry,
        RequestContext, ServerContext,
    },
    Request,
};

/// Routes host requests to applications and servlets.
///
/// Built once at initialization and only read afterwards, so one router
/// can be shared by any number of concurrent requests.
pub struct RequestRouter {
    matcher: ApplicationMatcher,
    resolver: PathResolver,
    cookies: CookieTranslator,
    session_manager: Option<Arc<dyn SessionManager>>,
    authentication_manager: Option<Arc<dyn AuthenticationManager>>,
}

impl RequestRouter {
    /// Builds the router for the module named `handler_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if an application pattern fails to compile.
    pub fn new(context: &ServerContext, handler_name: &str) -> Result<Self, ConfigError> {
        let config = context.config();
        let registry = VirtualHostRegistry::from_config(config);
        let matcher = ApplicationMatcher::build(
            &context
                .container()
                .applications(),
            &registry,
        )?;

        let mut router = Self::from_parts(
            matcher,
            PathResolver::new(config.handlers().clone(), handler_name),
            CookieTranslator::new(config.session_name()),
        );
        router.session_manager = context
            .session_manager()
            .cloned();
        router.authentication_manager = context
            .authentication_manager()
            .cloned();

        Ok(router)
    }

    pub fn from_parts(
        matcher: ApplicationMatcher,
        resolver: PathResolver,
        cookies: CookieTranslator,
    ) -> Self {
        Self { matcher, resolver, cookies, session_manager: None, authentication_manager: None }
    }

    pub fn matcher(&self) -> &ApplicationMatcher {
        &self.matcher
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Routes `request` to an application and servlet.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::UnresolvedPath`] if no servlet can be found
    /// in the path, or [`RoutingError::NoApplicationMatch`] if the host is
    /// malformed or no application serves the host and URI.
    pub fn route(
        &self,
        request: &Request,
        context: &RequestContext,
    ) -> Result<RoutedRequest, RoutingError> {
        let uri = request.uri();
        let host = request_host(request.headers(), uri);

        self.route_inner(request, context, &host)
            .map_err(|e| {
                warn!("Routing {}{} failed: {}", host, uri, e);
                e
            })
    }

    fn route_inner(
        &self,
        request: &Request,
        context: &RequestContext,
        host: &str,
    ) -> Result<RoutedRequest, RoutingError> {
        let cookies = self
            .cookies
            .parse_headers(request.headers());
        let session_id = self
            .cookies
            .extract_session_id(&cookies);

        let uri = request.uri();
        let (mut servlet_path, path_info) = self
            .resolver
            .resolve(uri.path())?
            .into_parts();

        let uri_with_query = uri
            .path_and_query()
            .map(|path_and_query| path_and_query.as_str())
            .unwrap_or_else(|| uri.path());
        // The host is matched together with the URI, so it must not carry
        // its own path or query.
        if !is_valid_host(host) {
            return Err(RoutingError::NoApplicationMatch(uri_with_query.to_string()));
        }
        let application = self
            .matcher
            .find(host, uri_with_query)?;

        // Reached through /<name> rather than one of its own domains.
        let context_path = application.context_path();
        if !application.is_vhost_of(host) {
            if let Some(stripped) = servlet_path
                .strip_prefix(&context_path)
                .filter(|rest| rest.starts_with('/'))
            {
                servlet_path = stripped.to_string();
            }
        }

        Ok(RoutedRequest::builder(application)
            .method(
                request
                    .method()
                    .clone(),
            )
            .uri(uri.clone())
            .headers(
                request
                    .headers()
                    .clone(),
            )
            .body(
                request
                    .body()
                    .clone(),
            )
            .cookies(cookies)
            .requested_session_id(session_id)
            .servlet_path(&servlet_path)
            .path_info(&path_info)
            .context_path(&context_path)
            .server_vars(
                context
                    .server_vars()
                    .clone(),
            )
            .session_manager(
                self.session_manager
                    .clone(),
            )
            .authentication_manager(
                self.authentication_manager
                    .clone(),
            )
            .build())
    }
}

/// Returns the lower-cased host of a request without its port.
///
/// The `Host` header wins over the URI authority; a request carrying
/// neither has an empty host.
pub fn request_host(headers: &HeaderMap, uri: &Uri) -> String {
    let host = headers
        .get(HOST)
        .and_then(|value| {
            value
                .to_str()
                .ok()
        })
        .map(strip_port)
        .or_else(|| uri.host())
        .unwrap_or("");

    host.to_ascii_lowercase()
}

/// Checks a lower-cased, port-less host against the host grammar.
///
/// Accepts a registered name or IPv4 address made of letters, digits, `.`
/// and `-`, a bracketed IPv6 literal, or the empty host.
pub fn is_valid_host(host: &str) -> bool {
    if let Some(literal) = host
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        return !literal.is_empty()
            && literal
                .chars()
                .all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.');
    }

    host.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }

    match host.split_once(':') {
        Some((name, _port)) => name,
        None => host,
    }
}

//! Request cookie parsing and `Set-Cookie` rendering.
//!
//! Incoming `Cookie` headers are split on `"; "` and every token on its
//! first `=`, so values may contain `=` themselves. A malformed token is
//! dropped on its own; it never invalidates the rest of the header.

use std::{fmt, str::FromStr, time::SystemTime};

use http::{header::COOKIE, HeaderMap};
use log::debug;

use crate::{errors::CookieError, utils::date::format_cookie_date};

const COOKIE_SEPARATOR: &str = "; ";

/// A single `name=value` pair sent by the client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedCookie {
    name: String,
    value: String,
}

impl ParsedCookie {
    pub fn new(name: &str, value: &str) -> Self {
        Self { name: name.to_string(), value: value.to_string() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl FromStr for ParsedCookie {
    type Err = CookieError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let Some((name, value)) = token.split_once('=') else {
            return Err(CookieError::Malformed(token.to_string()));
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(CookieError::Malformed(token.to_string()));
        }

        Ok(Self::new(name, value))
    }
}

/// Translates `Cookie` headers into [`ParsedCookie`]s and finds the
/// requested session.
///
/// # Examples
///
/// ```rust,ignore
/// use servlet_dispatch::server::cookie::CookieTranslator;
///
/// let translator = CookieTranslator::new("SESSID");
/// let cookies = translator.parse("SESSID=xyz; other=1");
///
/// assert_eq!(translator.extract_session_id(&cookies), Some("xyz".to_string()));
/// ```
#[derive(Clone, Debug)]
pub struct CookieTranslator {
    session_name: String,
}

impl CookieTranslator {
    pub fn new(session_name: &str) -> Self {
        Self { session_name: session_name.to_string() }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Parses one `Cookie` header value, preserving header order.
    pub fn parse(&self, header: &str) -> Vec<ParsedCookie> {
        header
            .split(COOKIE_SEPARATOR)
            .filter(|token| !token.is_empty())
            .filter_map(|token| match token.parse::<ParsedCookie>() {
                Ok(cookie) => Some(cookie),
                Err(e) => {
                    debug!("Dropping cookie: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Parses every `Cookie` header of a request, in header order.
    pub fn parse_headers(&self, headers: &HeaderMap) -> Vec<ParsedCookie> {
        let mut cookies = Vec::new();
        for value in headers.get_all(COOKIE) {
            match value.to_str() {
                Ok(header) => cookies.extend(self.parse(header)),
                Err(_) => debug!("Dropping non-ASCII cookie header"),
            }
        }
        cookies
    }

    /// Returns the value of the first cookie named after the session.
    pub fn extract_session_id(&self, cookies: &[ParsedCookie]) -> Option<String> {
        cookies
            .iter()
            .find(|cookie| cookie.name() == self.session_name)
            .map(|cookie| {
                cookie
                    .value()
                    .to_string()
            })
    }
}

/// A cookie set by the engine, rendered as a `Set-Cookie` header value.
///
/// # Examples
///
/// ```rust,ignore
/// use servlet_dispatch::server::cookie::ResponseCookie;
///
/// let cookie = ResponseCookie::new("SESSID", "xyz")
///     .path("/example")
///     .http_only(true);
///
/// assert_eq!(cookie.to_string(), "SESSID=xyz; Path=/example; HttpOnly");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResponseCookie {
    name: String,
    value: String,
    expires: Option<SystemTime>,
    max_age: Option<i64>,
    domain: Option<String>,
    path: Option<String>,
    secure: bool,
    http_only: bool,
}

impl ResponseCookie {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            expires: None,
            max_age: None,
            domain: None,
            path: None,
            secure: false,
            http_only: false,
        }
    }

    pub fn expires(mut self, expires: SystemTime) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ResponseCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;

        if let Some(expires) = self.expires {
            if let Ok(date) = format_cookie_date(expires) {
                write!(f, "; Expires={}", date)?;
            }
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age)?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        if let Some(path) = &self.path {
            write!(f, "; Path={}", path)?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }

        Ok(())
    }
}

//! Servlet path / path info resolution.
//!
//! A request path is walked from its last segment towards the root. The
//! first segment whose extension is registered for this module ends the
//! servlet path, everything after it is delivered as path info, the way a
//! CGI front controller receives `PATH_INFO`:
//!
//! ```text
//! /app/index.phtml/admin/dashboard
//! |-- servlet path -|-- path info --|
//! ```

use crate::{config::HandlerMap, errors::RoutingError};

/// Result of a successful resolution.
///
/// `servlet_path + path_info` always equals the resolved path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedPath {
    servlet_path: String,
    path_info: String,
}

impl ResolvedPath {
    pub fn servlet_path(&self) -> &str {
        &self.servlet_path
    }

    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    pub fn into_parts(self) -> (String, String) {
        (self.servlet_path, self.path_info)
    }
}

/// Directory, basename and extension of a path, as slices of that path.
struct PathParts<'a> {
    dirname: &'a str,
    basename: &'a str,
}

impl<'a> PathParts<'a> {
    fn split(path: &'a str) -> Self {
        match path.rfind('/') {
            Some(index) => Self { dirname: &path[..index], basename: &path[index + 1..] },
            None => Self { dirname: "", basename: path },
        }
    }

    fn extension(&self) -> Option<&'a str> {
        self.basename
            .rfind('.')
            .map(|index| &self.basename[index + 1..])
            .filter(|extension| !extension.is_empty())
    }
}

/// Resolves request paths against the extension handler map.
#[derive(Clone, Debug)]
pub struct PathResolver {
    handlers: HandlerMap,
    handler_name: String,
}

impl PathResolver {
    /// Creates a resolver accepting extensions handled by `handler_name`.
    pub fn new(handlers: HandlerMap, handler_name: &str) -> Self {
        Self { handlers, handler_name: handler_name.to_string() }
    }

    pub fn handlers(&self) -> &HandlerMap {
        &self.handlers
    }

    /// Splits `path` (without query string) into servlet path and path info.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::UnresolvedPath`] when the root is reached
    /// without finding a segment handled by this module.
    pub fn resolve(&self, path: &str) -> Result<ResolvedPath, RoutingError> {
        let mut current = path.trim_end_matches('/');

        while !current.is_empty() {
            let parts = PathParts::split(current);

            if let Some(extension) = parts.extension() {
                if self.handles(extension) {
                    return Ok(ResolvedPath {
                        servlet_path: current.to_string(),
                        path_info: path[current.len()..].to_string(),
                    });
                }
            }

            current = parts
                .dirname
                .trim_end_matches('/');
        }

        Err(RoutingError::UnresolvedPath(path.to_string()))
    }

    fn handles(&self, extension: &str) -> bool {
        self.handlers
            .handler_name(&format!(".{}", extension))
            == Some(self.handler_name.as_str())
    }
}

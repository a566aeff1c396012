//! Host + URI to application matching.
//!
//! The matcher keeps an ordered list of [`PatternBinding`]s built once at
//! initialization:
//!
//! ```text
//! ^www.example.local(?:[/?].*)?$          => example    (virtual host)
//! ^shop.local(?:[/?].*)?$                 => shop       (virtual host)
//! ^[a-z0-9.\-\[\]:]*/example(?:[/?].*)?$  => example    (wildcard)
//! ^[a-z0-9.\-\[\]:]*/shop(?:[/?].*)?$     => shop       (wildcard)
//! ```
//!
//! Virtual host patterns are inserted at the front, wildcard patterns are
//! appended, so a named virtual host always wins over the generic
//! `/<application>` routing. The first matching pattern wins.

use std::{collections::VecDeque, sync::Arc};

use log::debug;
use regex::Regex;

use crate::{
    errors::{ConfigError, RoutingError},
    server::{
        application::Application,
        virtual_host::{VirtualHost, VirtualHostRegistry},
    },
};

/// How a binding reaches its application.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BindingKind {
    /// Through the domain of a virtual host bound to the application
    VirtualHost,
    /// Through the application's context path on any host
    Wildcard,
}

/// A compiled pattern and the application it routes to.
#[derive(Clone, Debug)]
pub struct PatternBinding {
    pattern: Regex,
    kind: BindingKind,
    application: Arc<Application>,
}

impl PatternBinding {
    /// Creates the pattern matching `domain` optionally followed by a path.
    pub fn virtual_host(
        virtual_host: &VirtualHost,
        application: Arc<Application>,
    ) -> Result<Self, ConfigError> {
        let pattern = format!(r"^{}(?:[/?].*)?$", regex::escape(virtual_host.domain()));
        Self::compile(&pattern, BindingKind::VirtualHost, application)
    }

    /// Creates the pattern matching any host followed by `/<name>` and an
    /// optional path.
    pub fn wildcard(application: Arc<Application>) -> Result<Self, ConfigError> {
        let pattern = format!(r"^[a-z0-9.\-\[\]:]*/{}(?:[/?].*)?$", regex::escape(application.name()));
        Self::compile(&pattern, BindingKind::Wildcard, application)
    }

    fn compile(
        pattern: &str,
        kind: BindingKind,
        application: Arc<Application>,
    ) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern).map_err(|e| ConfigError::Pattern(e.to_string()))?;
        Ok(Self { pattern, kind, application })
    }

    pub fn pattern(&self) -> &str {
        self.pattern
            .as_str()
    }

    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    pub fn application(&self) -> &Arc<Application> {
        &self.application
    }

    pub fn is_match(&self, url: &str) -> bool {
        self.pattern
            .is_match(url)
    }
}

/// Ordered, read-only list of pattern bindings.
///
/// # Examples
///
/// ```rust,ignore
/// use servlet_dispatch::server::matcher::ApplicationMatcher;
///
/// let matcher = ApplicationMatcher::build(&container.applications(), &registry)?;
/// let application = matcher.find("example.local", "/index.phtml")?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct ApplicationMatcher {
    bindings: Vec<PatternBinding>,
}

impl ApplicationMatcher {
    /// Builds the bindings using the default virtual host affinity,
    /// see [`VirtualHost::matches`].
    pub fn build(
        applications: &[Arc<Application>],
        registry: &VirtualHostRegistry,
    ) -> Result<Self, ConfigError> {
        Self::build_with(applications, registry, |virtual_host, application| {
            virtual_host.matches(application)
        })
    }

    /// Builds the bindings deciding host to application affinity with `affinity`.
    ///
    /// Every virtual host matching an application is bound to it and its
    /// pattern inserted at the front; afterwards the application's
    /// wildcard pattern is appended at the end.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Application`] for an application whose name
    /// is empty or contains a path separator, and [`ConfigError::Pattern`]
    /// if a pattern fails to compile.
    pub fn build_with<F>(
        applications: &[Arc<Application>],
        registry: &VirtualHostRegistry,
        affinity: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&VirtualHost, &Application) -> bool,
    {
        let mut bindings = VecDeque::new();

        for application in applications {
            let name = application.name();
            if name.is_empty() {
                return Err(ConfigError::Application("application name is empty".to_string()));
            }
            if name.contains('/') {
                return Err(ConfigError::Application(format!(
                    "application name {} contains a path separator",
                    name
                )));
            }

            for virtual_host in registry {
                if affinity(virtual_host, application) {
                    application.add_virtual_host(virtual_host.clone());
                    bindings.push_front(PatternBinding::virtual_host(
                        virtual_host,
                        application.clone(),
                    )?);
                }
            }

            bindings.push_back(PatternBinding::wildcard(application.clone())?);
        }

        Ok(Self { bindings: bindings.into() })
    }

    /// Returns the first binding matching `host` followed by `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::NoApplicationMatch`] if no pattern matches.
    pub fn find_binding(&self, host: &str, uri: &str) -> Result<&PatternBinding, RoutingError> {
        let url = format!("{}{}", host, uri);

        let binding = self
            .bindings
            .iter()
            .find(|binding| binding.is_match(&url))
            .ok_or_else(|| RoutingError::NoApplicationMatch(uri.to_string()))?;

        debug!("{} matched {} ({:?})", url, binding.pattern(), binding.kind());
        Ok(binding)
    }

    /// Returns the application serving `host` followed by `uri`.
    pub fn find(&self, host: &str, uri: &str) -> Result<Arc<Application>, RoutingError> {
        self.find_binding(host, uri)
            .map(|binding| {
                binding
                    .application()
                    .clone()
            })
    }

    pub fn bindings(&self) -> &[PatternBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings
            .is_empty()
    }
}

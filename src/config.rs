//! Configuration builders and types for the servlet module.
//!
//! This module provides a fluent builder API for configuring:
//! - Virtual hosts (domain, document root)
//! - The extension to handler map
//! - The server itself (document root, session cookie name)
//! - Deployed applications (only used when no container is available,
//!   e.g. by the `servlet-route` binary)
//!
//! Configurations can also be loaded from YAML:
//!
//! ```yaml
//! server:
//!   document_root: /opt/appserver/webapps
//!   session_name: SESSID
//!   virtual_hosts:
//!     - domain: example.local
//!       document_root: /opt/appserver/webapps/example
//!   handlers:
//!     .phtml:
//!       name: servlet
//! applications:
//!   - name: example
//!     webapp_path: /opt/appserver/webapps/example
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use servlet_dispatch::config::{HandlerConfig, ServerConfig, VirtualHostConfig};
//!
//! let config = ServerConfig::builder()
//!     .document_root("/opt/appserver/webapps")
//!     .add_virtual_host(
//!         VirtualHostConfig::builder()
//!             .domain("example.local")
//!             .document_root("/opt/appserver/webapps/example")
//!             .build()?,
//!     )
//!     .handler(".phtml", HandlerConfig::builder().name("servlet").build()?)
//!     .build()?;
//! ```

use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

use crate::errors::ConfigError;

/// Name of the session cookie used when none is configured.
pub const DEFAULT_SESSION_NAME: &str = "SESSID";

fn default_session_name() -> String {
    DEFAULT_SESSION_NAME.to_string()
}

/// Builder for creating `HandlerConfig` instances.
#[derive(Clone)]
pub struct HandlerConfigBuilder {
    name: String,
    params: HashMap<String, String>,
}

impl HandlerConfigBuilder {
    /// Sets the name of the module that handles the extension.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Adds a handler parameter.
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Creates the `HandlerConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler name is empty.
    pub fn build(self) -> Result<HandlerConfig, ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Handler("handler name is empty".to_string()));
        }

        Ok(HandlerConfig { name: self.name, params: self.params })
    }
}

/// A file extension handler registered with the server.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HandlerConfig {
    name: String,
    #[serde(default)]
    params: HashMap<String, String>,
}

impl HandlerConfig {
    pub fn builder() -> HandlerConfigBuilder {
        HandlerConfigBuilder { name: String::new(), params: HashMap::new() }
    }

    /// Returns the name of the module handling the extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }
}

/// Mapping from file extension (including the leading dot) to its handler.
///
/// The map is read-only once the module has been initialized.
///
/// # Examples
///
/// ```rust,ignore
/// use servlet_dispatch::config::{HandlerConfig, HandlerMap};
///
/// let mut handlers = HandlerMap::new();
/// handlers.insert(".phtml", HandlerConfig::builder().name("servlet").build()?)?;
///
/// assert_eq!(handlers.handler_name(".phtml"), Some("servlet"));
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(try_from = "HashMap<String, HandlerConfig>")]
pub struct HandlerMap {
    handlers: HashMap<String, HandlerConfig>,
}

impl HandlerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for the given extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension does not start with a dot.
    pub fn insert(&mut self, extension: &str, handler: HandlerConfig) -> Result<(), ConfigError> {
        if !extension.starts_with('.') || extension.len() < 2 {
            return Err(ConfigError::Handler(format!(
                "extension {} must start with a dot",
                extension
            )));
        }

        self.handlers
            .insert(extension.to_string(), handler);
        Ok(())
    }

    pub fn get(&self, extension: &str) -> Option<&HandlerConfig> {
        self.handlers
            .get(extension)
    }

    /// Returns the module name registered for the extension, if any.
    pub fn handler_name(&self, extension: &str) -> Option<&str> {
        self.get(extension)
            .map(HandlerConfig::name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers
            .is_empty()
    }
}

impl TryFrom<HashMap<String, HandlerConfig>> for HandlerMap {
    type Error = ConfigError;

    fn try_from(handlers: HashMap<String, HandlerConfig>) -> Result<Self, Self::Error> {
        let mut map = HandlerMap::new();
        for (extension, handler) in handlers {
            map.insert(&extension, handler)?;
        }
        Ok(map)
    }
}

/// Builder for creating `VirtualHostConfig` instances.
///
/// # Examples
///
/// ```rust,ignore
/// use servlet_dispatch::config::VirtualHostConfig;
///
/// let config = VirtualHostConfig::builder()
///     .domain("example.local")
///     .document_root("/opt/appserver/webapps/example")
///     .build()?;
/// ```
#[derive(Clone)]
pub struct VirtualHostConfigBuilder {
    domain: String,
    document_root: String,
}

impl VirtualHostConfigBuilder {
    /// Sets the domain requests must carry in their `Host` header.
    pub fn domain(mut self, domain: &str) -> Self {
        self.domain = domain.to_string();
        self
    }

    /// Sets the document root of the virtual host.
    ///
    /// The part below the server document root names the application
    /// served by this virtual host.
    pub fn document_root(mut self, document_root: &str) -> Self {
        self.document_root = document_root.to_string();
        self
    }

    /// Creates the `VirtualHostConfig` with the configured settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain is empty.
    pub fn build(self) -> Result<VirtualHostConfig, ConfigError> {
        let config = VirtualHostConfig { domain: self.domain, document_root: self.document_root };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration for a virtual host.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct VirtualHostConfig {
    domain: String,
    #[serde(default)]
    document_root: String,
}

impl VirtualHostConfig {
    /// Creates a new `VirtualHostConfigBuilder`.
    ///
    /// Default values:
    /// - domain: empty string (must be set)
    /// - document_root: empty string
    pub fn builder() -> VirtualHostConfigBuilder {
        VirtualHostConfigBuilder { domain: String::new(), document_root: String::new() }
    }

    /// Returns the domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the document root.
    pub fn document_root(&self) -> &str {
        &self.document_root
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self
            .domain
            .trim()
            .is_empty()
        {
            return Err(ConfigError::VirtualHost("domain is empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for creating `ServerConfig` instances.
#[derive(Clone)]
pub struct ServerConfigBuilder {
    document_root: String,
    virtual_hosts: Vec<VirtualHostConfig>,
    handlers: HandlerMap,
    session_name: String,
    handler_error: Option<ConfigError>,
}

impl ServerConfigBuilder {
    /// Sets the server document root, the directory containing the applications.
    pub fn document_root(mut self, document_root: &str) -> Self {
        self.document_root = document_root.to_string();
        self
    }

    /// Adds a virtual host configuration.
    pub fn add_virtual_host(mut self, virtual_host: VirtualHostConfig) -> Self {
        self.virtual_hosts
            .push(virtual_host);
        self
    }

    /// Registers a handler for a file extension, e.g. `.phtml`.
    ///
    /// An invalid extension is reported by [`ServerConfigBuilder::build`].
    pub fn handler(mut self, extension: &str, handler: HandlerConfig) -> Self {
        if let Err(e) = self
            .handlers
            .insert(extension, handler)
        {
            self.handler_error
                .get_or_insert(e);
        }
        self
    }

    /// Sets the name of the cookie carrying the session identifier.
    pub fn session_name(mut self, session_name: &str) -> Self {
        self.session_name = session_name.to_string();
        self
    }

    /// Creates the `ServerConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler extension or virtual host is invalid,
    /// or if the session name is empty.
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        if let Some(error) = self.handler_error {
            return Err(error);
        }

        let config = ServerConfig {
            document_root: self.document_root,
            virtual_hosts: self.virtual_hosts,
            handlers: self.handlers,
            session_name: self.session_name,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Server configuration consumed by the servlet module.
///
/// # Examples
///
/// ```rust,ignore
/// use servlet_dispatch::config::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .document_root("/opt/appserver/webapps")
///     .build()?;
///
/// assert_eq!(config.session_name(), "SESSID");
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    document_root: String,
    #[serde(default)]
    virtual_hosts: Vec<VirtualHostConfig>,
    #[serde(default)]
    handlers: HandlerMap,
    #[serde(default = "default_session_name")]
    session_name: String,
}

impl ServerConfig {
    /// Creates a new `ServerConfigBuilder`.
    ///
    /// Default values:
    /// - document_root: empty string
    /// - virtual_hosts: none
    /// - handlers: none
    /// - session_name: `SESSID`
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            document_root: String::new(),
            virtual_hosts: Vec::new(),
            handlers: HandlerMap::new(),
            session_name: default_session_name(),
            handler_error: None,
        }
    }

    pub fn document_root(&self) -> &str {
        &self.document_root
    }

    pub fn virtual_hosts(&self) -> &Vec<VirtualHostConfig> {
        &self.virtual_hosts
    }

    pub fn handlers(&self) -> &HandlerMap {
        &self.handlers
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for virtual_host in &self.virtual_hosts {
            virtual_host.validate()?;
        }

        if self
            .session_name
            .is_empty()
        {
            return Err(ConfigError::Session("session name is empty".to_string()));
        }

        Ok(())
    }
}

/// Builder for creating `ApplicationConfig` instances.
#[derive(Clone)]
pub struct ApplicationConfigBuilder {
    name: String,
    webapp_path: String,
}

impl ApplicationConfigBuilder {
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn webapp_path(mut self, webapp_path: &str) -> Self {
        self.webapp_path = webapp_path.to_string();
        self
    }

    /// Creates the `ApplicationConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or contains a path separator.
    pub fn build(self) -> Result<ApplicationConfig, ConfigError> {
        let config = ApplicationConfig { name: self.name, webapp_path: self.webapp_path };
        config.validate()?;
        Ok(config)
    }
}

/// A deployed application, as described in a configuration file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ApplicationConfig {
    name: String,
    #[serde(default)]
    webapp_path: String,
}

impl ApplicationConfig {
    pub fn builder() -> ApplicationConfigBuilder {
        ApplicationConfigBuilder { name: String::new(), webapp_path: String::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn webapp_path(&self) -> &str {
        &self.webapp_path
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Application("application name is empty".to_string()));
        }
        if self.name.contains('/') {
            return Err(ConfigError::Application(format!(
                "application name {} contains a path separator",
                self.name
            )));
        }
        Ok(())
    }
}

/// Complete configuration file: the server plus the deployed applications.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ServletConfig {
    server: ServerConfig,
    #[serde(default)]
    applications: Vec<ApplicationConfig>,
}

impl ServletConfig {
    pub fn new(server: ServerConfig, applications: Vec<ApplicationConfig>) -> Self {
        Self { server, applications }
    }

    /// Parses and validates a YAML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the YAML is invalid, or the
    /// validation error of the first invalid entry.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config = serde_yaml_ng::from_str::<ServletConfig>(yaml)
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        config
            .server
            .validate()?;
        for application in &config.applications {
            application.validate()?;
        }

        Ok(config)
    }

    /// Reads and parses a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn applications(&self) -> &Vec<ApplicationConfig> {
        &self.applications
    }
}

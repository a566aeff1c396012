//! Virtual hosts known to the servlet module.
//!
//! A virtual host is a `(domain, app base)` pair. The app base is the
//! virtual host's document root relative to the server document root and
//! names the application the domain is bound to.
//!
//! # Examples
//!
//! ```rust,ignore
//! use servlet_dispatch::{config::ServerConfig, server::virtual_host::VirtualHostRegistry};
//!
//! let registry = VirtualHostRegistry::from_config(&config);
//! for virtual_host in registry.iter() {
//!     println!("{} -> {}", virtual_host.domain(), virtual_host.app_base());
//! }
//! ```

use std::slice::Iter;

use crate::{config::ServerConfig, server::application::Application};

/// A configured virtual host.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VirtualHost {
    domain: String,
    app_base: String,
}

impl VirtualHost {
    pub fn new(domain: &str, app_base: &str) -> Self {
        Self { domain: domain.to_ascii_lowercase(), app_base: app_base.to_string() }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn app_base(&self) -> &str {
        &self.app_base
    }

    /// Host to application affinity: the virtual host serves the
    /// application whose name equals its app base.
    pub fn matches(&self, application: &Application) -> bool {
        self.app_base
            .trim_matches('/')
            == application.name()
    }
}

/// Immutable set of virtual hosts built from the server configuration.
#[derive(Clone, Debug, Default)]
pub struct VirtualHostRegistry {
    virtual_hosts: Vec<VirtualHost>,
}

impl VirtualHostRegistry {
    pub fn new(virtual_hosts: Vec<VirtualHost>) -> Self {
        Self { virtual_hosts }
    }

    /// Builds the registry from the server configuration.
    ///
    /// The app base of each virtual host is its document root with the
    /// server document root stripped.
    pub fn from_config(config: &ServerConfig) -> Self {
        let document_root = config.document_root();

        let virtual_hosts = config
            .virtual_hosts()
            .iter()
            .map(|virtual_host| {
                let app_base = if document_root.is_empty() {
                    virtual_host.document_root()
                } else {
                    virtual_host
                        .document_root()
                        .strip_prefix(document_root)
                        .unwrap_or(virtual_host.document_root())
                };
                VirtualHost::new(virtual_host.domain(), app_base)
            })
            .collect();

        Self { virtual_hosts }
    }

    pub fn iter(&self) -> Iter<'_, VirtualHost> {
        self.virtual_hosts
            .iter()
    }

    pub fn len(&self) -> usize {
        self.virtual_hosts
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.virtual_hosts
            .is_empty()
    }
}

impl<'a> IntoIterator for &'a VirtualHostRegistry {
    type Item = &'a VirtualHost;
    type IntoIter = Iter<'a, VirtualHost>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

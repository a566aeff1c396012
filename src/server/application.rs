//! Deployed applications and the container that owns them.
//!
//! Applications are owned by the deployment subsystem. The servlet module
//! only reads their names and bound virtual hosts, and binds matching
//! virtual hosts to them while building its patterns.

use std::sync::{Arc, PoisonError, RwLock};

use crate::{config::ApplicationConfig, server::virtual_host::VirtualHost};

/// A deployed web application.
#[derive(Debug)]
pub struct Application {
    name: String,
    webapp_path: String,
    virtual_hosts: RwLock<Vec<VirtualHost>>,
}

impl Application {
    pub fn new(name: &str, webapp_path: &str) -> Self {
        Self {
            name: name.to_string(),
            webapp_path: webapp_path.to_string(),
            virtual_hosts: RwLock::new(Vec::new()),
        }
    }

    pub fn from_config(config: &ApplicationConfig) -> Self {
        Self::new(config.name(), config.webapp_path())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn webapp_path(&self) -> &str {
        &self.webapp_path
    }

    /// Returns the context path the application is mounted at, e.g. `/example`.
    pub fn context_path(&self) -> String {
        format!("/{}", self.name)
    }

    /// Binds a virtual host to the application.
    ///
    /// Binding the same domain twice is a no-op, so rebuilding the
    /// patterns does not accumulate duplicates.
    pub fn add_virtual_host(&self, virtual_host: VirtualHost) {
        let mut virtual_hosts = self
            .virtual_hosts
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if virtual_hosts
            .iter()
            .all(|bound| !bound.domain().eq_ignore_ascii_case(virtual_host.domain()))
        {
            virtual_hosts.push(virtual_host);
        }
    }

    /// Returns a snapshot of the virtual hosts bound to the application.
    pub fn virtual_hosts(&self) -> Vec<VirtualHost> {
        self.virtual_hosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns true if one of the bound virtual hosts serves `host`.
    pub fn is_vhost_of(&self, host: &str) -> bool {
        self.virtual_hosts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|virtual_host| {
                virtual_host
                    .domain()
                    .eq_ignore_ascii_case(host)
            })
    }
}

/// The deployment container the applications are read from.
pub trait Container: Send + Sync {
    /// Returns the deployed applications in deployment order.
    fn applications(&self) -> Vec<Arc<Application>>;
}

/// A container holding a fixed set of applications.
///
/// Used when applications are described in a configuration file rather
/// than discovered by a deployment subsystem.
#[derive(Debug, Default)]
pub struct StaticContainer {
    applications: Vec<Arc<Application>>,
}

impl StaticContainer {
    pub fn new(applications: Vec<Application>) -> Self {
        Self {
            applications: applications
                .into_iter()
                .map(Arc::new)
                .collect(),
        }
    }

    pub fn from_configs(configs: &[ApplicationConfig]) -> Self {
        Self::new(
            configs
                .iter()
                .map(Application::from_config)
                .collect(),
        )
    }

    pub fn push(&mut self, application: Application) {
        self.applications
            .push(Arc::new(application));
    }
}

impl Container for StaticContainer {
    fn applications(&self) -> Vec<Arc<Application>> {
        self.applications
            .clone()
    }
}

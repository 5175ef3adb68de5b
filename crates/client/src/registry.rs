//! Application-owned entry point holding the configuration, the shared
//! transport, and one client per resource kind.

use std::sync::Arc;

use query::{ClientConfig, HttpTransport, QueryError, ResourceKind};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::http::ReqwestTransport;
use crate::resource::ResourceClient;

/// Builds the shared transport for a configuration.
pub type TransportFactory =
    Arc<dyn Fn(&ClientConfig) -> Result<Arc<dyn HttpTransport>, QueryError> + Send + Sync>;

pub struct Registry {
    config: Arc<ClientConfig>,
    factory: TransportFactory,
    transport: Arc<dyn HttpTransport>,
    clients: Vec<ResourceClient>,
}

impl Registry {
    /// A registry backed by `reqwest`.
    pub fn new(config: ClientConfig) -> Result<Self, QueryError> {
        let factory: TransportFactory = Arc::new(
            |config: &ClientConfig| -> Result<Arc<dyn HttpTransport>, QueryError> {
                Ok(Arc::new(ReqwestTransport::new(config)?))
            },
        );
        Self::with_transport_factory(config, factory)
    }

    /// A registry whose transport is produced by `factory`, both now and on
    /// every configuration update.
    pub fn with_transport_factory(
        config: ClientConfig,
        factory: TransportFactory,
    ) -> Result<Self, QueryError> {
        config.validate()?;
        let config = Arc::new(config);
        let transport = factory(&config)?;
        let clients = build_clients(&transport, &config);
        Ok(Self {
            config,
            factory,
            transport,
            clients,
        })
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> ClientConfig {
        self.config.as_ref().clone()
    }

    /// Applies `update`, then swaps the transport and rebuilds every resource
    /// client. Requests already issued on the old transport run to
    /// completion. On error the registry is left unchanged.
    pub fn update_config(
        &mut self,
        update: impl FnOnce(&mut ClientConfig),
    ) -> Result<(), QueryError> {
        let mut config = self.config();
        update(&mut config);
        config.validate()?;

        let config = Arc::new(config);
        let transport = (self.factory)(&config)?;
        self.clients = build_clients(&transport, &config);
        self.transport = transport;
        self.config = config;
        info!(base_url = %self.config.base_url, "Configuration updated");
        Ok(())
    }

    pub fn resource(&mut self, kind: ResourceKind) -> &mut ResourceClient {
        &mut self.clients[kind.index()]
    }

    /// A fresh client for `kind` decoding items into `T`, sharing this
    /// registry's transport and configuration.
    pub fn typed<T: DeserializeOwned>(&self, kind: ResourceKind) -> ResourceClient<T> {
        ResourceClient::new(kind, self.transport.clone(), self.config.clone())
    }

    pub fn works(&mut self) -> &mut ResourceClient {
        self.resource(ResourceKind::Works)
    }

    pub fn authors(&mut self) -> &mut ResourceClient {
        self.resource(ResourceKind::Authors)
    }

    pub fn sources(&mut self) -> &mut ResourceClient {
        self.resource(ResourceKind::Sources)
    }

    pub fn institutions(&mut self) -> &mut ResourceClient {
        self.resource(ResourceKind::Institutions)
    }

    pub fn topics(&mut self) -> &mut ResourceClient {
        self.resource(ResourceKind::Topics)
    }

    pub fn keywords(&mut self) -> &mut ResourceClient {
        self.resource(ResourceKind::Keywords)
    }

    pub fn publishers(&mut self) -> &mut ResourceClient {
        self.resource(ResourceKind::Publishers)
    }

    pub fn funders(&mut self) -> &mut ResourceClient {
        self.resource(ResourceKind::Funders)
    }

    /// Closes every resource client.
    pub fn close(&mut self) {
        for client in &mut self.clients {
            client.close();
        }
    }
}

fn build_clients(
    transport: &Arc<dyn HttpTransport>,
    config: &Arc<ClientConfig>,
) -> Vec<ResourceClient<Value>> {
    ResourceKind::ALL
        .iter()
        .map(|&kind| ResourceClient::new(kind, transport.clone(), config.clone()))
        .collect()
}

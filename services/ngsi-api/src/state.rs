//! Application state for the NGSI API.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::ServerConfig;
use crate::memory::MemoryBackend;
use crate::operations::Handlers;

/// Shared application state.
pub struct AppState {
    /// One handler per operation.
    pub handlers: Handlers,

    /// Service configuration.
    pub config: ServerConfig,

    /// Prometheus exporter, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state dispatching to the given handlers.
    pub fn new(config: ServerConfig, handlers: Handlers) -> Self {
        Self {
            handlers,
            config,
            metrics: None,
        }
    }

    /// Create state backed by a [`MemoryBackend`] seeded from the configuration.
    ///
    /// Subscription operations stay unsupported when disabled in the configuration.
    pub fn in_memory(config: ServerConfig) -> Self {
        let backend = Arc::new(MemoryBackend::with_entities(
            config.seed_entities.iter().cloned(),
        ));

        let mut handlers = Handlers::unsupported().with_entity_backend(backend.clone());
        if config.subscriptions.enabled {
            handlers = handlers.with_subscription_backend(backend);
        }

        Self::new(config, handlers)
    }

    /// Attach the Prometheus exporter served at `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

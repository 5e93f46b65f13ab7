//! # Hookrelay Server
//!
//! Standalone relay that accepts source-control webhooks over HTTP and
//! publishes them to the configured message transport.

mod config;

pub use config::{
    load_config, parse_config, ConfigError, ServerConfig, DEFAULT_NAMESPACE, INDEX_URL_ENV,
    NAMESPACE_ENV,
};

use std::sync::Arc;

use axum::Router;
use hookrelay_adapter_kube::{KubeClient, KubeConfig, KubeError, KubeSecretStore};
use hookrelay_core::events::{FnHandler, ListenerSet, MessageHandler};
use hookrelay_core::{
    CachePolicy, CredentialResolver, EventDefinitions, EventError, EventProviders, RelayContext,
    SecretStore,
};
use hookrelay_webhooks::{webhook_routes, Envelope, WebhookGateway};

/// Errors that stop the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Kube(#[from] KubeError),
    #[error(transparent)]
    Events(#[from] EventError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// The relay server.
pub struct RelayServer {
    /// Server configuration.
    pub config: ServerConfig,
    store: Option<Arc<dyn SecretStore>>,
}

impl RelayServer {
    /// Creates a server reading secrets from the Kubernetes API.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            store: None,
        }
    }

    /// Reads secrets from `store` instead of the Kubernetes API.
    pub fn with_secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.store = Some(store);
        self
    }

    fn kube_store(&self) -> ServerResult<KubeSecretStore> {
        let config = match &self.config.kube_api_url {
            Some(url) => {
                tracing::info!(api_url = %url, "starting outside cluster");
                KubeConfig::new(url.clone())
            }
            None => {
                tracing::info!("starting inside cluster");
                KubeConfig::in_cluster()?
            }
        };
        Ok(KubeSecretStore::new(KubeClient::new(config)?))
    }

    /// Connects the message providers and builds the shared context.
    pub async fn build_context(&self) -> ServerResult<RelayContext> {
        let store: Arc<dyn SecretStore> = match &self.store {
            Some(store) => store.clone(),
            None => Arc::new(self.kube_store()?),
        };
        let resolver = CredentialResolver::new(store, self.config.namespace.clone())
            .with_cache_policy(CachePolicy::from_secs(self.config.credential_cache_secs));

        let definitions = EventDefinitions::load(&self.config.provider_config).inspect_err(|e| {
            tracing::error!(path = %self.config.provider_config, error = %e, "unable to load event definitions");
        })?;
        let providers = EventProviders::initialize(definitions).await?;

        Ok(RelayContext::new(Arc::new(providers), Arc::new(resolver)))
    }

    /// Returns the collection index URL from configuration or, failing that,
    /// from the Kabanero resource in the namespace.
    pub async fn resolve_index_url(&self) -> Option<String> {
        if let Some(url) = &self.config.index_url {
            tracing::info!(index_url = %url, "using configured collection index URL");
            return Some(url.clone());
        }
        if self.store.is_some() {
            return None;
        }

        let store = match self.kube_store() {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(error = %e, "unable to look up collection index URL");
                return None;
            }
        };
        match store.kabanero_index_url(&self.config.namespace).await {
            Ok(url) => {
                tracing::info!(index_url = %url, "found collection index URL");
                Some(url)
            }
            Err(e) => {
                tracing::warn!(error = %e, "unable to get collection index URL");
                None
            }
        }
    }

    /// Builds the webhook gateway for `context`.
    pub fn gateway(&self, context: RelayContext) -> WebhookGateway {
        let gateway =
            WebhookGateway::new(context).with_destination(self.config.webhook_destination.clone());
        match &self.config.webhook_secret {
            Some(secret) => gateway.with_secret(secret.clone()),
            None => gateway,
        }
    }

    /// Builds the HTTP router.
    pub fn router(&self, context: RelayContext) -> Router {
        webhook_routes(Arc::new(self.gateway(context)))
    }

    /// Starts one listener per configured event source.
    ///
    /// Received envelopes are logged.
    pub fn spawn_listeners(&self, context: &RelayContext) -> ListenerSet {
        let mut listeners = ListenerSet::new();
        for node in &context.providers.definitions().event_sources {
            match context.source(&node.name) {
                Ok((source, provider)) => {
                    listeners.spawn(provider, source, envelope_logger(&node.name));
                }
                Err(e) => tracing::error!(source = %node.name, error = %e, "unable to start listener"),
            }
        }
        listeners
    }

    /// Runs until ctrl-c or SIGTERM.
    pub async fn run(self) -> ServerResult<()> {
        let context = self.build_context().await?;
        match self.resolve_index_url().await {
            Some(url) => tracing::info!(index_url = %url, "collection index URL resolved"),
            None => tracing::warn!("no collection index URL, continuing without one"),
        }

        let listeners = self.spawn_listeners(&context);
        let app = self.router(context);

        let listener = tokio::net::TcpListener::bind(self.config.bind_address()).await?;
        tracing::info!(address = %self.config.bind_address(), "starting listener");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("shutting down");
        listeners.shutdown().await;
        Ok(())
    }
}

fn envelope_logger(source: &str) -> Arc<dyn MessageHandler> {
    let source = source.to_string();
    Arc::new(FnHandler::new(
        format!("{}-log", source),
        move |payload: &[u8]| {
            match Envelope::from_slice(payload) {
                Ok(envelope) => tracing::info!(
                    source = %source,
                    event = envelope.event_type().unwrap_or(""),
                    "received envelope"
                ),
                Err(_) => tracing::info!(source = %source, bytes = payload.len(), "received message"),
            }
            Ok(())
        },
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

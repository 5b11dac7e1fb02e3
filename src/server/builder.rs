//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::RestExposure;
use super::host::ServerHost;
use crate::auth::token::{Clock, SystemClock};
use crate::config::CatalogConfig;
use crate::core::service::Storage;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for creating the catalog HTTP server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(CatalogConfig::from_yaml_file("bookreview.yaml")?)
///     .with_storage(InMemoryStorage::new())
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: CatalogConfig,
    storage: Option<Arc<dyn Storage>>,
    clock: Arc<dyn Clock>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with default configuration
    pub fn new() -> Self {
        Self {
            config: CatalogConfig::default(),
            storage: None,
            clock: Arc::new(SystemClock),
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: CatalogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the storage backend (required)
    pub fn with_storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Share an existing storage backend
    pub fn with_shared_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replace the clock used for token expiry
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Add custom routes to the server
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the transport-agnostic host
    pub fn build_host(&self) -> Result<ServerHost> {
        let storage = self
            .storage
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Storage is required. Call .with_storage()"))?;
        ServerHost::new(&self.config, storage, self.clock.clone())
    }

    /// Build the final REST router with tracing and CORS layers
    pub fn build(self) -> Result<Router> {
        let host = Arc::new(self.build_host()?);
        Ok(Self::layered(RestExposure::build_router(host, self.custom_routes)?))
    }

    fn layered(router: Router) -> Router {
        router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
    }

    /// Serve the application with graceful shutdown
    ///
    /// Provisions the configured administrator first, then serves until
    /// SIGTERM or Ctrl+C.
    pub async fn serve(self, addr: &str) -> Result<()> {
        let host = Arc::new(self.build_host()?);
        if let Some(admin) = host.provision_admin(&self.config).await? {
            tracing::info!(username = %admin.username, "administrator account ready");
        }

        let app = Self::layered(RestExposure::build_router(host, self.custom_routes)?);
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

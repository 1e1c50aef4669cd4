//! Secondary server

use crate::common::shutdown::shutdown_signal;
use crate::common::{LogStore, Result, SecondaryConfig, SecondaryMetrics};
use crate::secondary::apply::ApplyEngine;
use crate::secondary::http::{create_router, SecondaryState};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct SecondaryServer {
    config: SecondaryConfig,
    node_id: String,
    state: SecondaryState,
}

impl SecondaryServer {
    pub fn new(config: SecondaryConfig, node_id: String) -> Self {
        let metrics = Arc::new(SecondaryMetrics::new());
        let engine = Arc::new(ApplyEngine::new(Arc::new(LogStore::new()), metrics.clone()));
        let state = SecondaryState {
            role: config.role,
            engine,
            metrics,
            apply_wait_timeout: config.apply_wait_timeout(),
        };
        Self {
            config,
            node_id,
            state,
        }
    }

    pub fn engine(&self) -> Arc<ApplyEngine> {
        self.state.engine.clone()
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_with_listener(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_with_listener(
        self,
        listener: TcpListener,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        tracing::info!("Starting secondary: {}", self.node_id);
        tracing::info!("  Role: {}", self.config.role);
        tracing::info!("  HTTP API: {}", listener.local_addr()?);
        tracing::info!("  Apply wait timeout: {:?}", self.config.apply_wait_timeout());

        let router = self.router();
        tracing::info!("✓ Secondary ready");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Secondary {} stopped", self.node_id);
        Ok(())
    }
}

//! Master server

use crate::common::shutdown::shutdown_signal;
use crate::common::{LogStore, MasterConfig, MasterMetrics, ReplicaRole, Result};
use crate::master::health::HealthMonitor;
use crate::master::http::{create_router, MasterState};
use crate::master::replication::ReplicationCoordinator;
use crate::master::secondary_client::{Replica, SecondaryClient};
use crate::master::sequencer::Sequencer;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct MasterServer {
    config: MasterConfig,
    node_id: String,
    state: MasterState,
}

impl MasterServer {
    /// Build the master from a validated config; fails on bad secondary addresses.
    pub fn new(config: MasterConfig, node_id: String) -> Result<Self> {
        config.validate()?;

        let replicas = ReplicaRole::ALL
            .into_iter()
            .map(|role| -> Result<Arc<dyn Replica>> {
                let client: Arc<dyn Replica> = Arc::new(SecondaryClient::new(
                    role,
                    config.secondary_url(role),
                    config.connect_timeout(),
                )?);
                Ok(client)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::with_replicas(config, node_id, replicas))
    }

    /// Build the master over arbitrary replication targets
    pub fn with_replicas(
        config: MasterConfig,
        node_id: String,
        replicas: Vec<Arc<dyn Replica>>,
    ) -> Self {
        let metrics = Arc::new(MasterMetrics::new());
        let health = Arc::new(HealthMonitor::new(
            replicas.clone(),
            config.heartbeat_interval(),
            config.heartbeats_number,
        ));
        let state = MasterState {
            store: Arc::new(LogStore::new()),
            sequencer: Arc::new(Sequencer::new()),
            coordinator: Arc::new(ReplicationCoordinator::new(replicas, metrics.clone())),
            health,
            metrics,
        };
        Self {
            config,
            node_id,
            state,
        }
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
        tracing::info!("Starting master: {}", self.node_id);
        tracing::info!("  HTTP API: {}", listener.local_addr()?);
        tracing::info!("  secondary-1: {}", self.config.secondary_1);
        tracing::info!("  secondary-2: {}", self.config.secondary_2);
        tracing::info!(
            "  Heartbeats: {} every {:?}",
            self.config.heartbeats_number,
            self.config.heartbeat_interval()
        );

        let heartbeat = self.state.health.clone().start();
        let router = self.router();
        tracing::info!("✓ Master ready");

        let result = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await;
        heartbeat.abort();
        result?;

        tracing::info!("Master {} stopped", self.node_id);
        Ok(())
    }
}

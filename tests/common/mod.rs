//! In-process cluster harness: one master and two secondaries on ephemeral ports

#![allow(dead_code)]

use replog::client::Client;
use replog::common::{MasterConfig, ReplicaRole, SecondaryConfig};
use replog::{MasterServer, SecondaryServer};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub struct Node {
    pub url: String,
    pub client: Client,
    _shutdown: oneshot::Sender<()>,
}

pub struct Cluster {
    pub master: Node,
    pub secondary_1: Node,
    pub secondary_2: Node,
}

impl Cluster {
    pub async fn start() -> Self {
        Self::start_with_apply_wait(Duration::from_secs(30)).await
    }

    pub async fn start_with_apply_wait(apply_wait: Duration) -> Self {
        let secondary_1 = spawn_secondary(ReplicaRole::Secondary1, apply_wait).await;
        let secondary_2 = spawn_secondary(ReplicaRole::Secondary2, apply_wait).await;

        let listener = bind().await;
        let config = MasterConfig {
            bind_addr: listener.local_addr().unwrap(),
            secondary_1: secondary_1.url.clone(),
            secondary_2: secondary_2.url.clone(),
            heartbeat_interval_ms: 200,
            ..Default::default()
        };
        let server = MasterServer::new(config, "master".to_string()).unwrap();
        let master = serve(listener, |listener, shutdown| async move {
            server.serve_with_listener(listener, shutdown).await.unwrap();
        })
        .await;

        Self {
            master,
            secondary_1,
            secondary_2,
        }
    }

    pub fn secondaries(&self) -> [&Client; 2] {
        [&self.secondary_1.client, &self.secondary_2.client]
    }

    pub fn all(&self) -> [&Client; 3] {
        [
            &self.master.client,
            &self.secondary_1.client,
            &self.secondary_2.client,
        ]
    }
}

pub async fn spawn_secondary(role: ReplicaRole, apply_wait: Duration) -> Node {
    let listener = bind().await;
    let config = SecondaryConfig {
        bind_addr: listener.local_addr().unwrap(),
        role,
        apply_wait_timeout_ms: apply_wait.as_millis() as u64,
    };
    let server = SecondaryServer::new(config, role.to_string());
    serve(listener, |listener, shutdown| async move {
        server.serve_with_listener(listener, shutdown).await.unwrap();
    })
    .await
}

async fn bind() -> TcpListener {
    TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap()
}

async fn serve<F, Fut>(listener: TcpListener, run: F) -> Node
where
    F: FnOnce(TcpListener, std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel::<()>();
    let shutdown = Box::pin(async move {
        let _ = rx.await;
    });
    tokio::spawn(run(listener, shutdown));

    let client = Client::connect(url.clone()).await.unwrap();
    Node {
        url,
        client,
        _shutdown: tx,
    }
}

/// A payload no other test posts
pub fn unique_message() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Whether `prefix` is an initial segment of `full`
pub fn is_prefix(prefix: &[String], full: &[String]) -> bool {
    prefix.len() <= full.len() && prefix.iter().zip(full).all(|(a, b)| a == b)
}

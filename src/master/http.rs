//! HTTP API for the master

use crate::common::tracing_middleware::{request_tracing_middleware, NodeName};
use crate::common::{LogStore, MasterMetrics, PostMessage, Result};
use crate::master::health::HealthMonitor;
use crate::master::replication::ReplicationCoordinator;
use crate::master::sequencer::Sequencer;
use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct MasterState {
    pub store: Arc<LogStore>,
    pub sequencer: Arc<Sequencer>,
    pub coordinator: Arc<ReplicationCoordinator>,
    pub health: Arc<HealthMonitor>,
    pub metrics: Arc<MasterMetrics>,
}

pub fn create_router(state: MasterState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/messages", get(list_messages).post(post_message))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(
            NodeName("master".to_string()),
            request_tracing_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

async fn ping() -> &'static str {
    "pong"
}

/// Every accepted message, including those whose replication failed
async fn list_messages(State(state): State<MasterState>) -> Json<Vec<String>> {
    Json(state.store.snapshot())
}

/// Sequence, append locally, replicate, and wait for the write concern.
///
/// The message stays in the master's log even when the write concern is not
/// met; the client only learns that the write was not confirmed.
async fn post_message(
    State(state): State<MasterState>,
    Json(mut msg): Json<PostMessage>,
) -> Result<Json<String>> {
    let w = msg.write_concern().inspect_err(|_| {
        state.metrics.rejected_requests.inc();
    })?;

    let entry = state.sequencer.sequence(&state.store, msg.message.clone())?;
    state.metrics.messages_accepted.inc();
    tracing::info!(id = entry.id, %w, "Message sequenced");

    msg.id = Some(entry.id);
    msg.w = Some(w.get());

    match state.coordinator.replicate(msg, w).await {
        Ok(report) => {
            state.metrics.quorum_satisfied.inc();
            tracing::info!(
                id = entry.id,
                acknowledged = report.acknowledged,
                "Write concern met"
            );
            Ok(Json(entry.payload))
        }
        Err(e) => {
            state.metrics.quorum_failed.inc();
            tracing::warn!(id = entry.id, "Write not confirmed: {}", e);
            Err(e)
        }
    }
}

async fn health(State(state): State<MasterState>) -> impl IntoResponse {
    let report = state.health.report();
    let status = if report.has_quorum {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

async fn metrics(State(state): State<MasterState>) -> impl IntoResponse {
    (StatusCode::OK, state.metrics.to_prometheus())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{MasterConfig, ReplicaRole};
    use crate::master::secondary_client::{Ack, Replica};
    use crate::master::MasterServer;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use futures_util::future::BoxFuture;
    use tower::ServiceExt;

    /// Always answers the same way, immediately
    struct StaticReplica(ReplicaRole, bool);

    impl Replica for StaticReplica {
        fn role(&self) -> ReplicaRole {
            self.0
        }

        fn replicate(&self, _msg: PostMessage) -> BoxFuture<'static, Ack> {
            let positive = self.1;
            Box::pin(async move {
                if positive {
                    Ack::Positive
                } else {
                    Ack::Negative("static".into())
                }
            })
        }

        fn ping(&self) -> BoxFuture<'static, bool> {
            let positive = self.1;
            Box::pin(async move { positive })
        }
    }

    fn router(s1_ok: bool, s2_ok: bool) -> Router {
        let replicas: Vec<Arc<dyn Replica>> = vec![
            Arc::new(StaticReplica(ReplicaRole::Secondary1, s1_ok)) as Arc<dyn Replica>,
            Arc::new(StaticReplica(ReplicaRole::Secondary2, s2_ok)),
        ];
        MasterServer::with_replicas(MasterConfig::default(), "test".into(), replicas).router()
    }

    fn post(body: &str) -> Request<Body> {
        Request::post("/messages")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let response = router(true, true)
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "pong");
    }

    #[tokio::test]
    async fn test_post_echoes_message() {
        let app = router(true, true);
        let response = app
            .clone()
            .oneshot(post(r#"{"message": "hello"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#""hello""#);

        let response = app
            .oneshot(Request::get("/messages").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_string(response).await, r#"["hello"]"#);
    }

    #[tokio::test]
    async fn test_quorum_failure_is_503_but_message_is_kept() {
        let app = router(true, false);
        let response = app
            .clone()
            .oneshot(post(r#"{"message": "m", "w": 3}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_string(response).await.contains("error"));

        let response = app
            .oneshot(Request::get("/messages").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_string(response).await, r#"["m"]"#);
    }

    #[tokio::test]
    async fn test_client_supplied_id_is_ignored() {
        let app = router(true, true);
        for (i, body) in [r#"{"message": "a", "id": 42}"#, r#"{"message": "b", "id": 0}"#]
            .into_iter()
            .enumerate()
        {
            let response = app.clone().oneshot(post(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "post {}", i);
        }
        let response = app
            .oneshot(Request::get("/messages").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_string(response).await, r#"["a","b"]"#);
    }

    #[tokio::test]
    async fn test_out_of_range_write_concern_is_400() {
        let response = router(true, true)
            .oneshot(post(r#"{"message": "m", "w": 4}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

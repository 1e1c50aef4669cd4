//! HTTP API for a secondary node
//!
//! `POST /messages` serves both replication from the master and direct posts;
//! either way the body must carry the entry `id`.

use crate::common::tracing_middleware::{request_tracing_middleware, NodeName};
use crate::common::{Error, PostMessage, ReplicaRole, Result, SecondaryMetrics};
use crate::secondary::apply::ApplyEngine;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct SecondaryState {
    pub role: ReplicaRole,
    pub engine: Arc<ApplyEngine>,
    pub metrics: Arc<SecondaryMetrics>,
    pub apply_wait_timeout: Duration,
}

pub fn create_router(state: SecondaryState) -> Router {
    let node = NodeName(state.role.to_string());
    Router::new()
        .route("/ping", get(ping))
        .route("/messages", get(list_messages).post(post_message))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(
            node,
            request_tracing_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

async fn ping() -> &'static str {
    "pong"
}

async fn list_messages(State(state): State<SecondaryState>) -> Json<Vec<String>> {
    Json(state.engine.snapshot())
}

/// Apply one entry, honoring the directive addressed to this node.
///
/// - `200` + the payload as a JSON string: the entry is applied.
/// - `204`: `noreply` was set; nothing was applied.
/// - `202`: the entry is buffered and its gap did not close in time.
/// - `409`: `id` already holds a different payload.
async fn post_message(
    State(state): State<SecondaryState>,
    Json(msg): Json<PostMessage>,
) -> Result<Response> {
    let id = msg.id.ok_or(Error::MissingId)?;
    let directive = *msg.directive_for(state.role);

    if directive.delay > 0 {
        tracing::info!(id, delay_secs = directive.delay, "Delaying entry");
        tokio::time::sleep(directive.delay()).await;
    }

    if directive.noreply {
        state.metrics.no_reply.inc();
        tracing::info!(id, "noreply set, dropping entry");
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let outcome = state.engine.accept(id, msg.message.clone())?;
    if outcome.is_applied() {
        return applied_ack(&state, id, msg.message);
    }

    if state
        .engine
        .wait_applied(id, state.apply_wait_timeout)
        .await
    {
        applied_ack(&state, id, msg.message)
    } else {
        state.metrics.ack_timeouts.inc();
        let next_expected = state.engine.status().next_expected;
        tracing::warn!(id, next_expected, "Entry still buffered behind a gap");
        Ok((
            StatusCode::ACCEPTED,
            Json(json!({
                "error": format!("entry {} buffered, waiting for entry {}", id, next_expected),
            })),
        )
            .into_response())
    }
}

/// Echo `payload` only if it is what the log holds at `id`
fn applied_ack(state: &SecondaryState, id: u64, payload: String) -> Result<Response> {
    match state.engine.applied_payload(id) {
        Some(stored) if stored == payload => Ok(Json(payload).into_response()),
        Some(_) => Err(Error::PayloadConflict { id }),
        None => Err(Error::Internal(format!("entry {} acknowledged but not in the log", id))),
    }
}

/// Apply engine state.
///
/// An entry dropped by `noreply` is never re-sent, so every later id stays in
/// `pending` and `stalled` remains `true` for the life of the process. The
/// buffer is unbounded; `replog_pending_entries` on `/metrics` tracks its size.
async fn status(State(state): State<SecondaryState>) -> impl IntoResponse {
    let status = state.engine.status();
    Json(json!({
        "role": state.role,
        "next_expected": status.next_expected,
        "applied": status.applied,
        "pending": status.pending,
        "stalled": status.stalled,
    }))
}

async fn metrics(State(state): State<SecondaryState>) -> impl IntoResponse {
    (StatusCode::OK, state.metrics.to_prometheus())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::LogStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn router(role: ReplicaRole, wait_ms: u64) -> Router {
        let metrics = Arc::new(SecondaryMetrics::new());
        create_router(SecondaryState {
            role,
            engine: Arc::new(ApplyEngine::new(Arc::new(LogStore::new()), metrics.clone())),
            metrics,
            apply_wait_timeout: Duration::from_millis(wait_ms),
        })
    }

    fn post(body: &str) -> Request<Body> {
        Request::post("/messages")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn get_messages(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(Request::get("/messages").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_apply_acknowledges_with_payload() {
        let app = router(ReplicaRole::Secondary1, 100);
        let response = app
            .clone()
            .oneshot(post(r#"{"message": "a", "id": 0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#""a""#);
        assert_eq!(get_messages(&app).await, r#"["a"]"#);
    }

    #[tokio::test]
    async fn test_noreply_slot_is_resolved_by_role() {
        let body = r#"{"message": "a", "id": 0, "secondary-2": {"noreply": true}}"#;

        let first = router(ReplicaRole::Secondary1, 100);
        let response = first.clone().oneshot(post(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let second = router(ReplicaRole::Secondary2, 100);
        let response = second.clone().oneshot(post(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(get_messages(&second).await, "[]");
    }

    #[tokio::test]
    async fn test_gap_times_out_with_accepted() {
        let app = router(ReplicaRole::Secondary1, 50);
        let response = app
            .clone()
            .oneshot(post(r#"{"message": "b", "id": 1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(get_messages(&app).await, "[]");

        let response = app
            .clone()
            .oneshot(post(r#"{"message": "a", "id": 0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(get_messages(&app).await, r#"["a","b"]"#);

        // Re-posting the formerly buffered entry is now an immediate ack
        let response = app
            .oneshot(post(r#"{"message": "b", "id": 1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_conflicting_duplicate_is_409_and_log_keeps_first() {
        let app = router(ReplicaRole::Secondary1, 50);
        let response = app
            .clone()
            .oneshot(post(r#"{"message": "x", "id": 0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(post(r#"{"message": "y", "id": 0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(!String::from_utf8_lossy(&bytes).contains(r#""y""#));
        assert_eq!(get_messages(&app).await, r#"["x"]"#);

        // Same for an entry still buffered behind a gap
        let response = app
            .clone()
            .oneshot(post(r#"{"message": "b", "id": 2}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let response = app
            .clone()
            .oneshot(post(r#"{"message": "c", "id": 2}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_noreply_gap_keeps_later_entries_pending() {
        let app = router(ReplicaRole::Secondary1, 20);
        let response = app
            .clone()
            .oneshot(post(
                r#"{"message": "a", "id": 0, "secondary-1": {"noreply": true}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        for id in 1..=3 {
            let body = format!(r#"{{"message": "m{}", "id": {}}}"#, id, id);
            let response = app.clone().oneshot(post(&body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::ACCEPTED);
        }

        let response = app
            .clone()
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let status: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(status["next_expected"], 0);
        assert_eq!(status["pending"], json!([1, 2, 3]));
        assert_eq!(status["stalled"], true);
        assert_eq!(get_messages(&app).await, "[]");
    }

    #[tokio::test]
    async fn test_missing_id_is_400() {
        let response = router(ReplicaRole::Secondary1, 100)
            .oneshot(post(r#"{"message": "a"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

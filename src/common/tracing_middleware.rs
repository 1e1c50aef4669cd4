//! Request tracing middleware
//!
//! Every request gets an `X-Request-ID` (reused if the caller sent one), a
//! span carrying the node name, and start/completion log lines with timing.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Name of the node a router serves, attached to every request span
#[derive(Debug, Clone)]
pub struct NodeName(pub String);

pub async fn request_tracing_middleware(
    State(node): State<NodeName>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let start = Instant::now();

    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(generate_request_id);

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        node = %node.0,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        info!("Request started");

        let mut response = next.run(request).await;

        let duration_ms = start.elapsed().as_millis();
        let status = response.status();

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        if status.is_success() {
            info!(status = %status.as_u16(), duration_ms = %duration_ms, "Request completed");
        } else if status.is_client_error() {
            warn!(status = %status.as_u16(), duration_ms = %duration_ms, "Client error");
        } else {
            warn!(status = %status.as_u16(), duration_ms = %duration_ms, "Server error");
        }

        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_id() {
        let id1 = generate_request_id();
        let id2 = generate_request_id();

        assert!(Uuid::parse_str(&id1).is_ok());
        assert_ne!(id1, id2);
    }
}

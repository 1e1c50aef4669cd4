//! HTTP client the master uses to reach one secondary

use crate::common::{PostMessage, ReplicaRole, Result};
use futures_util::future::BoxFuture;
use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;

/// Outcome of one replication call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Positive,
    Negative(String),
}

impl Ack {
    pub fn is_positive(&self) -> bool {
        matches!(self, Ack::Positive)
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ack::Positive => f.write_str("ack"),
            Ack::Negative(reason) => write!(f, "nack ({})", reason),
        }
    }
}

/// A replication target.
///
/// Futures are `'static` so the coordinator can spawn them and let them run
/// past the point where the client has been answered.
pub trait Replica: Send + Sync + 'static {
    fn role(&self) -> ReplicaRole;

    /// Push one sequenced message; never fails, a failure is a negative ack
    fn replicate(&self, msg: PostMessage) -> BoxFuture<'static, Ack>;

    /// Liveness probe
    fn ping(&self) -> BoxFuture<'static, bool>;
}

pub struct SecondaryClient {
    role: ReplicaRole,
    base_url: String,
    client: reqwest::Client,
    ping_timeout: Duration,
}

impl SecondaryClient {
    /// `connect_timeout` bounds connection setup only; a delayed secondary
    /// is always waited for.
    pub fn new(role: ReplicaRole, base_url: &str, connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            role,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            ping_timeout: connect_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Replica for SecondaryClient {
    fn role(&self) -> ReplicaRole {
        self.role
    }

    fn replicate(&self, msg: PostMessage) -> BoxFuture<'static, Ack> {
        let client = self.client.clone();
        let url = format!("{}/messages", self.base_url);

        Box::pin(async move {
            let response = match client.post(&url).json(&msg).send().await {
                Ok(response) => response,
                Err(e) => return Ack::Negative(format!("transport error: {}", e)),
            };

            let status = response.status();
            if status != StatusCode::OK {
                return Ack::Negative(format!("status {}", status));
            }

            match response.json::<String>().await {
                Ok(body) if body == msg.message => Ack::Positive,
                Ok(body) => Ack::Negative(format!("unexpected body {:?}", body)),
                Err(e) => Ack::Negative(format!("malformed body: {}", e)),
            }
        })
    }

    fn ping(&self) -> BoxFuture<'static, bool> {
        let request = self
            .client
            .get(format!("{}/ping", self.base_url))
            .timeout(self.ping_timeout);

        Box::pin(async move {
            match request.send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    matches!(response.text().await.as_deref(), Ok("pong"))
                }
                _ => false,
            }
        })
    }
}

//! Replication coordinator
//!
//! Fans a sequenced message out to every secondary in parallel and answers
//! as soon as the write concern is met. The master's own append counts as
//! the first acknowledgment. Calls that are still running when the client is
//! answered keep going in the background: dropping a `JoinHandle` detaches
//! the task, it does not cancel it.

use crate::common::{Error, MasterMetrics, PostMessage, Result, WriteConcern};
use crate::master::secondary_client::{Ack, Replica};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Instant;

/// How a write concern was met
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumReport {
    pub required: u8,
    pub acknowledged: u8,
}

pub struct ReplicationCoordinator {
    replicas: Vec<Arc<dyn Replica>>,
    metrics: Arc<MasterMetrics>,
}

impl ReplicationCoordinator {
    pub fn new(replicas: Vec<Arc<dyn Replica>>, metrics: Arc<MasterMetrics>) -> Self {
        Self { replicas, metrics }
    }

    pub fn replicas(&self) -> &[Arc<dyn Replica>] {
        &self.replicas
    }

    /// Replicate `msg` (which must carry its sequenced id) under `w`.
    ///
    /// Fails with `QuorumNotReached` once every call has completed without
    /// enough positive acknowledgments.
    pub async fn replicate(&self, msg: PostMessage, w: WriteConcern) -> Result<QuorumReport> {
        let id = msg.id.ok_or(Error::MissingId)?;
        let required = w.get();
        let mut acknowledged: u8 = 1;

        let mut calls = FuturesUnordered::new();
        for replica in &self.replicas {
            let replica = replica.clone();
            let metrics = self.metrics.clone();
            let msg = msg.clone();

            calls.push(tokio::spawn(async move {
                let role = replica.role();
                let started = Instant::now();
                let ack = replica.replicate(msg).await;
                let elapsed = started.elapsed();

                metrics.record_ack(role, ack.is_positive(), elapsed);
                match &ack {
                    Ack::Positive => tracing::debug!(
                        id,
                        replica = %role,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Replicated"
                    ),
                    Ack::Negative(reason) => tracing::warn!(
                        id,
                        replica = %role,
                        elapsed_ms = elapsed.as_millis() as u64,
                        reason = %reason,
                        "Replication not acknowledged"
                    ),
                }
                ack
            }));
        }

        if acknowledged >= required {
            return Ok(QuorumReport {
                required,
                acknowledged,
            });
        }

        while let Some(joined) = calls.next().await {
            match joined {
                Ok(Ack::Positive) => acknowledged += 1,
                Ok(Ack::Negative(_)) => {}
                Err(e) => tracing::error!(id, "Replication task failed: {}", e),
            }

            if acknowledged >= required {
                return Ok(QuorumReport {
                    required,
                    acknowledged,
                });
            }
        }

        Err(Error::QuorumNotReached {
            required,
            acknowledged,
        })
    }
}

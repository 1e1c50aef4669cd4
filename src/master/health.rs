//! Heartbeat monitoring of the secondaries
//!
//! Every round sends a fixed number of pings to each secondary and grades it:
//! all answered is `healthy`, some is `suspected`, none is `unhealthy`.
//! The result is reported at `GET /health` and never feeds write-concern
//! decisions.

use crate::common::{ReplicaRole, NODE_COUNT};
use crate::master::secondary_client::Replica;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Unknown,
    Healthy,
    Suspected,
    Unhealthy,
}

/// Grade one round of `probes` pings
pub fn classify(successes: u32, probes: u32) -> NodeStatus {
    if probes == 0 {
        NodeStatus::Unknown
    } else if successes >= probes {
        NodeStatus::Healthy
    } else if successes > 0 {
        NodeStatus::Suspected
    } else {
        NodeStatus::Unhealthy
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplicaHealth {
    pub role: ReplicaRole,
    pub status: NodeStatus,
    pub last_checked: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub secondaries: Vec<ReplicaHealth>,
    /// Healthy nodes, master included, form a majority
    pub has_quorum: bool,
}

pub struct HealthMonitor {
    replicas: Vec<Arc<dyn Replica>>,
    statuses: RwLock<HashMap<ReplicaRole, ReplicaHealth>>,
    interval: Duration,
    probes: u32,
}

impl HealthMonitor {
    pub fn new(replicas: Vec<Arc<dyn Replica>>, interval: Duration, probes: u32) -> Self {
        let statuses = replicas
            .iter()
            .map(|r| {
                (
                    r.role(),
                    ReplicaHealth {
                        role: r.role(),
                        status: NodeStatus::Unknown,
                        last_checked: None,
                    },
                )
            })
            .collect();
        Self {
            replicas,
            statuses: RwLock::new(statuses),
            interval,
            probes,
        }
    }

    /// Run one heartbeat round against every secondary concurrently
    pub async fn check_once(&self) {
        let rounds = self.replicas.iter().map(|replica| {
            let replica = replica.clone();
            let probes = self.probes;
            async move {
                let mut successes = 0;
                for _ in 0..probes {
                    if replica.ping().await {
                        successes += 1;
                    }
                }
                (replica.role(), classify(successes, probes))
            }
        });
        let results = join_all(rounds).await;

        let now = Utc::now();
        let mut statuses = match self.statuses.write() {
            Ok(statuses) => statuses,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (role, status) in results {
            if let Some(previous) = statuses.get(&role) {
                if previous.status != status {
                    tracing::info!(replica = %role, ?status, "Secondary status changed");
                }
            }
            statuses.insert(
                role,
                ReplicaHealth {
                    role,
                    status,
                    last_checked: Some(now),
                },
            );
        }
    }

    /// Spawn the periodic heartbeat loop
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.check_once().await;
            }
        })
    }

    pub fn report(&self) -> HealthReport {
        let statuses = match self.statuses.read() {
            Ok(statuses) => statuses,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut secondaries: Vec<ReplicaHealth> = statuses.values().cloned().collect();
        secondaries.sort_by_key(|h| h.role.as_str());

        let healthy = secondaries
            .iter()
            .filter(|h| h.status == NodeStatus::Healthy)
            .count();
        let alive = healthy + 1;
        let majority = NODE_COUNT as usize / 2 + 1;

        HealthReport {
            secondaries,
            has_quorum: alive >= majority,
        }
    }
}

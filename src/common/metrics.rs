//! Replication metrics
//!
//! Each node owns its registry (several nodes may share one process in tests)
//! and renders it in Prometheus text format at `GET /metrics`.

use crate::common::ReplicaRole;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Histogram bucket boundaries for replication round trips (in milliseconds)
const LATENCY_BUCKETS: [f64; 11] = [
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
];

/// A simple histogram implementation for latency tracking
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
    boundaries: Vec<f64>,
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new() -> Self {
        Self::with_buckets(&LATENCY_BUCKETS)
    }

    pub fn with_buckets(boundaries: &[f64]) -> Self {
        Self {
            buckets: (0..=boundaries.len()).map(|_| AtomicU64::new(0)).collect(),
            boundaries: boundaries.to_vec(),
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a value (milliseconds)
    pub fn observe(&self, value: f64) {
        let idx = self
            .boundaries
            .iter()
            .position(|&boundary| value <= boundary)
            .unwrap_or(self.boundaries.len());

        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add((value * 1000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_duration(&self, duration: Duration) {
        self.observe(duration.as_secs_f64() * 1000.0);
    }

    /// Cumulative bucket counts, ending with `+Inf`
    pub fn get_buckets(&self) -> Vec<(f64, u64)> {
        let mut cumulative = 0u64;
        let mut result = Vec::with_capacity(self.buckets.len());
        for (i, bucket) in self.buckets.iter().enumerate() {
            cumulative += bucket.load(Ordering::Relaxed);
            let le = self.boundaries.get(i).copied().unwrap_or(f64::INFINITY);
            result.push((le, cumulative));
        }
        result
    }

    pub fn sum(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, v: u64) {
        self.value.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Acknowledgment counters for one secondary, as seen by the master
#[derive(Debug, Default)]
pub struct ReplicaMetrics {
    pub acks_positive: Counter,
    pub acks_negative: Counter,
    pub latency: Histogram,
}

/// Master-side registry
#[derive(Debug)]
pub struct MasterMetrics {
    pub messages_accepted: Counter,
    pub quorum_satisfied: Counter,
    pub quorum_failed: Counter,
    pub rejected_requests: Counter,
    secondary_1: ReplicaMetrics,
    secondary_2: ReplicaMetrics,
    start_time: Instant,
}

impl MasterMetrics {
    pub fn new() -> Self {
        Self {
            messages_accepted: Counter::new(),
            quorum_satisfied: Counter::new(),
            quorum_failed: Counter::new(),
            rejected_requests: Counter::new(),
            secondary_1: ReplicaMetrics::default(),
            secondary_2: ReplicaMetrics::default(),
            start_time: Instant::now(),
        }
    }

    pub fn replica(&self, role: ReplicaRole) -> &ReplicaMetrics {
        match role {
            ReplicaRole::Secondary1 => &self.secondary_1,
            ReplicaRole::Secondary2 => &self.secondary_2,
        }
    }

    /// Record the outcome of one replication call
    pub fn record_ack(&self, role: ReplicaRole, positive: bool, elapsed: Duration) {
        let replica = self.replica(role);
        if positive {
            replica.acks_positive.inc();
        } else {
            replica.acks_negative.inc();
        }
        replica.latency.observe_duration(elapsed);
    }

    pub fn to_prometheus(&self) -> String {
        let mut out = String::new();
        write_metric(
            &mut out,
            "replog_messages_accepted_total",
            "Messages sequenced by the master",
            "counter",
            self.messages_accepted.get(),
        );
        write_metric(
            &mut out,
            "replog_quorum_satisfied_total",
            "Writes whose write concern was met",
            "counter",
            self.quorum_satisfied.get(),
        );
        write_metric(
            &mut out,
            "replog_quorum_failed_total",
            "Writes whose write concern could not be met",
            "counter",
            self.quorum_failed.get(),
        );
        write_metric(
            &mut out,
            "replog_rejected_requests_total",
            "Requests rejected before sequencing",
            "counter",
            self.rejected_requests.get(),
        );
        write_metric(
            &mut out,
            "replog_uptime_seconds",
            "Server uptime in seconds",
            "gauge",
            self.start_time.elapsed().as_secs(),
        );

        out.push_str("# HELP replog_replica_acks_total Replication acknowledgments per secondary\n");
        out.push_str("# TYPE replog_replica_acks_total counter\n");
        for role in ReplicaRole::ALL {
            let replica = self.replica(role);
            let _ = writeln!(
                out,
                "replog_replica_acks_total{{replica=\"{}\",result=\"positive\"}} {}",
                role,
                replica.acks_positive.get()
            );
            let _ = writeln!(
                out,
                "replog_replica_acks_total{{replica=\"{}\",result=\"negative\"}} {}",
                role,
                replica.acks_negative.get()
            );
        }

        out.push_str("# HELP replog_replication_duration_ms Replication call duration in milliseconds\n");
        out.push_str("# TYPE replog_replication_duration_ms histogram\n");
        for role in ReplicaRole::ALL {
            let latency = &self.replica(role).latency;
            for (le, count) in latency.get_buckets() {
                let le = if le.is_infinite() {
                    "+Inf".to_string()
                } else {
                    le.to_string()
                };
                let _ = writeln!(
                    out,
                    "replog_replication_duration_ms_bucket{{replica=\"{}\",le=\"{}\"}} {}",
                    role, le, count
                );
            }
            let _ = writeln!(
                out,
                "replog_replication_duration_ms_sum{{replica=\"{}\"}} {}",
                role,
                latency.sum()
            );
            let _ = writeln!(
                out,
                "replog_replication_duration_ms_count{{replica=\"{}\"}} {}",
                role,
                latency.count()
            );
        }

        out
    }
}

impl Default for MasterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Secondary-side registry
#[derive(Debug, Default)]
pub struct SecondaryMetrics {
    pub entries_applied: Counter,
    pub entries_buffered: Counter,
    pub duplicates: Counter,
    pub conflicts: Counter,
    pub no_reply: Counter,
    pub ack_timeouts: Counter,
    pub pending: Gauge,
    pub next_expected: Gauge,
}

impl SecondaryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_prometheus(&self) -> String {
        let mut out = String::new();
        write_metric(
            &mut out,
            "replog_entries_applied_total",
            "Entries moved into the visible log",
            "counter",
            self.entries_applied.get(),
        );
        write_metric(
            &mut out,
            "replog_entries_buffered_total",
            "Entries that arrived ahead of a gap",
            "counter",
            self.entries_buffered.get(),
        );
        write_metric(
            &mut out,
            "replog_duplicates_total",
            "Entries already applied or buffered",
            "counter",
            self.duplicates.get(),
        );
        write_metric(
            &mut out,
            "replog_payload_conflicts_total",
            "Duplicate ids rejected for carrying a different payload",
            "counter",
            self.conflicts.get(),
        );
        write_metric(
            &mut out,
            "replog_no_reply_total",
            "Requests answered without an acknowledgment",
            "counter",
            self.no_reply.get(),
        );
        write_metric(
            &mut out,
            "replog_ack_timeouts_total",
            "Buffered entries whose gap did not close in time",
            "counter",
            self.ack_timeouts.get(),
        );
        write_metric(
            &mut out,
            "replog_pending_entries",
            "Entries buffered behind a gap",
            "gauge",
            self.pending.get(),
        );
        write_metric(
            &mut out,
            "replog_next_expected_id",
            "Next id the apply engine will accept",
            "gauge",
            self.next_expected.get(),
        );
        out
    }
}

fn write_metric(out: &mut String, name: &str, help: &str, kind: &str, value: u64) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
    let _ = writeln!(out, "{} {}", name, value);
}

//! Ordered, deduplicating apply engine
//!
//! Replication entries may arrive out of order (a fast later entry overtaking
//! a delayed earlier one) or more than once. The engine applies them to the
//! log strictly by id: the next expected entry is appended right away, later
//! ones wait in a pending map until the gap before them closes.
//!
//! The applied watermark (`next_expected`) is published on a watch channel so
//! request handlers can wait for a buffered entry to become visible without
//! holding the engine lock.

use crate::common::{Error, LogStore, Result, SecondaryMetrics};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// What happened to an accepted entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Appended, along with `drained` buffered successors
    Applied { drained: u64 },
    /// Held until its predecessors arrive
    Buffered,
    /// Seen before; `applied` tells whether it is already visible
    Duplicate { applied: bool },
}

impl ApplyOutcome {
    /// Whether the entry is visible in the log once `accept` returns
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            ApplyOutcome::Applied { .. } | ApplyOutcome::Duplicate { applied: true }
        )
    }
}

/// Observable engine state, served at `GET /status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyStatus {
    pub next_expected: u64,
    pub applied: u64,
    pub pending: Vec<u64>,
    /// `true` while some buffered entry waits on a missing predecessor
    pub stalled: bool,
}

#[derive(Debug, Default)]
struct PendingState {
    next_expected: u64,
    pending: BTreeMap<u64, String>,
}

pub struct ApplyEngine {
    store: Arc<LogStore>,
    state: Mutex<PendingState>,
    watermark: watch::Sender<u64>,
    metrics: Arc<SecondaryMetrics>,
}

impl ApplyEngine {
    pub fn new(store: Arc<LogStore>, metrics: Arc<SecondaryMetrics>) -> Self {
        let next_expected = store.len();
        let (watermark, _) = watch::channel(next_expected);
        metrics.next_expected.set(next_expected);
        Self {
            store,
            state: Mutex::new(PendingState {
                next_expected,
                pending: BTreeMap::new(),
            }),
            watermark,
            metrics,
        }
    }

    /// Route entry `id` to the log, the pending buffer, or nowhere (duplicate).
    ///
    /// A duplicate whose payload differs from the one already held for `id`
    /// fails with `PayloadConflict` and changes nothing.
    pub fn accept(&self, id: u64, payload: String) -> Result<ApplyOutcome> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::Internal("apply engine lock poisoned".into()))?;

        if id < state.next_expected {
            if self.store.get(id).as_deref() != Some(payload.as_str()) {
                return Err(self.conflict(id));
            }
            self.metrics.duplicates.inc();
            tracing::debug!(id, "Duplicate of an applied entry");
            return Ok(ApplyOutcome::Duplicate { applied: true });
        }

        if let Some(existing) = state.pending.get(&id) {
            if *existing != payload {
                return Err(self.conflict(id));
            }
            self.metrics.duplicates.inc();
            return Ok(ApplyOutcome::Duplicate { applied: false });
        }

        if id > state.next_expected {
            state.pending.insert(id, payload);
            self.metrics.entries_buffered.inc();
            self.metrics.pending.set(state.pending.len() as u64);
            tracing::debug!(
                id,
                next_expected = state.next_expected,
                "Buffered entry ahead of a gap"
            );
            return Ok(ApplyOutcome::Buffered);
        }

        self.store.append(id, payload)?;
        state.next_expected += 1;

        let mut drained = 0;
        loop {
            let next = state.next_expected;
            let Some(payload) = state.pending.remove(&next) else {
                break;
            };
            self.store.append(next, payload)?;
            state.next_expected += 1;
            drained += 1;
        }

        self.metrics.entries_applied.add(drained + 1);
        self.metrics.pending.set(state.pending.len() as u64);
        self.metrics.next_expected.set(state.next_expected);
        self.watermark.send_replace(state.next_expected);

        tracing::debug!(
            id,
            drained,
            next_expected = state.next_expected,
            "Applied entry"
        );
        Ok(ApplyOutcome::Applied { drained })
    }

    pub fn is_applied(&self, id: u64) -> bool {
        *self.watermark.borrow() > id
    }

    /// Wait until entry `id` is applied, for at most `timeout`.
    ///
    /// Returns `false` if the gap before `id` did not close in time.
    pub async fn wait_applied(&self, id: u64, timeout: Duration) -> bool {
        let mut rx = self.watermark.subscribe();
        let applied = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|&next| next > id)).await,
            Ok(Ok(_))
        );
        applied
    }

    /// Payload applied at `id`, if any
    pub fn applied_payload(&self, id: u64) -> Option<String> {
        self.store.get(id)
    }

    fn conflict(&self, id: u64) -> Error {
        self.metrics.conflicts.inc();
        tracing::warn!(id, "Duplicate id with a different payload, rejected");
        Error::PayloadConflict { id }
    }

    /// Applied payloads in id order; buffered entries are not included
    pub fn snapshot(&self) -> Vec<String> {
        self.store.snapshot()
    }

    pub fn status(&self) -> ApplyStatus {
        let state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        ApplyStatus {
            next_expected: state.next_expected,
            applied: self.store.len(),
            pending: state.pending.keys().copied().collect(),
            stalled: !state.pending.is_empty(),
        }
    }
}

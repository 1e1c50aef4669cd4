//! Id assignment for the master
//!
//! Ids start at 0 and are handed out exactly once each. The master assigns
//! an id and appends to its own log under the same lock, so its log never
//! shows a gap even while many writers race.

use crate::common::{Entry, Error, LogStore, Result};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct Sequencer {
    next: Mutex<u64>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next id to `payload` and append it to `store`.
    ///
    /// The counter only advances if the append succeeds.
    pub fn sequence(&self, store: &LogStore, payload: String) -> Result<Entry> {
        let mut next = self.lock()?;
        let id = *next;
        store.append(id, payload.clone())?;
        *next += 1;
        Ok(Entry { id, payload })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, u64>> {
        self.next
            .lock()
            .map_err(|_| Error::Internal("sequencer lock poisoned".into()))
    }
}

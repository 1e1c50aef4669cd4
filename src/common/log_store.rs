//! In-memory append-only log
//!
//! Entries are stored densely: the entry with id `n` lives at index `n`, so
//! the store can check sequencing without keeping ids around.

use crate::common::{Error, Result};
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct LogStore {
    entries: RwLock<Vec<String>>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `payload` as entry `id`.
    ///
    /// The caller sequences entries; `id` must be exactly the next index.
    pub fn append(&self, id: u64, payload: String) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Internal("log store lock poisoned".into()))?;

        let expected = entries.len() as u64;
        if id != expected {
            return Err(Error::OutOfSequence {
                expected,
                actual: id,
            });
        }
        entries.push(payload);
        Ok(())
    }

    /// Payloads in ascending id order, as of the call
    pub fn snapshot(&self) -> Vec<String> {
        match self.entries.read() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of applied entries, which is also the next id to append
    pub fn len(&self) -> u64 {
        match self.entries.read() {
            Ok(entries) => entries.len() as u64,
            Err(poisoned) => poisoned.into_inner().len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload stored under `id`, if applied
    pub fn get(&self, id: u64) -> Option<String> {
        let entries = match self.entries.read() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.get(usize::try_from(id).ok()?).cloned()
    }
}

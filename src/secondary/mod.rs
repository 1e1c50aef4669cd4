//! Secondary node implementation
//!
//! A secondary receives replication entries from the master (or directly from
//! a test client), orders and deduplicates them, and serves its applied log.

pub mod apply;
pub mod http;
pub mod server;

pub use apply::{ApplyEngine, ApplyOutcome, ApplyStatus};
pub use server::SecondaryServer;

//! Master node implementation
//!
//! The master is responsible for:
//! - Sequencing: one gapless total order over every accepted message
//! - Local append before any replication attempt
//! - Parallel fan-out to both secondaries
//! - Write-concern resolution from their acknowledgments
//! - Heartbeat health monitoring (advisory)

pub mod health;
pub mod http;
pub mod replication;
pub mod secondary_client;
pub mod sequencer;
pub mod server;

pub use replication::{QuorumReport, ReplicationCoordinator};
pub use secondary_client::{Ack, Replica, SecondaryClient};
pub use sequencer::Sequencer;
pub use server::MasterServer;

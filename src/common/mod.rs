//! Common utilities and types shared across replog nodes

pub mod config;
pub mod error;
pub mod log_store;
pub mod message;
pub mod metrics;
pub mod shutdown;
pub mod tracing_middleware;

pub use config::{Config, MasterConfig, NodeRole, SecondaryConfig};
pub use error::{Error, Result};
pub use log_store::LogStore;
pub use message::{Entry, PostMessage, ReplicaDirective, ReplicaRole, WriteConcern, NODE_COUNT};
pub use metrics::{MasterMetrics, SecondaryMetrics};

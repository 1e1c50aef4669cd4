//! # replog
//!
//! A single-leader replicated log:
//! - The master assigns every message a gapless total order
//! - Messages fan out to two secondaries in parallel
//! - Writes succeed once a caller-chosen write concern `w` (1-3) is met
//! - Secondaries apply entries strictly in order, buffering gaps and
//!   ignoring duplicates
//!
//! ## Architecture
//!
//! ```text
//!            POST /messages {message, w}
//!                      │
//!              ┌───────▼────────┐
//!              │     Master     │  sequence → append → fan out
//!              └───┬────────┬───┘
//!       HTTP (id)  │        │  HTTP (id)
//!        ┌─────────▼──┐  ┌──▼─────────┐
//!        │ secondary-1│  │ secondary-2│  order / dedup / apply
//!        └────────────┘  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start the secondaries
//! ```bash
//! replog-secondary --role secondary-1 --bind 0.0.0.0:8081
//! replog-secondary --role secondary-2 --bind 0.0.0.0:8082
//! ```
//!
//! ### Start the master
//! ```bash
//! replog-master --bind 0.0.0.0:8080 \
//!   --secondary-1 http://localhost:8081 \
//!   --secondary-2 http://localhost:8082
//! ```
//!
//! ### Use the CLI
//! ```bash
//! replog --node http://localhost:8080 post hello --w 2 --delay-1 3
//! replog --node http://localhost:8081 messages
//! ```

pub mod client;
pub mod common;
pub mod master;
pub mod secondary;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use master::MasterServer;
pub use secondary::SecondaryServer;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

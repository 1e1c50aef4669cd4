//! Wire types shared by the master, the secondaries and the client

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of nodes in the cluster: one master and two secondaries
pub const NODE_COUNT: u8 = 3;

/// Identifies which secondary slot a node fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplicaRole {
    #[serde(rename = "secondary-1")]
    Secondary1,
    #[serde(rename = "secondary-2")]
    Secondary2,
}

impl ReplicaRole {
    pub const ALL: [ReplicaRole; 2] = [ReplicaRole::Secondary1, ReplicaRole::Secondary2];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicaRole::Secondary1 => "secondary-1",
            ReplicaRole::Secondary2 => "secondary-2",
        }
    }
}

impl fmt::Display for ReplicaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReplicaRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "secondary-1" | "1" => Ok(ReplicaRole::Secondary1),
            "secondary-2" | "2" => Ok(ReplicaRole::Secondary2),
            other => Err(Error::InvalidConfig(format!("unknown replica role: {}", other))),
        }
    }
}

/// Injected behavior for one secondary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaDirective {
    /// Processing delay in seconds
    #[serde(default)]
    pub delay: u64,

    /// Do nothing and reply with nothing meaningful
    #[serde(default)]
    pub noreply: bool,
}

impl ReplicaDirective {
    pub fn delayed(secs: u64) -> Self {
        Self {
            delay: secs,
            noreply: false,
        }
    }

    pub fn no_reply() -> Self {
        Self {
            delay: 0,
            noreply: true,
        }
    }

    pub fn delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.delay)
    }
}

/// Body of `POST /messages`, on both the master and the secondaries.
///
/// The master ignores `id` and assigns its own; a secondary requires it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMessage {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<u8>,

    #[serde(rename = "secondary-1", default)]
    pub secondary_1: ReplicaDirective,

    #[serde(rename = "secondary-2", default)]
    pub secondary_2: ReplicaDirective,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl PostMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_write_concern(mut self, w: u8) -> Self {
        self.w = Some(w);
        self
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_directive(mut self, role: ReplicaRole, directive: ReplicaDirective) -> Self {
        match role {
            ReplicaRole::Secondary1 => self.secondary_1 = directive,
            ReplicaRole::Secondary2 => self.secondary_2 = directive,
        }
        self
    }

    /// The directive slot addressed to `role`
    pub fn directive_for(&self, role: ReplicaRole) -> &ReplicaDirective {
        match role {
            ReplicaRole::Secondary1 => &self.secondary_1,
            ReplicaRole::Secondary2 => &self.secondary_2,
        }
    }

    pub fn write_concern(&self) -> Result<WriteConcern> {
        WriteConcern::try_from(self.w)
    }
}

/// Number of nodes, master included, that must acknowledge a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WriteConcern(u8);

impl WriteConcern {
    pub const ALL: WriteConcern = WriteConcern(NODE_COUNT);

    pub fn new(w: u8) -> Result<Self> {
        if (1..=NODE_COUNT).contains(&w) {
            Ok(Self(w))
        } else {
            Err(Error::InvalidWriteConcern(w))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for WriteConcern {
    fn default() -> Self {
        Self::ALL
    }
}

impl TryFrom<Option<u8>> for WriteConcern {
    type Error = Error;

    /// Missing and `0` both mean "all nodes".
    fn try_from(w: Option<u8>) -> Result<Self> {
        match w {
            None | Some(0) => Ok(Self::default()),
            Some(w) => Self::new(w),
        }
    }
}

impl fmt::Display for WriteConcern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w={}", self.0)
    }
}

/// A sequenced log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: u64,
    pub payload: String,
}

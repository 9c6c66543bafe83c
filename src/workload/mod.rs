//! Recorded workload input: sessions of typed operations.

mod operation;
mod session;

pub use operation::{Operation, OpType, PredicateType};
pub use session::Session;

use serde::{Deserialize, Serialize};

/// The full recorded workload: an unordered collection of client
/// sessions (§3).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Workload {
    pub sessions: Vec<Session>,
}

impl Workload {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self { sessions }
    }

    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        let sessions: Vec<Session> = serde_json::from_str(data)?;
        Ok(Self { sessions })
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.sessions.iter().map(|s| s.operations.len()).sum()
    }

    /// Earliest `start_time` across all sessions, if any.
    pub fn earliest_start(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.sessions.iter().map(|s| s.start_time).min()
    }

    /// Latest `end_time` across all sessions, if any.
    pub fn latest_end(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.sessions.iter().map(|s| s.end_time).max()
    }
}

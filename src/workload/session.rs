//! A session: an ordered sequence of operations from one client.

use super::Operation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Session {
    #[serde(default)]
    pub session_id: u64,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
    pub operations: Vec<Operation>,
}

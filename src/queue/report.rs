use serde::{Deserialize, Serialize};
use std::fmt;

/// Tally of one replay pass over a queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub queue: String,
    pub attempted: usize,
    /// Delivered and removed.
    pub delivered: usize,
    /// Failed again, left staged for the next pass.
    pub retained: usize,
    /// Failed again after the retention window, removed.
    pub expired: usize,
    /// Unreadable values, removed without an attempt.
    pub corrupt: usize,
}

impl ReplayReport {
    pub fn new(queue: &str) -> Self {
        Self {
            queue: queue.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attempted == 0
    }
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: attempted={} delivered={} retained={} expired={} corrupt={}",
            self.queue, self.attempted, self.delivered, self.retained, self.expired, self.corrupt
        )
    }
}

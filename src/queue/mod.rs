//! Deduplicating retry sets for requests that could not be delivered.
//!
//! Each queue is a named store mapping a request URL to a queue-specific
//! value. Enqueuing the same URL again overwrites the stored value, so a
//! queue holds at most one entry per URL. Replay walks every entry once,
//! deletes what was delivered and leaves the rest for the next pass.
//!
//! Neither enqueue nor replay surfaces storage failures to the caller:
//! they are logged and the entry is left as-is for the next trigger.
//! There is no per-key locking, so a replay deleting a key can race with
//! a fresh failure re-inserting it; the worst case is one extra replay.

pub mod analytics;
pub mod mutation;
pub mod report;

pub use analytics::{AnalyticsEntry, AnalyticsQueue};
pub use mutation::{MutationEntry, MutationQueue};
pub use report::ReplayReport;

use crate::error::Result;
use crate::store::KeyValueStore;
use crate::transport::OutboundRequest;

/// Store name of the analytics ping queue.
pub const ANALYTICS_QUEUE: &str = "offline-analytics";
/// Store name of the schedule mutation queue.
pub const SESSION_UPDATES_QUEUE: &str = "offline-session-updates";

#[async_trait::async_trait]
pub trait ReplayQueue: Send + Sync {
    fn name(&self) -> &str;

    /// Stage `request` for a later replay. Never fails visibly.
    async fn enqueue(&self, request: &OutboundRequest);

    /// Attempt delivery of every staged entry once.
    async fn replay_all(&self) -> ReplayReport;

    /// Raw `(url, value)` pairs currently staged.
    async fn pending(&self) -> Result<Vec<(String, String)>>;
}

pub(crate) async fn store_entry(store: &dyn KeyValueStore, key: &str, value: &str) {
    if let Err(e) = store.set(key, value).await {
        tracing::warn!(
            "[queue {}] Failed to stage {}, dropping it: {}",
            store.name(),
            key,
            e
        );
    }
}

pub(crate) async fn remove_entry(store: &dyn KeyValueStore, key: &str) {
    if let Err(e) = store.delete(key).await {
        tracing::warn!(
            "[queue {}] Failed to remove {}, it will be replayed again: {}",
            store.name(),
            key,
            e
        );
    }
}

/// Snapshot of the store, or nothing if it cannot be read right now.
pub(crate) async fn snapshot(store: &dyn KeyValueStore) -> Vec<(String, String)> {
    match store.entries().await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                "[queue {}] Failed to list entries, skipping replay: {}",
                store.name(),
                e
            );
            Vec::new()
        }
    }
}

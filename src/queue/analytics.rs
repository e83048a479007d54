use super::{remove_entry, snapshot, store_entry, ReplayQueue, ReplayReport, ANALYTICS_QUEUE};
use crate::classify::{classify, Delivery};
use crate::clock::Clock;
use crate::error::{ReplayError, Result};
use crate::store::{KeyValueStore, StoreBackend};
use crate::transport::{OutboundRequest, Transport};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Query parameter carrying the delay between the original hit and its replay.
pub const QUEUE_TIME_PARAM: &str = "qt";

/// A failed analytics ping: the hit URL and when it first failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsEntry {
    pub url: Url,
    pub failed_at_ms: i64,
}

impl AnalyticsEntry {
    pub fn decode(key: &str, value: &str) -> Result<Self> {
        let corrupt = || ReplayError::CorruptEntry {
            queue: ANALYTICS_QUEUE.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        };
        let url = Url::parse(key).map_err(|_| corrupt())?;
        let failed_at_ms = value.parse::<i64>().map_err(|_| corrupt())?;
        Ok(Self { url, failed_at_ms })
    }

    /// Milliseconds since the original failure; never negative.
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.failed_at_ms).max(0)
    }

    /// The hit to send again, tagged with how long it sat in the queue.
    pub fn replay_request(&self, now_ms: i64) -> OutboundRequest {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair(QUEUE_TIME_PARAM, &self.elapsed_ms(now_ms).to_string());
        OutboundRequest::get(url)
    }
}

/// Queue of analytics pings, abandoned once they are older than the
/// retention window because the collector no longer accepts them.
pub struct AnalyticsQueue {
    store: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl AnalyticsQueue {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        retention: Duration,
    ) -> Self {
        Self {
            store,
            transport,
            clock,
            retention,
        }
    }

    pub async fn open(
        backend: &dyn StoreBackend,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        retention: Duration,
    ) -> Result<Self> {
        let store = backend.open(ANALYTICS_QUEUE).await?;
        Ok(Self::new(store, transport, clock, retention))
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    fn is_expired(&self, elapsed_ms: i64) -> bool {
        elapsed_ms as u128 > self.retention.as_millis()
    }
}

#[async_trait::async_trait]
impl ReplayQueue for AnalyticsQueue {
    fn name(&self) -> &str {
        self.store.name()
    }

    async fn enqueue(&self, request: &OutboundRequest) {
        let now = self.clock.now_ms();
        store_entry(self.store.as_ref(), request.url.as_str(), &now.to_string()).await;
        tracing::debug!("[queue {}] Staged {}", self.name(), request.url);
    }

    async fn replay_all(&self) -> ReplayReport {
        let mut report = ReplayReport::new(self.name());

        for (key, value) in snapshot(self.store.as_ref()).await {
            report.attempted += 1;

            let entry = match AnalyticsEntry::decode(&key, &value) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("[queue {}] Dropping unreadable entry: {}", self.name(), e);
                    remove_entry(self.store.as_ref(), &key).await;
                    report.corrupt += 1;
                    continue;
                }
            };

            let now = self.clock.now_ms();
            let elapsed_ms = entry.elapsed_ms(now);
            let result = self.transport.send(&entry.replay_request(now)).await;

            match classify(&result) {
                Delivery::Delivered(status) => {
                    tracing::debug!(
                        "[queue {}] Replayed {} ({}, queued {}ms)",
                        self.name(),
                        key,
                        status,
                        elapsed_ms
                    );
                    remove_entry(self.store.as_ref(), &key).await;
                    report.delivered += 1;
                }
                Delivery::Retryable(reason) if self.is_expired(elapsed_ms) => {
                    tracing::info!(
                        "[queue {}] Abandoning {} after {}ms: {}",
                        self.name(),
                        key,
                        elapsed_ms,
                        reason
                    );
                    remove_entry(self.store.as_ref(), &key).await;
                    report.expired += 1;
                }
                Delivery::Retryable(reason) => {
                    tracing::debug!(
                        "[queue {}] Replay of {} failed, keeping it: {}",
                        self.name(),
                        key,
                        reason
                    );
                    report.retained += 1;
                }
            }
        }

        if !report.is_empty() {
            tracing::info!("[queue] Replay finished: {}", report);
        }
        report
    }

    async fn pending(&self) -> Result<Vec<(String, String)>> {
        self.store.entries().await
    }
}

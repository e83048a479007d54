use super::{
    remove_entry, snapshot, store_entry, ReplayQueue, ReplayReport, SESSION_UPDATES_QUEUE,
};
use crate::classify::{classify, Delivery};
use crate::error::{ReplayError, Result};
use crate::store::{KeyValueStore, StoreBackend};
use crate::transport::{OutboundRequest, Transport};
use http::Method;
use std::sync::Arc;
use url::Url;

/// A failed schedule mutation: which resource, and which verb to reapply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEntry {
    pub url: Url,
    pub method: Method,
}

impl MutationEntry {
    pub fn decode(key: &str, value: &str) -> Result<Self> {
        let corrupt = || ReplayError::CorruptEntry {
            queue: SESSION_UPDATES_QUEUE.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        };
        let url = Url::parse(key).map_err(|_| corrupt())?;
        let method = Method::from_bytes(value.as_bytes()).map_err(|_| corrupt())?;
        Ok(Self { url, method })
    }

    pub fn replay_request(&self) -> OutboundRequest {
        OutboundRequest::new(self.method.clone(), self.url.clone())
    }
}

/// Queue of schedule mutations. Entries have no expiry; the last verb
/// staged for a URL wins, which is what bounds the queue.
pub struct MutationQueue {
    store: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
}

impl MutationQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, transport: Arc<dyn Transport>) -> Self {
        Self { store, transport }
    }

    pub async fn open(backend: &dyn StoreBackend, transport: Arc<dyn Transport>) -> Result<Self> {
        let store = backend.open(SESSION_UPDATES_QUEUE).await?;
        Ok(Self::new(store, transport))
    }
}

#[async_trait::async_trait]
impl ReplayQueue for MutationQueue {
    fn name(&self) -> &str {
        self.store.name()
    }

    async fn enqueue(&self, request: &OutboundRequest) {
        store_entry(
            self.store.as_ref(),
            request.url.as_str(),
            request.method.as_str(),
        )
        .await;
        tracing::debug!(
            "[queue {}] Staged {} {}",
            self.name(),
            request.method,
            request.url
        );
    }

    async fn replay_all(&self) -> ReplayReport {
        let mut report = ReplayReport::new(self.name());

        for (key, value) in snapshot(self.store.as_ref()).await {
            report.attempted += 1;

            let entry = match MutationEntry::decode(&key, &value) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("[queue {}] Dropping unreadable entry: {}", self.name(), e);
                    remove_entry(self.store.as_ref(), &key).await;
                    report.corrupt += 1;
                    continue;
                }
            };

            let result = self.transport.send(&entry.replay_request()).await;
            match classify(&result) {
                Delivery::Delivered(status) => {
                    tracing::debug!(
                        "[queue {}] Replayed {} {} ({})",
                        self.name(),
                        entry.method,
                        key,
                        status
                    );
                    remove_entry(self.store.as_ref(), &key).await;
                    report.delivered += 1;
                }
                Delivery::Retryable(reason) => {
                    tracing::debug!(
                        "[queue {}] Replay of {} {} failed, keeping it: {}",
                        self.name(),
                        entry.method,
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

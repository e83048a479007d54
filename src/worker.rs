use crate::clock::Clock;
use crate::config::ReplayConfig;
use crate::error::{ReplayError, Result};
use crate::intercept::Interceptor;
use crate::queue::{AnalyticsQueue, MutationQueue, ReplayQueue, ReplayReport};
use crate::store::StoreBackend;
use crate::transport::Transport;
use std::sync::Arc;

/// Owns both queues and the interceptor that feeds them.
///
/// Replay is driven by [`Worker::on_startup`], once per process start, and
/// by explicit [`Worker::replay`] calls. There is no periodic timer.
pub struct Worker {
    pub analytics: Arc<AnalyticsQueue>,
    pub session_updates: Arc<MutationQueue>,
    pub interceptor: Arc<Interceptor>,
}

impl Worker {
    pub async fn open(
        config: &ReplayConfig,
        backend: &dyn StoreBackend,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let analytics = AnalyticsQueue::open(
            backend,
            Arc::clone(&transport),
            clock,
            config.analytics_retention(),
        )
        .await?;
        let session_updates = MutationQueue::open(backend, Arc::clone(&transport)).await?;

        Ok(Self {
            analytics: Arc::new(analytics),
            session_updates: Arc::new(session_updates),
            interceptor: Arc::new(Interceptor::new(transport)),
        })
    }

    pub fn queues(&self) -> Vec<Arc<dyn ReplayQueue>> {
        vec![
            self.analytics.clone() as Arc<dyn ReplayQueue>,
            self.session_updates.clone() as Arc<dyn ReplayQueue>,
        ]
    }

    pub fn queue(&self, name: &str) -> Result<Arc<dyn ReplayQueue>> {
        self.queues()
            .into_iter()
            .find(|q| q.name() == name)
            .ok_or_else(|| ReplayError::UnknownQueue(name.to_string()))
    }

    /// One replay pass over every queue.
    pub async fn on_startup(&self) -> Vec<ReplayReport> {
        tracing::info!("[worker] Start-up replay of {} queues", self.queues().len());
        self.replay_all().await
    }

    pub async fn replay_all(&self) -> Vec<ReplayReport> {
        let mut reports = Vec::new();
        for queue in self.queues() {
            reports.push(queue.replay_all().await);
        }
        reports
    }

    pub async fn replay(&self, name: &str) -> Result<ReplayReport> {
        Ok(self.queue(name)?.replay_all().await)
    }
}

//! # replayq
//!
//! Persistent, deduplicating replay queues for outbound requests that failed
//! with a server error or never got a response.
//!
//! A monitored request goes through an [`Interceptor`]. If the upstream
//! answers with anything below 500 the response is handed back untouched;
//! otherwise the request is staged in a named queue and the caller gets a
//! placeholder `202 Accepted`. Staged requests are replayed when the
//! [`Worker`] starts up or when a replay is asked for explicitly.
//!
//! Two queues exist:
//!
//! | Queue | Value | Replay | Expiry |
//! |-------|-------|--------|--------|
//! | `offline-analytics` | failure time (epoch ms) | `GET url&qt=<elapsed>` | dropped after the retention window (24h) |
//! | `offline-session-updates` | HTTP method | `<method> url` | none |
//!
//! Both are keyed by absolute URL, so staging the same URL twice keeps only
//! the latest value.
//!
//! ```rust,no_run
//! use replayq::{HttpTransport, MemoryBackend, ReplayConfig, SystemClock, Worker};
//! use std::sync::Arc;
//!
//! # async fn run() -> replayq::Result<()> {
//! let config = ReplayConfig::from_env()?;
//! let backend = MemoryBackend::new();
//! let transport = Arc::new(HttpTransport::new(config.request_timeout())?);
//! let worker = Worker::open(&config, &backend, transport, Arc::new(SystemClock)).await?;
//!
//! for report in worker.on_startup().await {
//!     println!("{}", report);
//! }
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod clock;
pub mod config;
pub mod error;
pub mod intercept;
pub mod queue;
pub mod store;
pub mod transport;
pub mod worker;

pub use classify::{classify, Delivery};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ReplayConfig, StoreKind};
pub use error::{ReplayError, Result};
pub use intercept::{Intercepted, Interceptor, QUEUED_HEADER};
pub use queue::{
    AnalyticsQueue, MutationQueue, ReplayQueue, ReplayReport, ANALYTICS_QUEUE,
    SESSION_UPDATES_QUEUE,
};
pub use store::{FileBackend, KeyValueStore, MemoryBackend, StoreBackend};
pub use transport::{HttpTransport, OutboundRequest, Transport, TransportResponse};
pub use worker::Worker;

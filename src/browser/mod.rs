//! Rendering runtime lifecycle
//!
//! The scheduler treats the rendering runtime as an opaque capability with
//! exactly two lifecycle operations: start a handle, retire a handle. Long
//! lived runtimes accumulate leaked resources, so the scheduler periodically
//! retires the current handle and starts a fresh one (see
//! [`Scheduler`](crate::crawler::Scheduler)); this module defines that
//! contract and the default HTTP-backed runtime.

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Fatal failure to bring up a fresh runtime handle
///
/// Once reinitialization fails the scheduler stays drained; retry policy for
/// the shared resource belongs to the deployment, not this crate.
#[derive(Debug, Error)]
#[error("Runtime initialization failed: {0}")]
pub struct RuntimeInitError(String);

impl RuntimeInitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Provider of recyclable rendering handles
///
/// The handle is opaque to the scheduler: it is cloned out to execution
/// units while they run and replaced wholesale during a recycle. Only the
/// scheduler closes or replaces a handle, and only once nothing is running
/// against it.
#[async_trait]
pub trait BrowserRuntime: Send + Sync + 'static {
    type Handle: Send + Sync + 'static;

    /// Starts a fresh handle
    async fn initialize(&self) -> Result<Self::Handle, RuntimeInitError>;

    /// Retires a handle that no unit is using anymore
    async fn close(&self, handle: &Self::Handle);
}

/// Default runtime: recyclable HTTP render clients
///
/// Each handle wraps a freshly-built `reqwest` client; recycling a handle
/// tears down its connection pool and starts over, bounding pool growth the
/// same way restarting a browser process bounds its leaks.
pub struct HttpRenderer {
    user_agent: String,
    request_timeout: Duration,
    generation: AtomicU64,
}

/// One generation of render client
pub struct RenderClient {
    client: Client,
    generation: u64,
}

impl RenderClient {
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Monotonic generation number, starting at 1
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl HttpRenderer {
    /// Creates a renderer identifying itself with the configured user agent
    ///
    /// The user agent string is formatted as
    /// `Name/Version (+ContactURL; ContactEmail)`.
    pub fn new(config: &UserAgentConfig, request_timeout: Duration) -> Self {
        let user_agent = format!(
            "{}/{} (+{}; {})",
            config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
        );

        Self {
            user_agent,
            request_timeout,
            generation: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl BrowserRuntime for HttpRenderer {
    type Handle = RenderClient;

    async fn initialize(&self) -> Result<RenderClient, RuntimeInitError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let client = Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| RuntimeInitError::new(e.to_string()))?;

        tracing::info!("Initialized render client generation {}", generation);

        Ok(RenderClient { client, generation })
    }

    async fn close(&self, handle: &RenderClient) {
        // Dropping the last clone of the inner client tears down its pool;
        // nothing to signal beyond that.
        tracing::info!("Retiring render client generation {}", handle.generation);
    }
}

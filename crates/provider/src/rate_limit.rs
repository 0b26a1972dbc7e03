//! Local request rate limiting
//!
//! A rolling one-minute window of request timestamps shared by every
//! concurrent query in the process.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{ChatParams, ChatResponse, Provider, ProviderError, Result};

const WINDOW: Duration = Duration::from_secs(60);

/// Rolling-window limiter
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    requests: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Allow `per_minute` requests in any 60 second window
    pub fn per_minute(per_minute: u32) -> Self {
        Self::with_window(per_minute, WINDOW)
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            requests: Mutex::new(VecDeque::new()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Record one request, or fail if the window is already full.
    /// Rejected attempts are not recorded.
    pub async fn acquire(&self) -> Result<()> {
        let now = Instant::now();
        let mut requests = self.requests.lock().await;

        while let Some(oldest) = requests.front() {
            if now.duration_since(*oldest) >= self.window {
                requests.pop_front();
            } else {
                break;
            }
        }

        if requests.len() >= self.limit as usize {
            let retry_after = requests
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window)
                .as_secs()
                .max(1);
            warn!(
                "Rate limit exceeded: {} requests in the last {}s",
                requests.len(),
                self.window.as_secs()
            );
            return Err(ProviderError::Throttled {
                limit: self.limit,
                retry_after,
            });
        }

        requests.push_back(now);
        debug!("Rate limiter: {}/{} in window", requests.len(), self.limit);
        Ok(())
    }

    /// Requests currently counted against the window
    pub async fn in_window(&self) -> usize {
        let now = Instant::now();
        let requests = self.requests.lock().await;
        requests
            .iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .count()
    }
}

/// Provider decorator that consults a [`RateLimiter`] before every call
pub struct ThrottledProvider<P> {
    inner: P,
    limiter: Arc<RateLimiter>,
}

impl<P: Provider> ThrottledProvider<P> {
    pub fn new(inner: P, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

#[async_trait::async_trait]
impl<P: Provider> Provider for ThrottledProvider<P> {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        self.limiter.acquire().await?;
        self.inner.chat(params).await
    }

    fn default_model(&self) -> String {
        self.inner.default_model()
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }
}

//! Capacity-bounded pool of isolated browsing contexts.
//!
//! Each acquired [`PortalContext`] is backed by its own headless engine
//! instance, so cookie/storage isolation between users is structural rather
//! than policed. Releasing a context consumes it; there is no way to release
//! twice or keep using a released context.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser::engine;
use crate::browser::waits::deadline;
use crate::config::Config;
use crate::error::{BrowserError, PortalError, Result};

/// One isolated browsing context: an engine instance, its page, and the
/// pool permit it occupies. Dropped permits restore pool capacity.
pub struct PortalContext {
    serial: u64,
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    _permit: OwnedSemaphorePermit,
}

impl PortalContext {
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Shut the engine down. Failures here are logged, never escalated:
    /// the process is already done with this context.
    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("context #{}: engine shutdown failed: {}", self.serial, e);
        }
        self.handler.abort();
        debug!("context #{} released", self.serial);
    }
}

/// Seam the session store depends on; production uses [`BrowserPool`],
/// tests substitute a counting fake.
#[async_trait]
pub trait EnginePool: Send + Sync + 'static {
    type Ctx: Send + 'static;

    async fn acquire(&self) -> Result<Self::Ctx>;
    async fn release(&self, ctx: Self::Ctx);
}

/// Production pool over headless Chromium.
pub struct BrowserPool {
    config: Config,
    permits: Arc<Semaphore>,
    next_serial: AtomicU64,
}

impl BrowserPool {
    /// Start the pool. Performs a probe launch so an environment where the
    /// engine cannot start fails here, fatally, instead of on first use.
    pub async fn start(config: Config) -> Result<Self> {
        info!("🚀 starting browser pool (capacity {})", config.pool_capacity);
        let (mut probe, handle) = engine::launch(&config).await?;
        if let Err(e) = probe.close().await {
            warn!("probe engine shutdown failed: {}", e);
        }
        handle.abort();
        debug!("engine probe launch succeeded");

        Ok(Self {
            permits: Arc::new(Semaphore::new(config.pool_capacity)),
            next_serial: AtomicU64::new(1),
            config,
        })
    }
}

#[async_trait]
impl EnginePool for BrowserPool {
    type Ctx = PortalContext;

    /// Hand out a fresh isolated context, or report exhaustion immediately.
    /// Callers are never queued: bounding user-visible latency beats
    /// eventually servicing everyone.
    async fn acquire(&self) -> Result<PortalContext> {
        let permit = self
            .permits
            .clone()
            .try_acquire_owned()
            .map_err(|_| PortalError::ResourceExhausted)?;

        let nav_bound = Duration::from_secs(self.config.nav_timeout_secs);
        let (browser, handler) = deadline(nav_bound, "launching browser engine", engine::launch(&self.config)).await?;

        let page = match deadline(nav_bound, "creating page", async {
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| BrowserError::PageCreationFailed(e).into())
        })
        .await
        {
            Ok(page) => page,
            Err(e) => {
                let mut browser = browser;
                if let Err(close_err) = browser.close().await {
                    warn!("engine shutdown after failed page creation: {}", close_err);
                }
                handler.abort();
                return Err(e);
            }
        };

        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        debug!("context #{} acquired", serial);
        Ok(PortalContext {
            serial,
            browser,
            page,
            handler,
            _permit: permit,
        })
    }

    async fn release(&self, ctx: PortalContext) {
        ctx.close().await;
    }
}

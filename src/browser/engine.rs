//! Headless engine startup.

use std::path::Path;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::{BrowserError, Result};

/// Launch a fresh headless engine instance with its own profile directory,
/// so its cookie/storage jar is isolated from every other instance.
///
/// The returned handle drains CDP events in the background; it ends when the
/// browser process goes away.
pub async fn launch(config: &Config) -> Result<(Browser, JoinHandle<()>)> {
    let mut builder = BrowserConfig::builder().new_headless_mode().args(vec![
        "--disable-gpu",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--remote-debugging-port=0",
    ]);
    if let Some(exe) = &config.chrome_executable {
        builder = builder.chrome_executable(Path::new(exe));
    }
    let browser_config = builder
        .build()
        .map_err(BrowserError::Configuration)?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("failed to launch headless engine: {}", e);
        BrowserError::LaunchFailed(e)
    })?;
    debug!("headless engine launched");

    let handle = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // Give the engine a moment to finish its startup handshake.
    sleep(Duration::from_millis(300)).await;

    Ok((browser, handle))
}

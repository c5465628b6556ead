//! Diagnostic screenshots for outcomes a human may need to eyeball.

use std::path::PathBuf;

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use tracing::warn;

use crate::config::Config;

/// Capture the page to `<screenshot_dir>/<tag>_<timestamp>.png`.
///
/// Best-effort: a failed capture only loses the diagnostics, never changes
/// the outcome it was documenting.
pub async fn capture(config: &Config, page: &Page, tag: &str) -> Option<PathBuf> {
    if let Err(e) = std::fs::create_dir_all(&config.screenshot_dir) {
        warn!("could not create screenshot dir: {}", e);
        return None;
    }
    let path = PathBuf::from(&config.screenshot_dir).join(format!(
        "{tag}_{}.png",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ));
    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .build();
    match page.save_screenshot(params, &path).await {
        Ok(_) => Some(path),
        Err(e) => {
            warn!("diagnostic screenshot failed: {}", e);
            None
        }
    }
}

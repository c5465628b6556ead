//! Liveness probe: is a held context still authenticated server-side?

use chromiumoxide::Page;
use tracing::debug;

use crate::auth::login::LOGGED_IN_SELECTORS;

/// Inspect already-loaded DOM state for an authenticated-only marker.
///
/// Non-navigating and fail-closed: any evaluation error reads as "not
/// live", so the worst case is an unnecessary re-login, never an
/// extraction against a logged-out page.
pub async fn probe(page: &Page) -> bool {
    let checks: Vec<String> = LOGGED_IN_SELECTORS
        .iter()
        .map(|s| format!("!!document.querySelector('{s}')"))
        .collect();
    let js = format!("({})", checks.join(" || "));

    match page.evaluate(js).await {
        Ok(result) => match result.into_value::<bool>() {
            Ok(live) => live,
            Err(e) => {
                debug!("liveness probe returned non-boolean: {}", e);
                false
            }
        },
        Err(e) => {
            debug!("liveness probe evaluation failed: {}", e);
            false
        }
    }
}

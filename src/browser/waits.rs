//! Bounded waits. No browser interaction in this crate is allowed to hang:
//! every navigation, element wait and render wait runs under an explicit
//! upper bound and produces a typed timeout when it elapses.

use std::future::Future;
use std::time::Duration;

use chromiumoxide::element::Element;
use chromiumoxide::Page;
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use crate::error::{PortalError, Result};

/// Run `fut` under `dur`; elapsing maps to [`PortalError::Timeout`].
pub async fn deadline<T, F>(dur: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(dur, fut).await {
        Ok(res) => res,
        Err(_) => Err(PortalError::Timeout {
            what: what.to_string(),
        }),
    }
}

/// Poll for a selector until it renders or the bound elapses.
pub async fn wait_for_selector(
    page: &Page,
    selector: &str,
    bound: Duration,
    poll: Duration,
) -> Result<Element> {
    let started = Instant::now();
    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }
        if started.elapsed() >= bound {
            return Err(PortalError::Timeout {
                what: format!("waiting for selector {selector}"),
            });
        }
        sleep(poll).await;
    }
}

/// Wait for the page's template engine to finish substituting placeholders.
///
/// The portal renders some pages client-side; until that finishes the DOM is
/// full of literal `{{ ... }}` text. Returns whether the page settled —
/// callers proceed either way, since partial data beats none.
pub async fn wait_for_templates_settled(page: &Page, bound: Duration, poll: Duration) -> bool {
    const PROBE: &str =
        "document.body ? document.body.innerText.indexOf('{{') === -1 : false";
    let started = Instant::now();
    loop {
        let settled = match page.evaluate(PROBE.to_string()).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(e) => {
                debug!("template settle probe failed: {}", e);
                false
            }
        };
        if settled {
            return true;
        }
        if started.elapsed() >= bound {
            debug!("template placeholders did not settle within bound, proceeding");
            return false;
        }
        sleep(poll).await;
    }
}

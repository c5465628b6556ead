//! Portal login flow.
//!
//! The portal is a classic ASP.NET student-cp: a credential form with fixed
//! element ids, a postback, and then either an error label, a dashboard
//! redirect, or (on bad days) nothing conclusive at all.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::auth::{Authenticate, AuthOutcome};
use crate::browser::waits::{deadline, wait_for_selector};
use crate::browser::PortalContext;
use crate::config::Config;
use crate::error::{BrowserError, PortalError, Result};

const USERNAME_SELECTOR: &str = "#txtUserName";
const PASSWORD_SELECTOR: &str = "#txtPassword";
const SUBMIT_SELECTOR: &str = "#btnLogin";

/// Explicit rejection indicators, most specific first.
const INVALID_SELECTORS: &[&str] = &["#lblMsg", "#lblError"];

/// Structural logged-in markers, checked before any locale-dependent text.
pub(crate) const LOGGED_IN_SELECTORS: &[&str] = &["#ctl00_lblStudentName", "#divStudentDashboard"];

/// Locale-dependent fallback: the dashboard heading text.
const DASHBOARD_TEXT: &str = "Dashboard";

/// Overlay close buttons the portal sometimes throws over the dashboard.
const OVERLAY_CLOSE_SELECTORS: &[&str] = &["#btnCloseAnnouncement", ".modal-announcement .close"];

/// Signals observed on the page after submitting credentials.
#[derive(Debug, Default)]
pub(crate) struct LoginSignals {
    pub url: Option<String>,
    pub invalid_message: Option<String>,
    pub structural_marker: bool,
    pub dashboard_text: bool,
}

#[derive(Debug, PartialEq)]
pub(crate) enum Classified {
    Authenticated,
    Invalid(String),
    Undecided,
}

/// Decide the login outcome from one round of observed signals.
///
/// Fixed priority: an explicit rejection wins outright, then the logged-in
/// indicators in order — URL pattern, structural element, dashboard text.
/// Structural indicators outrank textual ones on purpose; the text is
/// locale-dependent and has drifted before.
pub(crate) fn classify(signals: &LoginSignals, url_marker: &str) -> Classified {
    if let Some(msg) = &signals.invalid_message {
        return Classified::Invalid(msg.clone());
    }
    if let Some(url) = &signals.url {
        if url.contains(url_marker) {
            return Classified::Authenticated;
        }
    }
    if signals.structural_marker || signals.dashboard_text {
        return Classified::Authenticated;
    }
    Classified::Undecided
}

/// Production authenticator over a [`PortalContext`].
pub struct PortalAuthenticator {
    config: Config,
}

impl PortalAuthenticator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    async fn observe(&self, page: &Page) -> LoginSignals {
        let mut signals = LoginSignals {
            url: page.url().await.ok().flatten(),
            ..Default::default()
        };

        for selector in INVALID_SELECTORS {
            if let Ok(element) = page.find_element(*selector).await {
                if let Ok(Some(text)) = element.inner_text().await {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        signals.invalid_message = Some(text);
                        return signals;
                    }
                }
            }
        }

        for selector in LOGGED_IN_SELECTORS {
            if page.find_element(*selector).await.is_ok() {
                signals.structural_marker = true;
                return signals;
            }
        }

        if let Ok(content) = page.content().await {
            signals.dashboard_text = content.contains(DASHBOARD_TEXT);
        }
        signals
    }

    /// Diagnostic screenshot for an ambiguous outcome. Failure to capture
    /// only downgrades the diagnostics, never the outcome itself.
    async fn capture_diagnostic(&self, page: &Page) -> Option<PathBuf> {
        crate::browser::diag::capture(&self.config, page, "login_ambiguous").await
    }

    /// Best-effort dismissal of the announcement overlay the portal sometimes
    /// parks over the dashboard. Failure is ignored by design: the overlay
    /// only matters when a later selector happens to sit underneath it.
    async fn dismiss_announcement_overlay(&self, page: &Page) {
        for selector in OVERLAY_CLOSE_SELECTORS {
            if let Ok(element) = page.find_element(*selector).await {
                match element.click().await {
                    Ok(_) => {
                        debug!("dismissed announcement overlay via {}", selector);
                        return;
                    }
                    Err(e) => debug!("overlay dismissal via {} failed: {}", selector, e),
                }
            }
        }
    }
}

#[async_trait]
impl Authenticate<PortalContext> for PortalAuthenticator {
    async fn login(&self, ctx: &PortalContext, username: &str, secret: &str) -> Result<AuthOutcome> {
        let page = ctx.page();
        let login_url = self.config.login_url();
        let nav_bound = Duration::from_secs(self.config.nav_timeout_secs);
        let poll = Duration::from_millis(self.config.poll_interval_ms);

        info!("🔐 logging in as {} (context #{})", username, ctx.serial());
        deadline(nav_bound, "navigating to login page", async {
            page.goto(login_url.as_str()).await.map_err(|e| {
                PortalError::Browser(BrowserError::NavigationFailed {
                    url: login_url.clone(),
                    source: e,
                })
            })?;
            Ok(())
        })
        .await?;

        // The credential form never rendering is itself an unknown state:
        // the portal may be down, redirecting, or mid-maintenance.
        let form_bound = Duration::from_secs(self.config.form_wait_secs);
        let username_field =
            match wait_for_selector(page, USERNAME_SELECTOR, form_bound, poll).await {
                Ok(element) => element,
                Err(PortalError::Timeout { .. }) => {
                    warn!("credential form never rendered");
                    let screenshot = self.capture_diagnostic(page).await;
                    return Ok(AuthOutcome::Ambiguous { screenshot });
                }
                Err(e) => return Err(e),
            };

        username_field.click().await?;
        username_field.type_str(username).await?;
        let password_field = page.find_element(PASSWORD_SELECTOR).await?;
        password_field.click().await?;
        password_field.type_str(secret).await?;
        page.find_element(SUBMIT_SELECTOR).await?.click().await?;
        debug!("credentials submitted");

        // Single bounded race: explicit rejection vs. logged-in indicators.
        let login_bound = Duration::from_secs(self.config.login_timeout_secs);
        let started = Instant::now();
        loop {
            let signals = self.observe(page).await;
            match classify(&signals, &self.config.dashboard_url_marker) {
                Classified::Authenticated => {
                    info!("✅ login succeeded for {}", username);
                    self.dismiss_announcement_overlay(page).await;
                    return Ok(AuthOutcome::Authenticated);
                }
                Classified::Invalid(message) => {
                    info!("❌ portal rejected credentials for {}", username);
                    return Ok(AuthOutcome::InvalidCredentials(message));
                }
                Classified::Undecided => {}
            }
            if started.elapsed() >= login_bound {
                warn!("login outcome undecided after {:?}", login_bound);
                let screenshot = self.capture_diagnostic(page).await;
                return Ok(AuthOutcome::Ambiguous { screenshot });
            }
            sleep(poll).await;
        }
    }

    async fn is_live(&self, ctx: &PortalContext) -> bool {
        crate::auth::liveness::probe(ctx.page()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals() -> LoginSignals {
        LoginSignals::default()
    }

    #[test]
    fn dashboard_url_wins() {
        let observed = LoginSignals {
            url: Some("https://noble.icrp.in/academic/student-cp/Home_student.aspx".into()),
            ..signals()
        };
        assert_eq!(classify(&observed, "Home_student"), Classified::Authenticated);
    }

    #[test]
    fn explicit_rejection_beats_every_logged_in_indicator() {
        let observed = LoginSignals {
            url: Some("https://portal/Home_student".into()),
            invalid_message: Some("Invalid User Name or Password".into()),
            structural_marker: true,
            dashboard_text: true,
        };
        assert_eq!(
            classify(&observed, "Home_student"),
            Classified::Invalid("Invalid User Name or Password".into())
        );
    }

    #[test]
    fn structural_marker_authenticates_without_url_change() {
        let observed = LoginSignals {
            url: Some("https://portal/student-cp/".into()),
            structural_marker: true,
            ..signals()
        };
        assert_eq!(classify(&observed, "Home_student"), Classified::Authenticated);
    }

    #[test]
    fn dashboard_text_alone_is_still_accepted() {
        let observed = LoginSignals {
            dashboard_text: true,
            ..signals()
        };
        assert_eq!(classify(&observed, "Home_student"), Classified::Authenticated);
    }

    #[test]
    fn no_signal_stays_undecided() {
        assert_eq!(classify(&signals(), "Home_student"), Classified::Undecided);
    }
}

use serde::Deserialize;

use crate::error::{PortalError, Result};

/// Runtime configuration for the portal core.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Portal base URL
    pub portal_base_url: String,
    /// Login page path (credential form lives here)
    pub login_path: String,
    /// URL fragment that marks a logged-in dashboard
    pub dashboard_url_marker: String,
    /// Page paths per data domain
    pub attendance_path: String,
    pub fees_path: String,
    pub exam_path: String,
    pub profile_path: String,
    /// Backend JSON endpoints the pages call internally (preferred strategy)
    pub attendance_api_path: String,
    pub fees_api_path: String,
    pub exam_api_path: String,
    /// Explicit chrome/edge binary; None lets chromiumoxide auto-detect
    pub chrome_executable: Option<String>,
    /// Maximum concurrently held browsing contexts
    pub pool_capacity: usize,
    /// Upper bound for any single navigation
    pub nav_timeout_secs: u64,
    /// Upper bound for the whole login outcome race
    pub login_timeout_secs: u64,
    /// Upper bound for the credential form to render
    pub form_wait_secs: u64,
    /// How long to wait for template placeholders to settle before reading
    pub render_settle_ms: u64,
    /// Polling interval for element/indicator waits
    pub poll_interval_ms: u64,
    /// Sliding session expiry window
    pub session_ttl_secs: u64,
    /// Freshness window for per-session cached records
    pub cache_ttl_secs: u64,
    /// Where diagnostic screenshots land
    pub screenshot_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_base_url: "https://noble.icrp.in/academic".to_string(),
            login_path: "/student-cp/".to_string(),
            dashboard_url_marker: "Home_student".to_string(),
            attendance_path: "/student-cp/attendance".to_string(),
            fees_path: "/student-cp/fees".to_string(),
            exam_path: "/student-cp/results".to_string(),
            profile_path: "/student-cp/profile".to_string(),
            attendance_api_path: "/student-cp/api/attendance".to_string(),
            fees_api_path: "/student-cp/api/feeledger".to_string(),
            exam_api_path: "/student-cp/api/examresult".to_string(),
            chrome_executable: None,
            pool_capacity: 4,
            nav_timeout_secs: 20,
            login_timeout_secs: 15,
            form_wait_secs: 10,
            render_settle_ms: 3000,
            poll_interval_ms: 200,
            session_ttl_secs: 900,
            cache_ttl_secs: 60,
            screenshot_dir: "diagnostics".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            portal_base_url: std::env::var("PORTAL_BASE_URL").unwrap_or(default.portal_base_url),
            login_path: std::env::var("PORTAL_LOGIN_PATH").unwrap_or(default.login_path),
            dashboard_url_marker: std::env::var("PORTAL_DASHBOARD_MARKER").unwrap_or(default.dashboard_url_marker),
            attendance_path: std::env::var("PORTAL_ATTENDANCE_PATH").unwrap_or(default.attendance_path),
            fees_path: std::env::var("PORTAL_FEES_PATH").unwrap_or(default.fees_path),
            exam_path: std::env::var("PORTAL_EXAM_PATH").unwrap_or(default.exam_path),
            profile_path: std::env::var("PORTAL_PROFILE_PATH").unwrap_or(default.profile_path),
            attendance_api_path: std::env::var("PORTAL_ATTENDANCE_API").unwrap_or(default.attendance_api_path),
            fees_api_path: std::env::var("PORTAL_FEES_API").unwrap_or(default.fees_api_path),
            exam_api_path: std::env::var("PORTAL_EXAM_API").unwrap_or(default.exam_api_path),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.chrome_executable),
            pool_capacity: std::env::var("POOL_CAPACITY").ok().and_then(|v| v.parse().ok()).unwrap_or(default.pool_capacity),
            nav_timeout_secs: std::env::var("NAV_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.nav_timeout_secs),
            login_timeout_secs: std::env::var("LOGIN_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.login_timeout_secs),
            form_wait_secs: std::env::var("FORM_WAIT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.form_wait_secs),
            render_settle_ms: std::env::var("RENDER_SETTLE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.render_settle_ms),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_interval_ms),
            session_ttl_secs: std::env::var("SESSION_TTL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.session_ttl_secs),
            cache_ttl_secs: std::env::var("CACHE_TTL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.cache_ttl_secs),
            screenshot_dir: std::env::var("SCREENSHOT_DIR").unwrap_or(default.screenshot_dir),
        }
    }

    /// Load from a TOML file; missing keys fall back to defaults.
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| PortalError::Config(format!("{path}: {e}")))
    }

    /// Absolute URL for a portal page path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.portal_base_url.trim_end_matches('/'), path)
    }

    pub fn login_url(&self) -> String {
        self.url(&self.login_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let mut config = Config::default();
        config.portal_base_url = "https://portal.example/academic/".to_string();
        assert_eq!(
            config.url("/student-cp/attendance"),
            "https://portal.example/academic/student-cp/attendance"
        );
    }

    #[test]
    fn file_config_fills_missing_keys_with_defaults() {
        let parsed: Config = toml::from_str("pool_capacity = 2\n").unwrap();
        assert_eq!(parsed.pool_capacity, 2);
        assert_eq!(parsed.session_ttl_secs, Config::default().session_ttl_secs);
    }
}

//! Error taxonomy for the portal core.
//!
//! Every caller-visible outcome the portal can produce is a distinct variant:
//! "wrong credentials", "login outcome unknown", "session went stale",
//! "pool full" and "page unreadable" must never collapse into one another.

use std::path::PathBuf;

use chromiumoxide::error::CdpError;
use thiserror::Error;

/// Top-level error type for all portal operations.
#[derive(Debug, Error)]
pub enum PortalError {
    /// The portal explicitly rejected the stored credentials.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Login neither succeeded nor was rejected within the allotted time.
    /// The portal's state is unknown; a diagnostic screenshot may exist.
    #[error("login outcome unknown (screenshot: {screenshot:?})")]
    AmbiguousAuth { screenshot: Option<PathBuf> },

    /// No credential is stored for this user, so no session can be built.
    #[error("no stored credential for user {0}")]
    CredentialMissing(i64),

    /// A held session turned out to be no longer authenticated server-side.
    #[error("session is no longer authenticated")]
    SessionInvalid,

    /// The browser pool is at capacity; the caller should retry later.
    #[error("browser pool at capacity")]
    ResourceExhausted,

    /// A navigation, wait or network call exceeded its upper bound.
    #[error("timed out while {what}")]
    Timeout { what: String },

    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// The page was unreachable or its structure could not be read at all.
    /// Field-level parse problems never surface here.
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Browser-engine level failures.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser configuration failed: {0}")]
    Configuration(String),

    #[error("failed to launch browser engine: {0}")]
    LaunchFailed(#[source] CdpError),

    #[error("failed to create page: {0}")]
    PageCreationFailed(#[source] CdpError),

    #[error("navigation to {url} failed: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: CdpError,
    },

    #[error("script evaluation failed: {0}")]
    ScriptFailed(#[source] CdpError),
}

impl From<CdpError> for PortalError {
    fn from(err: CdpError) -> Self {
        PortalError::Browser(BrowserError::ScriptFailed(err))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PortalError>;

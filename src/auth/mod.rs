//! Authentication layer: driving the portal's login form and deciding,
//! within a bounded window, which of three outcomes happened.

pub mod liveness;
pub mod login;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;

/// Outcome of one login attempt. `Ambiguous` is a real third state: the
/// portal answered with neither a rejection nor a logged-in page before the
/// bound elapsed, so the session state is unknown and must not be guessed.
#[derive(Debug)]
pub enum AuthOutcome {
    Authenticated,
    InvalidCredentials(String),
    Ambiguous { screenshot: Option<PathBuf> },
}

/// Seam between the session store and the login machinery. Production is
/// [`login::PortalAuthenticator`]; tests script outcomes with a fake.
#[async_trait]
pub trait Authenticate<C>: Send + Sync + 'static {
    /// Drive the login form inside `ctx`. The context stays owned by the
    /// caller; on failure it is the caller's job to release it.
    async fn login(&self, ctx: &C, username: &str, secret: &str) -> Result<AuthOutcome>;

    /// Cheap, non-navigating check that a held context is still
    /// authenticated server-side. Must never fail: any internal error
    /// reads as "not live" so a stale session is rebuilt, not trusted.
    async fn is_live(&self, ctx: &C) -> bool;
}

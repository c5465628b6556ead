//! Browser engine layer: launching headless Chromium, bounded waits, and the
//! capacity-limited context pool. Nothing above this layer talks to the
//! engine directly; everything goes through a [`PortalContext`].

pub mod diag;
pub mod engine;
pub mod pool;
pub mod waits;

pub use pool::{BrowserPool, EnginePool, PortalContext};

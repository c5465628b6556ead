//! Session lifecycle: one live authenticated browsing context per user,
//! rebuilt on expiry or server-side invalidation, torn down exactly once.

pub mod store;

pub use store::{SessionMeta, SessionStore};

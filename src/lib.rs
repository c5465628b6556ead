//! # Noble ERP portal core
//!
//! Drives a headless browser against the Noble ERP student portal, keeps
//! one authenticated session alive per user, and extracts structured
//! attendance / fee / exam / profile records from pages whose markup
//! drifts, half-renders, and duplicates itself.
//!
//! ## Layers
//!
//! ### ① Browser engine (`browser/`)
//! - `engine` launches isolated headless instances
//! - `pool` hands out capacity-bounded [`browser::PortalContext`]s; release
//!   consumes the context, so double-release cannot be written
//!
//! ### ② Authentication (`auth/`)
//! - `login` drives the credential form and classifies the outcome:
//!   authenticated, rejected, or genuinely ambiguous (with a screenshot)
//! - `liveness` is the cheap fail-closed "are we still logged in?" probe
//!
//! ### ③ Session lifecycle (`session/`)
//! - `SessionStore` runs the per-user state machine, serializes each
//!   user's browser work, and caches fresh records
//!
//! ### ④ Extraction (`extract/`)
//! - one extractor per domain, each walking an ordered list of named
//!   strategies (backend JSON replay first, DOM second) over `clean`'s
//!   junk filtering and numeric normalization
//!
//! ### ⑤ Presentation & facade
//! - `format` renders records deterministically with named thresholds
//! - `portal::Portal` wires it all for the chat front-end / scheduler

pub mod auth;
pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod logging;
pub mod portal;
pub mod session;
pub mod stores;

pub use auth::AuthOutcome;
pub use config::Config;
pub use error::{PortalError, Result};
pub use extract::{Domain, ExtractOutcome, ExtractedRecord, RecordPayload};
pub use portal::Portal;
pub use session::{SessionMeta, SessionStore};
pub use stores::Credential;

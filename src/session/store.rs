//! The session store.
//!
//! Per user_id the store runs the state machine
//! `Absent → Authenticating → Live → {Expired, Invalid} → Absent`. A user's
//! slot is a `tokio::sync::Mutex`, held across the whole browser operation,
//! so one user's interactions are strictly serialized while different users
//! proceed in parallel. Every exit from `Live` consumes the session value,
//! which makes double-release and use-after-release unrepresentable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::auth::{AuthOutcome, Authenticate};
use crate::browser::EnginePool;
use crate::config::Config;
use crate::error::{PortalError, Result};
use crate::extract::{Domain, Extract, ExtractedRecord};
use crate::stores::CredentialStore;

/// Caller-visible view of a live session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionMeta {
    pub user_id: i64,
    pub context_serial: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

struct Session<C> {
    context: C,
    serial: u64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    cache: HashMap<Domain, ExtractedRecord>,
}

impl<C> Session<C> {
    fn new(context: C, serial: u64, ttl: ChronoDuration) -> Self {
        let now = Utc::now();
        Self {
            context,
            serial,
            created_at: now,
            expires_at: now + ttl,
            cache: HashMap::new(),
        }
    }

    /// Slide the expiry window forward.
    fn touch(&mut self, ttl: ChronoDuration) {
        self.expires_at = Utc::now() + ttl;
    }

    fn expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Consume the session, yielding the context for its one release.
    fn into_context(self) -> C {
        self.context
    }
}

enum SlotState<C> {
    Absent,
    Live(Session<C>),
}

struct UserSlot<C> {
    state: SlotState<C>,
}

pub struct SessionStore<P, A>
where
    P: EnginePool,
    A: Authenticate<P::Ctx>,
{
    pool: Arc<P>,
    auth: A,
    credentials: Arc<dyn CredentialStore>,
    config: Config,
    slots: StdMutex<HashMap<i64, Arc<AsyncMutex<UserSlot<P::Ctx>>>>>,
    next_serial: AtomicU64,
}

impl<P, A> SessionStore<P, A>
where
    P: EnginePool,
    A: Authenticate<P::Ctx>,
{
    pub fn new(pool: Arc<P>, auth: A, credentials: Arc<dyn CredentialStore>, config: Config) -> Self {
        Self {
            pool,
            auth,
            credentials,
            config,
            slots: StdMutex::new(HashMap::new()),
            next_serial: AtomicU64::new(1),
        }
    }

    fn ttl(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.config.session_ttl_secs as i64)
    }

    fn slot(&self, user_id: i64) -> Result<Arc<AsyncMutex<UserSlot<P::Ctx>>>> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| PortalError::Store("session slot map poisoned".into()))?;
        Ok(slots
            .entry(user_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(UserSlot { state: SlotState::Absent })))
            .clone())
    }

    /// Return the live session for this user, rebuilding it if the slot is
    /// empty, the expiry clock has run out, or the liveness probe says the
    /// portal logged us out behind our back.
    async fn ensure_live<'a>(
        &self,
        slot: &'a mut UserSlot<P::Ctx>,
        user_id: i64,
    ) -> Result<&'a mut Session<P::Ctx>> {
        match std::mem::replace(&mut slot.state, SlotState::Absent) {
            SlotState::Live(session) if session.expired() => {
                info!("session for user {} expired, tearing down context #{}", user_id, session.serial);
                self.pool.release(session.into_context()).await;
            }
            SlotState::Live(session) => {
                if self.auth.is_live(&session.context).await {
                    slot.state = SlotState::Live(session);
                } else {
                    // Server-side logout; treated exactly like expiry.
                    info!("session for user {} failed liveness probe, tearing down", user_id);
                    self.pool.release(session.into_context()).await;
                }
            }
            SlotState::Absent => {}
        }

        if matches!(slot.state, SlotState::Absent) {
            let session = self.authenticate(user_id).await?;
            slot.state = SlotState::Live(session);
        }

        match &mut slot.state {
            SlotState::Live(session) => Ok(session),
            SlotState::Absent => Err(PortalError::SessionInvalid),
        }
    }

    /// One login attempt with the stored credential. Failures surface
    /// immediately — retrying the same credential risks a portal-side
    /// lockout — and always hand the context back to the pool.
    async fn authenticate(&self, user_id: i64) -> Result<Session<P::Ctx>> {
        let credential = self
            .credentials
            .get(user_id)
            .await?
            .ok_or(PortalError::CredentialMissing(user_id))?;

        let context = self.pool.acquire().await?;
        match self
            .auth
            .login(&context, &credential.username, &credential.secret)
            .await
        {
            Ok(AuthOutcome::Authenticated) => {
                let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
                debug!("user {} authenticated (session serial {})", user_id, serial);
                Ok(Session::new(context, serial, self.ttl()))
            }
            Ok(AuthOutcome::InvalidCredentials(message)) => {
                self.pool.release(context).await;
                Err(PortalError::InvalidCredentials(message))
            }
            Ok(AuthOutcome::Ambiguous { screenshot }) => {
                self.pool.release(context).await;
                Err(PortalError::AmbiguousAuth { screenshot })
            }
            Err(e) => {
                self.pool.release(context).await;
                Err(e)
            }
        }
    }

    /// Get the user's live session, creating one if needed.
    pub async fn get_or_create(&self, user_id: i64) -> Result<SessionMeta> {
        let slot = self.slot(user_id)?;
        let mut slot = slot.lock().await;
        let session = self.ensure_live(&mut slot, user_id).await?;
        Ok(SessionMeta {
            user_id,
            context_serial: session.serial,
            created_at: session.created_at,
            expires_at: session.expires_at,
        })
    }

    /// Tear down the user's session, if any. The context goes back to the
    /// pool exactly once; calling this again is a no-op.
    pub async fn invalidate(&self, user_id: i64) {
        let slot = match self.slot(user_id) {
            Ok(slot) => slot,
            Err(e) => {
                warn!("invalidate for user {} skipped: {}", user_id, e);
                return;
            }
        };
        let mut slot = slot.lock().await;
        if let SlotState::Live(session) = std::mem::replace(&mut slot.state, SlotState::Absent) {
            info!("invalidating session for user {} (context released)", user_id);
            self.pool.release(session.into_context()).await;
        }
    }

    /// Run an extractor against the user's session. Serialized per user by
    /// the slot lock; a fresh-enough cached record short-circuits. On
    /// success the expiry window slides. On infrastructure failure the
    /// context's state is unknown and it is torn down, not reused.
    pub async fn extract_with<E>(&self, user_id: i64, extractor: &E) -> Result<ExtractedRecord>
    where
        E: Extract<P::Ctx>,
    {
        let slot = self.slot(user_id)?;
        let mut slot = slot.lock().await;
        let session = self.ensure_live(&mut slot, user_id).await?;

        let domain = extractor.domain();
        if self.config.cache_ttl_secs > 0 {
            if let Some(cached) = session.cache.get(&domain) {
                let age = Utc::now() - cached.captured_at;
                if age < ChronoDuration::seconds(self.config.cache_ttl_secs as i64) {
                    debug!("serving cached {} record for user {}", domain, user_id);
                    return Ok(cached.clone());
                }
            }
        }

        match extractor.extract(&session.context).await {
            Ok(record) => {
                let ttl = self.ttl();
                session.touch(ttl);
                session.cache.insert(domain, record.clone());
                Ok(record)
            }
            Err(e) => {
                warn!("{} extraction failed for user {}: {} — discarding context", domain, user_id, e);
                if let SlotState::Live(session) = std::mem::replace(&mut slot.state, SlotState::Absent) {
                    self.pool.release(session.into_context()).await;
                }
                Err(e)
            }
        }
    }
}

//! The portal facade: what the chat front-end and the alert scheduler call.
//!
//! Owns the browser pool, the session store and one extractor per domain;
//! persists every successful extraction as a snapshot so change detection
//! can diff "now" against "last time".

use std::sync::Arc;

use tracing::info;

use crate::auth::login::PortalAuthenticator;
use crate::browser::BrowserPool;
use crate::config::Config;
use crate::error::Result;
use crate::extract::{
    AttendanceExtractor, Domain, ExamExtractor, ExtractOutcome, ExtractedRecord, FeesExtractor,
    ProfileExtractor,
};
use crate::session::{SessionMeta, SessionStore};
use crate::stores::{
    AlertRuleStore, Credential, CredentialStore, MemoryAlertRuleStore, MemoryCredentialStore,
    MemorySnapshotStore, SnapshotStore,
};

pub struct Portal {
    sessions: SessionStore<BrowserPool, PortalAuthenticator>,
    credentials: Arc<dyn CredentialStore>,
    snapshots: Arc<dyn SnapshotStore>,
    alerts: Arc<dyn AlertRuleStore>,
    attendance: AttendanceExtractor,
    fees: FeesExtractor,
    exam: ExamExtractor,
    profile: ProfileExtractor,
}

impl Portal {
    /// Start the portal core with bundled in-memory stores.
    pub async fn initialize(config: Config) -> Result<Self> {
        Self::with_stores(
            config,
            Arc::new(MemoryCredentialStore::default()),
            Arc::new(MemorySnapshotStore::default()),
            Arc::new(MemoryAlertRuleStore::default()),
        )
        .await
    }

    /// Start the portal core against caller-provided stores. Pool startup
    /// failure is fatal: without an engine nothing downstream can work.
    pub async fn with_stores(
        config: Config,
        credentials: Arc<dyn CredentialStore>,
        snapshots: Arc<dyn SnapshotStore>,
        alerts: Arc<dyn AlertRuleStore>,
    ) -> Result<Self> {
        let pool = Arc::new(BrowserPool::start(config.clone()).await?);
        let authenticator = PortalAuthenticator::new(config.clone());
        let sessions = SessionStore::new(pool, authenticator, credentials.clone(), config.clone());
        info!("✅ portal core ready");

        Ok(Self {
            sessions,
            credentials,
            snapshots,
            alerts,
            attendance: AttendanceExtractor::new(config.clone()),
            fees: FeesExtractor::new(config.clone()),
            exam: ExamExtractor::new(config.clone()),
            profile: ProfileExtractor::new(config),
        })
    }

    pub async fn save_credential(&self, credential: Credential) -> Result<()> {
        self.credentials.put(credential).await
    }

    pub async fn get_or_create(&self, user_id: i64) -> Result<SessionMeta> {
        self.sessions.get_or_create(user_id).await
    }

    pub async fn invalidate(&self, user_id: i64) {
        self.sessions.invalidate(user_id).await;
    }

    /// Extract one domain for one user. Successful payloads are appended to
    /// the snapshot history; empty and unparseable outcomes are not, so
    /// change detection never diffs against a bad read.
    pub async fn extract(&self, domain: Domain, user_id: i64) -> Result<ExtractedRecord> {
        let record = match domain {
            Domain::Attendance => self.sessions.extract_with(user_id, &self.attendance).await?,
            Domain::Fees => self.sessions.extract_with(user_id, &self.fees).await?,
            Domain::Exam => self.sessions.extract_with(user_id, &self.exam).await?,
            Domain::Profile => self.sessions.extract_with(user_id, &self.profile).await?,
        };

        if let ExtractOutcome::Data(payload) = &record.outcome {
            let json = serde_json::to_value(payload)?;
            self.snapshots.append(user_id, domain, json).await?;
        }
        Ok(record)
    }

    pub async fn set_alerts(&self, user_id: i64, enabled: bool) -> Result<()> {
        self.alerts.set_enabled(user_id, enabled).await
    }

    pub async fn alerts_enabled(&self, user_id: i64) -> Result<bool> {
        self.alerts.is_enabled(user_id).await
    }

    /// Did the latest capture differ from the one before it? `None` until
    /// two captures exist.
    pub async fn has_changed(&self, user_id: i64, domain: Domain) -> Result<Option<bool>> {
        let latest = self.snapshots.latest(user_id, domain).await?;
        let previous = self.snapshots.previous(user_id, domain).await?;
        Ok(match (latest, previous) {
            (Some(latest), Some(previous)) => Some(latest != previous),
            _ => None,
        })
    }
}

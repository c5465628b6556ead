//! External persistent collaborators, seen by the core as plain read/write
//! interfaces: credentials, snapshot history, and alert rules.
//!
//! The bundled memory implementations back tests and single-process use. A
//! durable [`CredentialStore`] must protect secrets at rest; the trait
//! deliberately says nothing about how.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{PortalError, Result};
use crate::extract::Domain;

/// One stored login. At most one per user_id; `put` upserts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credential {
    pub user_id: i64,
    pub username: String,
    pub secret: String,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, user_id: i64) -> Result<Option<Credential>>;
    async fn put(&self, credential: Credential) -> Result<()>;
}

/// Append-only history of extracted payloads, for change detection.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn append(&self, user_id: i64, domain: Domain, payload: JsonValue) -> Result<()>;

    /// The capture *before* the most recent one. The latest entry is always
    /// excluded so diffing "current vs. previous" never compares a capture
    /// against itself.
    async fn previous(&self, user_id: i64, domain: Domain) -> Result<Option<JsonValue>>;

    async fn latest(&self, user_id: i64, domain: Domain) -> Result<Option<JsonValue>>;
}

#[async_trait]
pub trait AlertRuleStore: Send + Sync {
    async fn set_enabled(&self, user_id: i64, enabled: bool) -> Result<()>;
    async fn is_enabled(&self, user_id: i64) -> Result<bool>;
}

// ---------- memory implementations ----------

#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<HashMap<i64, Credential>>,
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, user_id: i64) -> Result<Option<Credential>> {
        Ok(self.lock()?.get(&user_id).cloned())
    }

    async fn put(&self, credential: Credential) -> Result<()> {
        self.lock()?.insert(credential.user_id, credential);
        Ok(())
    }
}

impl MemoryCredentialStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<i64, Credential>>> {
        self.inner
            .lock()
            .map_err(|_| PortalError::Store("credential store poisoned".into()))
    }
}

#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<HashMap<(i64, Domain), Vec<(DateTime<Utc>, JsonValue)>>>,
}

type SnapshotMap = HashMap<(i64, Domain), Vec<(DateTime<Utc>, JsonValue)>>;

impl MemorySnapshotStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SnapshotMap>> {
        self.inner
            .lock()
            .map_err(|_| PortalError::Store("snapshot store poisoned".into()))
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn append(&self, user_id: i64, domain: Domain, payload: JsonValue) -> Result<()> {
        self.lock()?
            .entry((user_id, domain))
            .or_default()
            .push((Utc::now(), payload));
        Ok(())
    }

    async fn previous(&self, user_id: i64, domain: Domain) -> Result<Option<JsonValue>> {
        let guard = self.lock()?;
        let history = guard.get(&(user_id, domain));
        Ok(history.and_then(|h| {
            if h.len() >= 2 {
                h.get(h.len() - 2).map(|(_, payload)| payload.clone())
            } else {
                None
            }
        }))
    }

    async fn latest(&self, user_id: i64, domain: Domain) -> Result<Option<JsonValue>> {
        let guard = self.lock()?;
        Ok(guard
            .get(&(user_id, domain))
            .and_then(|h| h.last().map(|(_, payload)| payload.clone())))
    }
}

#[derive(Default)]
pub struct MemoryAlertRuleStore {
    inner: Mutex<HashMap<i64, bool>>,
}

#[async_trait]
impl AlertRuleStore for MemoryAlertRuleStore {
    async fn set_enabled(&self, user_id: i64, enabled: bool) -> Result<()> {
        self.inner
            .lock()
            .map_err(|_| PortalError::Store("alert rule store poisoned".into()))?
            .insert(user_id, enabled);
        Ok(())
    }

    async fn is_enabled(&self, user_id: i64) -> Result<bool> {
        Ok(*self
            .inner
            .lock()
            .map_err(|_| PortalError::Store("alert rule store poisoned".into()))?
            .get(&user_id)
            .unwrap_or(&false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn credential_put_is_an_upsert() {
        let store = MemoryCredentialStore::default();
        tokio_test::assert_ok!(
            store
                .put(Credential { user_id: 7, username: "alice".into(), secret: "old".into() })
                .await
        );
        tokio_test::assert_ok!(
            store
                .put(Credential { user_id: 7, username: "alice".into(), secret: "new".into() })
                .await
        );
        let stored = store.get(7).await.unwrap().unwrap();
        assert_eq!(stored.secret, "new");
    }

    #[tokio::test]
    async fn previous_excludes_the_most_recent_capture() {
        let store = MemorySnapshotStore::default();
        assert!(store.previous(1, Domain::Fees).await.unwrap().is_none());

        store.append(1, Domain::Fees, json!({"due": 100})).await.unwrap();
        // One capture only: there is no "previous" yet.
        assert!(store.previous(1, Domain::Fees).await.unwrap().is_none());

        store.append(1, Domain::Fees, json!({"due": 50})).await.unwrap();
        assert_eq!(store.previous(1, Domain::Fees).await.unwrap(), Some(json!({"due": 100})));
        assert_eq!(store.latest(1, Domain::Fees).await.unwrap(), Some(json!({"due": 50})));
    }

    #[tokio::test]
    async fn alert_rules_default_to_disabled() {
        let store = MemoryAlertRuleStore::default();
        assert!(!store.is_enabled(42).await.unwrap());
        store.set_enabled(42, true).await.unwrap();
        assert!(store.is_enabled(42).await.unwrap());
    }
}

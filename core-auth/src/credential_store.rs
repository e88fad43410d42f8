//! Credential Persistence
//!
//! Stores the single process-wide [`Credential`] in the host's secure
//! store, serialized as JSON. This type is the sole writer of credential
//! state; the auth flow mutates credentials only through it.
//!
//! Token values are never logged; audit lines carry only presence flags and
//! the expiry instant.

use crate::error::{AuthError, Result};
use crate::types::Credential;
use bridge_traits::storage::SecureStore;
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Storage key under which the credential lives in the secure store.
const CREDENTIAL_KEY: &str = "filmfolio_credential";

/// Secure persistence for the process credential.
#[derive(Clone)]
pub struct CredentialStore {
    secure_store: Arc<dyn SecureStore>,
    clock: Arc<dyn Clock>,
}

impl CredentialStore {
    pub fn new(secure_store: Arc<dyn SecureStore>, clock: Arc<dyn Clock>) -> Self {
        debug!("Initializing CredentialStore");
        Self {
            secure_store,
            clock,
        }
    }

    /// Current instant from the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Persist a credential, overwriting any previous one.
    pub async fn store(&self, credential: &Credential) -> Result<()> {
        let json = serde_json::to_vec(credential).map_err(|e| {
            warn!(error = %e, "Failed to serialize credential");
            AuthError::SerializationFailed(e.to_string())
        })?;

        self.secure_store
            .set_secret(CREDENTIAL_KEY, &json)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to store credential in secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!(
            has_refresh_token = credential.refresh_token.is_some(),
            expires_at = %credential.expires_at,
            "Credential stored securely"
        );
        Ok(())
    }

    /// Load the stored credential, if any.
    ///
    /// Corrupted data is deleted and reported as absent rather than
    /// surfaced: a credential that cannot be parsed cannot be used, and the
    /// interactive flow is the recovery path either way.
    pub async fn load(&self) -> Result<Option<Credential>> {
        let data = self
            .secure_store
            .get_secret(CREDENTIAL_KEY)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to read credential from secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        let Some(data) = data else {
            debug!("No credential found in storage");
            return Ok(None);
        };

        match serde_json::from_slice::<Credential>(&data) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                warn!(error = %e, "Stored credential is corrupted, clearing it");
                if let Err(delete_err) = self.secure_store.delete_secret(CREDENTIAL_KEY).await {
                    warn!(error = %delete_err, "Failed to delete corrupted credential");
                }
                Ok(None)
            }
        }
    }

    /// Delete the stored credential. Idempotent.
    pub async fn clear(&self) -> Result<()> {
        self.secure_store
            .delete_secret(CREDENTIAL_KEY)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to delete credential from secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!("Credential cleared");
        Ok(())
    }

    /// True iff a credential exists and its expiry exceeds now + 60s.
    pub async fn is_valid(&self) -> Result<bool> {
        let now = self.clock.now();
        Ok(self
            .load()
            .await?
            .map(|c| c.is_valid_at(now))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use chrono::Duration;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MockSecureStore {
        storage: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait::async_trait]
    impl SecureStore for MockSecureStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            self.storage
                .lock()
                .await
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(self.storage.lock().await.get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.storage.lock().await.remove(key);
            Ok(())
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn store_at(now: DateTime<Utc>) -> CredentialStore {
        CredentialStore::new(Arc::new(MockSecureStore::default()), Arc::new(FixedClock(now)))
    }

    fn credential(expires_at: DateTime<Utc>) -> Credential {
        Credential {
            access_token: "t1".to_string(),
            refresh_token: Some("r1".to_string()),
            expires_at,
            user_id: None,
            org_id: None,
        }
    }

    #[tokio::test]
    async fn test_store_and_load_round_trip() {
        let now = Utc::now();
        let store = store_at(now);
        store.store(&credential(now + Duration::hours(1))).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "t1");
        assert_eq!(loaded.refresh_token.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_load_absent_is_none() {
        let store = store_at(Utc::now());
        assert!(store.load().await.unwrap().is_none());
        assert!(!store.is_valid().await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupted_credential_is_cleared() {
        let secure = Arc::new(MockSecureStore::default());
        secure.set_secret(CREDENTIAL_KEY, b"not json").await.unwrap();
        let store = CredentialStore::new(secure.clone(), Arc::new(FixedClock(Utc::now())));

        assert!(store.load().await.unwrap().is_none());
        // the corrupted entry is gone
        assert!(secure.get_secret(CREDENTIAL_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_is_valid_honors_buffer() {
        let now = Utc::now();
        let store = store_at(now);

        store.store(&credential(now + Duration::hours(1))).await.unwrap();
        assert!(store.is_valid().await.unwrap());

        // 59s from now is inside the 60s buffer
        store.store(&credential(now + Duration::seconds(59))).await.unwrap();
        assert!(!store.is_valid().await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = store_at(Utc::now());
        store.clear().await.unwrap();
        store.store(&credential(Utc::now())).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}

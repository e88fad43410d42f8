use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Safety buffer subtracted from the stored expiry when deciding validity.
///
/// Covers clock skew between client and server plus the latency of an
/// in-flight request issued just before the boundary.
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// The authenticated session material.
///
/// Exactly one credential is valid per process; the credential store is its
/// sole writer. Created on token exchange or refresh, destroyed on logout
/// or irrecoverable refresh failure.
///
/// # Security
///
/// The `Debug` implementation redacts token values; credentials are only
/// ever persisted through the host's secure store.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Access token used as the Bearer credential on API requests
    pub access_token: String,
    /// Refresh token used to obtain new access tokens
    pub refresh_token: Option<String>,
    /// When the access token expires (UTC)
    pub expires_at: DateTime<Utc>,
    /// Remote user identity, when the token endpoint reported one
    pub user_id: Option<String>,
    /// Remote organization identity, when reported
    pub org_id: Option<String>,
}

impl Credential {
    /// Check validity at a given instant, honoring the safety buffer.
    ///
    /// Valid iff the expiry exceeds `now + 60s`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_BUFFER_SECS) < self.expires_at
    }
}

// Never log token material.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("user_id", &self.user_id)
            .field("org_id", &self.org_id)
            .finish()
    }
}

/// The seam between the resilient transport and the auth flow.
///
/// The transport needs exactly two capabilities: a token for the Bearer
/// header and a single refresh attempt when the server answers 401. Keeping
/// this a trait lets the retry policy be tested without a live flow.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A currently-valid access token, refreshing once if necessary.
    async fn access_token(&self) -> Result<String>;

    /// Exchange the stored refresh token for a new credential.
    ///
    /// `Ok(false)` means the refresh definitively failed and the stored
    /// credential has been cleared.
    async fn refresh(&self) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expires_at: DateTime<Utc>) -> Credential {
        Credential {
            access_token: "secret_access".to_string(),
            refresh_token: Some("secret_refresh".to_string()),
            expires_at,
            user_id: Some("u1".to_string()),
            org_id: None,
        }
    }

    #[test]
    fn test_valid_well_before_expiry() {
        let now = Utc::now();
        assert!(credential(now + Duration::hours(1)).is_valid_at(now));
    }

    #[test]
    fn test_invalid_inside_buffer() {
        let now = Utc::now();
        // 30s out is inside the 60s buffer
        assert!(!credential(now + Duration::seconds(30)).is_valid_at(now));
    }

    #[test]
    fn test_invalid_exactly_at_buffer() {
        let now = Utc::now();
        assert!(!credential(now + Duration::seconds(EXPIRY_BUFFER_SECS)).is_valid_at(now));
    }

    #[test]
    fn test_invalid_past_expiry() {
        let now = Utc::now();
        assert!(!credential(now - Duration::hours(1)).is_valid_at(now));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug = format!("{:?}", credential(Utc::now()));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret_access"));
        assert!(!debug.contains("secret_refresh"));
    }

    #[test]
    fn test_serialization_round_trip() {
        let original = credential(Utc::now() + Duration::hours(1));
        let json = serde_json::to_string(&original).unwrap();
        let restored: Credential = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.access_token, original.access_token);
        assert_eq!(restored.refresh_token, original.refresh_token);
        assert_eq!(restored.user_id, original.user_id);
    }
}

//! OAuth 2.0 Authorization Flow with PKCE
//!
//! Implements the authorization-code flow the Filmfolio service expects
//! from native clients: no client secret, a PKCE verifier with the plain
//! transform, and an authorization code the host collects out-of-band
//! (the user pastes it from the browser).
//!
//! # Security
//!
//! - The verifier and CSRF state are generated from a cryptographically
//!   secure RNG and live only inside a [`PendingAuthorization`] that is
//!   consumed exactly once by the token exchange.
//! - Refresh never retries recursively: one bounded attempt, and any
//!   failure clears the stored credential rather than leaving a
//!   half-updated one.
//! - Tokens, codes and verifiers are never logged.

use crate::credential_store::CredentialStore;
use crate::error::{AuthError, Result};
use crate::types::{Credential, TokenSource};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bytes::Bytes;
use chrono::Duration;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Verifier length mandated for this service (RFC 7636 allows 43-128).
const VERIFIER_LEN: usize = 64;

/// CSRF state length.
const STATE_LEN: usize = 32;

/// RFC 7636 unreserved characters.
const UNRESERVED: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

fn random_unreserved(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..UNRESERVED.len());
            UNRESERVED[idx] as char
        })
        .collect()
}

/// OAuth endpoint and client configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth client ID (public; native clients hold no secret)
    pub client_id: String,
    /// Redirect URI registered for the client
    pub redirect_uri: String,
    /// Scopes requested, joined space-delimited in the authorize URL
    pub scopes: Vec<String>,
    /// Authorization endpoint (opened in the user's browser)
    pub authorize_url: String,
    /// Token endpoint (code and refresh exchanges)
    pub token_url: String,
    /// Revocation endpoint (best-effort logout)
    pub revoke_url: String,
}

impl AuthConfig {
    /// Configuration for a Filmfolio service rooted at `base_url`.
    pub fn for_service(
        base_url: &str,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: vec![
                "photographs:read".to_string(),
                "photographs:write".to_string(),
                "rolls:read".to_string(),
                "rolls:write".to_string(),
            ],
            authorize_url: format!("{}/oauth/authorize", base),
            token_url: format!("{}/oauth/token", base),
            revoke_url: format!("{}/oauth/revoke", base),
        }
    }
}

/// PKCE material for one authorization attempt.
///
/// The service uses the plain transform: the challenge sent in the
/// authorize URL equals the verifier sent in the token exchange.
#[derive(Clone)]
pub struct PkceVerifier {
    verifier: String,
    state: String,
}

impl PkceVerifier {
    pub fn new() -> Self {
        Self {
            verifier: random_unreserved(VERIFIER_LEN),
            state: random_unreserved(STATE_LEN),
        }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Plain transform: the challenge is the verifier itself.
    pub fn challenge(&self) -> &str {
        &self.verifier
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Context object bridging `begin_authorization` and
/// `complete_authorization`.
///
/// Owning this in the caller (rather than stashing it in module state)
/// keeps the verifier single-use: the exchange consumes the pending
/// authorization by value and drops it.
pub struct PendingAuthorization {
    verifier: PkceVerifier,
}

impl PendingAuthorization {
    pub fn state(&self) -> &str {
        self.verifier.state()
    }
}

/// Token endpoint response shape.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[allow(dead_code)]
    token_type: Option<String>,
    user_id: Option<String>,
    org_id: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

/// The interactive authorization flow plus token lifecycle.
///
/// Holds the only reference that mutates credential state (through the
/// [`CredentialStore`]). All network traffic goes through the host's
/// [`HttpClient`]; the resilient retry policy lives above this type and
/// reaches back in only through [`TokenSource`].
pub struct AuthFlow {
    config: AuthConfig,
    http: Arc<dyn HttpClient>,
    store: CredentialStore,
    events: EventBus,
}

impl AuthFlow {
    pub fn new(
        config: AuthConfig,
        http: Arc<dyn HttpClient>,
        store: CredentialStore,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            http,
            store,
            events,
        }
    }

    pub fn credential_store(&self) -> &CredentialStore {
        &self.store
    }

    /// Build the authorization URL and the pending context.
    ///
    /// The caller directs the user's browser at the URL, collects the
    /// authorization code out-of-band, then calls
    /// [`complete_authorization`](Self::complete_authorization).
    #[instrument(skip(self))]
    pub fn begin_authorization(&self) -> Result<(String, PendingAuthorization)> {
        let verifier = PkceVerifier::new();

        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| AuthError::InvalidAuthUrl(e.to_string()))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.config.client_id);
            query.append_pair("redirect_uri", &self.config.redirect_uri);
            query.append_pair("response_type", "code");
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", verifier.state());
            query.append_pair("code_challenge", verifier.challenge());
            query.append_pair("code_challenge_method", "plain");
        }

        let _ = self.events.emit(CoreEvent::Auth(AuthEvent::SigningIn));
        debug!("Built authorization URL");

        Ok((url.to_string(), PendingAuthorization { verifier }))
    }

    /// Exchange an authorization code for a credential and persist it.
    ///
    /// Consumes the pending authorization; the PKCE verifier is used for
    /// exactly this one exchange and then discarded.
    #[instrument(skip_all)]
    pub async fn complete_authorization(
        &self,
        pending: PendingAuthorization,
        code: &str,
    ) -> Result<Credential> {
        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("redirect_uri", &self.config.redirect_uri);
        params.insert("client_id", &self.config.client_id);
        params.insert("code_verifier", pending.verifier.verifier());

        debug!("Exchanging authorization code for tokens");
        let response = self.post_form(&self.config.token_url, &params).await?;

        if !response.is_success() {
            let status = response.status;
            let message = response
                .text()
                .unwrap_or_else(|_| "unreadable error response".to_string());
            warn!(status, "Token exchange failed");
            let _ = self.events.emit(CoreEvent::Auth(AuthEvent::AuthError {
                message: format!("token exchange failed with HTTP {}", status),
            }));
            return Err(AuthError::TokenExchangeFailed { status, message });
        }

        let token_response: TokenResponse = response.json().map_err(|e| {
            let _ = self.events.emit(CoreEvent::Auth(AuthEvent::AuthError {
                message: "unparseable token response".to_string(),
            }));
            AuthError::InvalidTokenResponse(e.to_string())
        })?;

        let credential = self.credential_from(token_response, None);
        self.store.store(&credential).await?;

        let _ = self.events.emit(CoreEvent::Auth(AuthEvent::SignedIn {
            user_id: credential.user_id.clone(),
        }));
        info!(expires_at = %credential.expires_at, "Authorization completed");

        Ok(credential)
    }

    /// A currently-valid access token.
    ///
    /// Returns the cached token when its expiry clears the safety buffer;
    /// otherwise attempts exactly one refresh. A failed refresh clears the
    /// stored credential and fails `NotAuthenticated`.
    pub async fn access_token(&self) -> Result<String> {
        let now = self.store.now();
        if let Some(credential) = self.store.load().await? {
            if credential.is_valid_at(now) {
                return Ok(credential.access_token);
            }
        }

        if !self.refresh().await? {
            return Err(AuthError::NotAuthenticated);
        }

        self.store
            .load()
            .await?
            .map(|c| c.access_token)
            .ok_or(AuthError::NotAuthenticated)
    }

    /// Exchange the stored refresh token for a new credential.
    ///
    /// Any non-success outcome (missing refresh token, transport failure,
    /// error status, unparseable body) clears the credential and returns
    /// `Ok(false)`; the store never holds a half-updated credential.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<bool> {
        let Some(current) = self.store.load().await? else {
            return Ok(false);
        };
        let Some(refresh_token) = current.refresh_token.clone() else {
            warn!("No refresh token available, clearing credential");
            self.store.clear().await?;
            return Ok(false);
        };

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token.as_str());
        params.insert("client_id", &self.config.client_id);

        debug!("Refreshing access token");
        let response = match self.post_form(&self.config.token_url, &params).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh transport failure, clearing credential");
                self.store.clear().await?;
                let _ = self.events.emit(CoreEvent::Auth(AuthEvent::SignedOut));
                return Ok(false);
            }
        };

        if !response.is_success() {
            warn!(status = response.status, "Token refresh rejected, clearing credential");
            self.store.clear().await?;
            let _ = self.events.emit(CoreEvent::Auth(AuthEvent::SignedOut));
            return Ok(false);
        }

        let token_response: TokenResponse = match response.json() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Unparseable token refresh response, clearing credential");
                self.store.clear().await?;
                let _ = self.events.emit(CoreEvent::Auth(AuthEvent::SignedOut));
                return Ok(false);
            }
        };

        let credential = self.credential_from(token_response, Some(&current));
        self.store.store(&credential).await?;

        let _ = self.events.emit(CoreEvent::Auth(AuthEvent::TokenRefreshed {
            expires_at: credential.expires_at.timestamp(),
        }));
        info!(expires_at = %credential.expires_at, "Access token refreshed");

        Ok(true)
    }

    /// Best-effort server-side revocation, then unconditional local clear.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        if let Some(credential) = self.store.load().await? {
            let mut params = HashMap::new();
            params.insert("token", credential.access_token.as_str());
            params.insert("client_id", &self.config.client_id);

            match self.post_form(&self.config.revoke_url, &params).await {
                Ok(response) if response.is_success() => {
                    debug!("Access token revoked")
                }
                Ok(response) => {
                    warn!(status = response.status, "Token revocation rejected, ignoring")
                }
                Err(e) => warn!(error = %e, "Token revocation failed, ignoring"),
            }
        }

        self.store.clear().await?;
        let _ = self.events.emit(CoreEvent::Auth(AuthEvent::SignedOut));
        info!("Logged out");
        Ok(())
    }

    fn credential_from(&self, response: TokenResponse, previous: Option<&Credential>) -> Credential {
        Credential {
            access_token: response.access_token,
            // Providers may omit the refresh token on refresh; keep the old one.
            refresh_token: response
                .refresh_token
                .or_else(|| previous.and_then(|c| c.refresh_token.clone())),
            expires_at: self.store.now() + Duration::seconds(response.expires_in),
            user_id: response
                .user_id
                .or_else(|| previous.and_then(|c| c.user_id.clone())),
            org_id: response
                .org_id
                .or_else(|| previous.and_then(|c| c.org_id.clone())),
        }
    }

    async fn post_form(
        &self,
        url: &str,
        params: &HashMap<&str, &str>,
    ) -> Result<bridge_traits::http::HttpResponse> {
        let body = serde_urlencoded::to_string(params)
            .map_err(|e| AuthError::SerializationFailed(e.to_string()))?;

        let request = HttpRequest::new(HttpMethod::Post, url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(body));

        self.http
            .execute(request)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))
    }
}

#[async_trait]
impl TokenSource for AuthFlow {
    async fn access_token(&self) -> Result<String> {
        AuthFlow::access_token(self).await
    }

    async fn refresh(&self) -> Result<bool> {
        AuthFlow::refresh(self).await
    }
}

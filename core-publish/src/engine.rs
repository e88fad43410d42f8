//! Engine assembly and host-facing facade
//!
//! [`PublishEngine`] wires the credential store, auth flow, connector and
//! orchestrator together from one validated [`EngineConfig`] plus the
//! host-provided capability implementations.

use crate::error::{PublishError, Result};
use crate::orchestrator::PublishOrchestrator;
use crate::outcome::PublishSummary;
use bridge_traits::host::{
    AssetCatalog, BrowserLauncher, InteractivePrompt, RenditionQueue,
};
use bridge_traits::http::HttpClient;
use bridge_traits::storage::{CollectionStore, FileAccess, SecureStore};
use bridge_traits::time::Clock;
use core_auth::{AuthConfig, AuthFlow, CredentialStore, TokenSource};
use core_runtime::events::{CoreEvent, EventBus};
use provider_filmfolio::{FilmfolioConnector, Roll};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Static engine configuration, validated at build time.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Service root, e.g. `https://api.filmfolio.example`
    pub api_base_url: String,
    /// OAuth client id registered for this integration
    pub client_id: String,
    /// OAuth redirect URI registered for this integration
    pub redirect_uri: String,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Fail-fast builder: `build` rejects incomplete configuration instead of
/// letting a half-configured engine reach the network.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    api_base_url: Option<String>,
    client_id: Option<String>,
    redirect_uri: Option<String>,
}

impl EngineConfigBuilder {
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    pub fn build(self) -> Result<EngineConfig> {
        let api_base_url = require(self.api_base_url, "api_base_url")?;
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(PublishError::Validation(
                "api_base_url must be an http(s) URL".into(),
            ));
        }
        Ok(EngineConfig {
            api_base_url,
            client_id: require(self.client_id, "client_id")?,
            redirect_uri: require(self.redirect_uri, "redirect_uri")?,
        })
    }
}

fn require(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PublishError::Validation(format!("{field} is required")))
}

/// The assembled publish engine.
pub struct PublishEngine {
    auth: Arc<AuthFlow>,
    connector: Arc<FilmfolioConnector>,
    orchestrator: PublishOrchestrator,
    events: EventBus,
}

impl PublishEngine {
    pub fn new(
        config: EngineConfig,
        http: Arc<dyn HttpClient>,
        secure_store: Arc<dyn SecureStore>,
        clock: Arc<dyn Clock>,
        collections: Arc<dyn CollectionStore>,
        catalog: Arc<dyn AssetCatalog>,
        files: Arc<dyn FileAccess>,
    ) -> Self {
        let events = EventBus::default();
        let credential_store = CredentialStore::new(secure_store, clock);
        let auth = Arc::new(AuthFlow::new(
            AuthConfig::for_service(&config.api_base_url, &config.client_id, &config.redirect_uri),
            http.clone(),
            credential_store,
            events.clone(),
        ));
        let connector = Arc::new(FilmfolioConnector::new(
            http,
            auth.clone() as Arc<dyn TokenSource>,
            &config.api_base_url,
        ));
        let orchestrator = PublishOrchestrator::new(
            connector.clone(),
            auth.clone(),
            collections,
            catalog,
            files,
            events.clone(),
        );

        info!(api_base_url = %config.api_base_url, "Publish engine assembled");
        Self {
            auth,
            connector,
            orchestrator,
            events,
        }
    }

    /// Drive the interactive authorization: open the browser, collect the
    /// code through the host prompt, exchange and persist.
    #[instrument(skip_all)]
    pub async fn authorize_interactively(
        &self,
        prompt: &dyn InteractivePrompt,
        browser: &dyn BrowserLauncher,
    ) -> Result<()> {
        let (url, pending) = self
            .auth
            .begin_authorization()
            .map_err(|e| PublishError::Auth(e.to_string()))?;
        browser.open(&url)?;

        let code = prompt
            .request_input("Enter the authorization code shown in your browser")
            .await?
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(PublishError::Cancelled)?;

        self.auth
            .complete_authorization(pending, &code)
            .await
            .map_err(|e| PublishError::Auth(e.to_string()))?;
        Ok(())
    }

    pub async fn is_authenticated(&self) -> Result<bool> {
        self.auth
            .credential_store()
            .is_valid()
            .await
            .map_err(|e| PublishError::Auth(e.to_string()))
    }

    pub async fn logout(&self) -> Result<()> {
        self.auth
            .logout()
            .await
            .map_err(|e| PublishError::Auth(e.to_string()))
    }

    /// Rolls available on the service, for the host's roll picker.
    pub async fn list_rolls(&self) -> Result<Vec<Roll>> {
        Ok(self.connector.list_rolls().await?)
    }

    /// Run one publish pass over a collection.
    pub async fn publish_collection(
        &self,
        collection_id: &str,
        renditions: &mut dyn RenditionQueue,
        cancel: &CancellationToken,
    ) -> Result<PublishSummary> {
        self.orchestrator
            .publish(collection_id, renditions, cancel)
            .await
    }

    /// Subscribe to auth and publish progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

//! Publish run orchestration
//!
//! One run walks `Init -> AuthChecked -> RollResolved -> {PerItem}* ->
//! Summarized`. Auth validation and roll resolution failures abort the run
//! before any item is processed; once the item loop starts, every item is
//! independently terminal and only cancellation (checked at loop
//! boundaries) stops the run early.

use crate::error::{PublishError, Result};
use crate::outcome::{PublishOutcome, PublishSummary};
use crate::settings::CollectionSettings;
use bridge_traits::host::{AssetCatalog, AssetMetadata, AssetRef, PickState, RenditionOutcome, RenditionQueue};
use bridge_traits::storage::{CollectionStore, FileAccess, SlotKind};
use core_auth::AuthFlow;
use core_runtime::events::{CoreEvent, EventBus, PublishEvent};
use provider_filmfolio::{FilmfolioConnector, GpsPoint, PhotographMetadata};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub struct PublishOrchestrator {
    connector: Arc<FilmfolioConnector>,
    auth: Arc<AuthFlow>,
    collections: Arc<dyn CollectionStore>,
    catalog: Arc<dyn AssetCatalog>,
    files: Arc<dyn FileAccess>,
    events: EventBus,
}

impl PublishOrchestrator {
    pub fn new(
        connector: Arc<FilmfolioConnector>,
        auth: Arc<AuthFlow>,
        collections: Arc<dyn CollectionStore>,
        catalog: Arc<dyn AssetCatalog>,
        files: Arc<dyn FileAccess>,
        events: EventBus,
    ) -> Self {
        Self {
            connector,
            auth,
            collections,
            catalog,
            files,
            events,
        }
    }

    /// Run one publish pass over the collection's rendition queue.
    ///
    /// Already-published items are never rolled back, not even on
    /// cancellation.
    #[instrument(skip(self, renditions, cancel))]
    pub async fn publish(
        &self,
        collection_id: &str,
        renditions: &mut dyn RenditionQueue,
        cancel: &CancellationToken,
    ) -> Result<PublishSummary> {
        let _ = self.events.emit(CoreEvent::Publish(PublishEvent::RunStarted {
            collection_id: collection_id.to_string(),
        }));

        let settings = self.load_settings(collection_id).await?;

        // Auth failure here aborts the run before any item is touched.
        self.auth
            .access_token()
            .await
            .map_err(|_| PublishError::NotAuthenticated)?;

        let (roll_id, created) = self.resolve_roll(collection_id, &settings).await?;
        let _ = self.events.emit(CoreEvent::Publish(PublishEvent::RollResolved {
            roll_id: roll_id.clone(),
            created,
        }));
        info!(roll_id = %roll_id, created, "Roll resolved");

        let mut summary = PublishSummary::default();
        let mut position: u32 = 0;

        loop {
            // Coarse-grained: in-flight work is never interrupted.
            if cancel.is_cancelled() {
                summary.cancelled = true;
                let _ = self.events.emit(CoreEvent::Publish(PublishEvent::RunCancelled {
                    published: summary.published,
                    failed: summary.failed,
                }));
                info!(published = summary.published, failed = summary.failed, "Run cancelled");
                return Ok(summary);
            }

            let Some(rendition) = renditions.next_rendition().await? else {
                break;
            };

            let outcome = match rendition {
                RenditionOutcome::Failed { asset, reason } => {
                    warn!(asset = %asset, reason = %reason, "Render failed");
                    PublishOutcome::failed(asset, format!("render failed: {reason}"))
                }
                RenditionOutcome::Rendered { asset, file_path } => {
                    position += 1;
                    let result = self
                        .publish_rendered(&asset, &file_path, &roll_id, position)
                        .await;

                    // Cleanup is unconditional.
                    if let Err(e) = self.files.delete_file(&file_path).await {
                        warn!(path = %file_path.display(), error = %e, "Failed to delete rendered file");
                    }

                    match result {
                        Ok(photograph_id) => PublishOutcome::published(asset, photograph_id),
                        Err(e) => {
                            warn!(asset = %asset, error = %e, "Item publish failed");
                            PublishOutcome::failed(asset, e.to_string())
                        }
                    }
                }
            };

            let event = match &outcome.photograph_id {
                Some(id) => PublishEvent::ItemPublished {
                    asset: outcome.asset.to_string(),
                    photograph_id: id.clone(),
                },
                None => PublishEvent::ItemFailed {
                    asset: outcome.asset.to_string(),
                    reason: outcome.error.clone().unwrap_or_default(),
                },
            };
            let _ = self.events.emit(CoreEvent::Publish(event));
            summary.record(outcome);
        }

        if summary.failed > 0 {
            warn!(published = summary.published, failed = summary.failed, "Run completed with failures");
        } else {
            info!(published = summary.published, "Run completed");
        }
        let _ = self.events.emit(CoreEvent::Publish(PublishEvent::RunCompleted {
            published: summary.published,
            failed: summary.failed,
        }));

        Ok(summary)
    }

    async fn load_settings(&self, collection_id: &str) -> Result<CollectionSettings> {
        let slot = self
            .collections
            .read_slot(collection_id, SlotKind::Settings)
            .await
            .map_err(|e| PublishError::Storage(e.to_string()))?;
        Ok(CollectionSettings::decode(slot.as_deref()))
    }

    /// Resolve the target roll, first match wins:
    /// explicit id, then surrogate from an earlier run, then create-new.
    async fn resolve_roll(
        &self,
        collection_id: &str,
        settings: &CollectionSettings,
    ) -> Result<(String, bool)> {
        if let Some(id) = &settings.roll_id {
            debug!(roll_id = %id, "Using explicit roll id");
            return Ok((id.clone(), false));
        }

        let surrogate = self
            .collections
            .read_slot(collection_id, SlotKind::RemoteIdentity)
            .await
            .map_err(|e| PublishError::Storage(e.to_string()))?
            .filter(|id| !id.trim().is_empty());
        if let Some(id) = surrogate {
            debug!(roll_id = %id, "Using surrogate roll id from earlier run");
            return Ok((id, false));
        }

        if !settings.create_new {
            return Err(PublishError::NoCollectionSelected);
        }

        let name = settings
            .roll_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| PublishError::Validation("a roll name is required".into()))?;
        let date = settings
            .roll_date
            .as_ref()
            .and_then(|d| d.to_iso())
            .ok_or_else(|| PublishError::Validation("a complete roll date is required".into()))?;

        let roll = self.connector.create_roll(name, Some(&date)).await?;

        self.collections
            .write_slot(collection_id, SlotKind::RemoteIdentity, &roll.id)
            .await
            .map_err(|e| PublishError::Storage(e.to_string()))?;

        Ok((roll.id, true))
    }

    /// The per-item pipeline for a successfully rendered file.
    async fn publish_rendered(
        &self,
        asset: &AssetRef,
        file_path: &Path,
        roll_id: &str,
        position: u32,
    ) -> Result<String> {
        // Branch decision first: an id from an earlier run means update.
        let existing_id = self.catalog.remote_record_id(asset).await?;

        let filename = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| asset.to_string());

        let target = self
            .connector
            .request_upload_target(roll_id, &filename, content_type_for(&filename))
            .await?;

        let content = self.files.read_file(file_path).await?;
        self.connector
            .upload_bytes(&target.upload_url, &target.upload_headers, content)
            .await?;

        let metadata = build_metadata(self.catalog.metadata(asset).await?);

        match existing_id {
            Some(id) => {
                // Update touches descriptive fields only; the record keeps
                // its original storage key and roll membership.
                self.connector.update_photograph(&id, &metadata).await?;
                debug!(asset = %asset, photograph_id = %id, "Photograph updated");
                Ok(id)
            }
            None => {
                let id = self
                    .connector
                    .create_photograph(
                        &target.photograph_id,
                        roll_id,
                        &target.storage_key,
                        &filename,
                        position,
                    )
                    .await?;
                self.connector.update_photograph(&id, &metadata).await?;
                self.catalog.set_remote_record_id(asset, &id).await?;
                debug!(asset = %asset, photograph_id = %id, "Photograph created");
                Ok(id)
            }
        }
    }
}

/// Map host metadata onto the remote descriptive fields.
fn build_metadata(metadata: AssetMetadata) -> PhotographMetadata {
    let location = match (metadata.latitude, metadata.longitude) {
        (Some(latitude), Some(longitude)) => Some(GpsPoint {
            latitude,
            longitude,
        }),
        _ => None,
    };

    PhotographMetadata {
        rating: metadata.rating,
        selected: metadata.pick == PickState::Flagged,
        keywords: metadata.keywords,
        description: metadata.caption,
        captured_at: metadata.captured_at,
        location,
    }
}

fn content_type_for(filename: &str) -> &'static str {
    match Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("dng") => "image/x-adobe-dng",
        _ => "application/octet-stream",
    }
}

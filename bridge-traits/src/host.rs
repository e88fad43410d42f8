//! Publish Collaborator Traits
//!
//! The host application owns rendering, asset metadata, published-id
//! tracking and all interactive UI. These traits are the exact surface the
//! publish engine consumes; nothing behind them is reimplemented here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::Result;

/// Opaque reference to one asset in the host catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion signal for one queued item from the host's render pipeline.
#[derive(Debug, Clone)]
pub enum RenditionOutcome {
    /// Render finished; the file is ready for upload
    Rendered { asset: AssetRef, file_path: PathBuf },
    /// Render failed; the item carries no file
    Failed { asset: AssetRef, reason: String },
}

impl RenditionOutcome {
    pub fn asset(&self) -> &AssetRef {
        match self {
            RenditionOutcome::Rendered { asset, .. } => asset,
            RenditionOutcome::Failed { asset, .. } => asset,
        }
    }
}

/// Host render pipeline: yields queued items in source order.
///
/// `next_rendition` suspends until the next item's render completes (or
/// fails) and returns `None` once the queue is exhausted.
#[async_trait]
pub trait RenditionQueue: Send {
    async fn next_rendition(&mut self) -> Result<Option<RenditionOutcome>>;
}

/// Pick / flag state of an asset in the host catalog.
///
/// Only the explicit `Flagged` state maps to "selected" on the remote
/// record; `None` and `Rejected` both map to unselected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PickState {
    #[default]
    None,
    Flagged,
    Rejected,
}

/// Descriptive metadata the host exposes per asset.
#[derive(Debug, Clone, Default)]
pub struct AssetMetadata {
    /// Star rating, 0-5
    pub rating: Option<u8>,
    pub pick: PickState,
    pub keywords: Vec<String>,
    pub caption: Option<String>,
    /// Original capture timestamp
    pub captured_at: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Host metadata accessor and published-id tracking.
///
/// The remote record id attached here is what decides the create-vs-update
/// branch on later runs; the engine treats it as immutable once set.
#[async_trait]
pub trait AssetCatalog: Send + Sync {
    /// Read the asset's descriptive metadata
    async fn metadata(&self, asset: &AssetRef) -> Result<AssetMetadata>;

    /// The remote record id from an earlier publish, if any
    async fn remote_record_id(&self, asset: &AssetRef) -> Result<Option<String>>;

    /// Attach a remote record id after a successful publish
    async fn set_remote_record_id(&self, asset: &AssetRef, id: &str) -> Result<()>;
}

/// Blocking interactive prompt.
///
/// Returns the user's input, or `None` when the user cancelled.
#[async_trait]
pub trait InteractivePrompt: Send + Sync {
    async fn request_input(&self, message: &str) -> Result<Option<String>>;
}

/// Directs the user to an external browser.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_ref_display() {
        let asset = AssetRef::new("asset-42");
        assert_eq!(asset.to_string(), "asset-42");
        assert_eq!(asset.as_str(), "asset-42");
    }

    #[test]
    fn test_rendition_outcome_asset_accessor() {
        let ok = RenditionOutcome::Rendered {
            asset: AssetRef::new("a1"),
            file_path: PathBuf::from("/tmp/a1.jpg"),
        };
        let failed = RenditionOutcome::Failed {
            asset: AssetRef::new("a2"),
            reason: "disk full".to_string(),
        };
        assert_eq!(ok.asset().as_str(), "a1");
        assert_eq!(failed.asset().as_str(), "a2");
    }

    #[test]
    fn test_pick_state_default() {
        assert_eq!(PickState::default(), PickState::None);
    }
}

//! # Host Bridge Traits
//!
//! The contract between the publish engine and the host application. Each
//! trait is a capability the engine requires but that the host implements:
//! HTTP transport, secure credential storage, the opaque per-collection
//! string slots, the render pipeline, metadata accessors and interactive
//! prompts.
//!
//! ## Traits
//!
//! ### Networking & storage
//! - [`HttpClient`](http::HttpClient) - single-exchange async HTTP transport
//! - [`SecureStore`](storage::SecureStore) - credential persistence
//! - [`CollectionStore`](storage::CollectionStore) - the two opaque string
//!   slots the host provides per collection
//! - [`FileAccess`](storage::FileAccess) - read/delete of rendered files
//!
//! ### Publish collaborators
//! - [`RenditionQueue`](host::RenditionQueue) - render completion signals
//! - [`AssetCatalog`](host::AssetCatalog) - metadata + published-id tracking
//! - [`InteractivePrompt`](host::InteractivePrompt) - blocking user input
//! - [`BrowserLauncher`](host::BrowserLauncher) - external browser handoff
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - time source for deterministic testing

pub mod error;
pub mod host;
pub mod http;
pub mod storage;
pub mod time;

pub use error::{BridgeError, Result};
pub use host::{
    AssetCatalog, AssetMetadata, AssetRef, BrowserLauncher, InteractivePrompt, PickState,
    RenditionOutcome, RenditionQueue,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::{CollectionStore, FileAccess, SecureStore, SlotKind};
pub use time::{Clock, SystemClock};

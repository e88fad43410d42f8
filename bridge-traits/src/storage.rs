//! Storage Abstractions
//!
//! Platform-agnostic traits for secure credential storage, the opaque
//! per-collection string slots the host exposes, and minimal file access
//! for rendered output.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::path::Path;

use crate::error::Result;

/// Secure credential storage trait
///
/// Abstracts secure storage mechanisms:
/// - macOS: Keychain
/// - Windows: Credential Manager (DPAPI)
/// - Linux: Secret Service / libsecret
///
/// Implementations MUST encrypt data at rest and never log secret values.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value under the given key, overwriting any previous value
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value, `None` when the key does not exist
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret; idempotent, succeeds when the key does not exist
    async fn delete_secret(&self, key: &str) -> Result<()>;
}

/// The two opaque string slots the host provides per collection.
///
/// The host offers exactly one free-form string per (collection, slot) pair;
/// everything the engine persists about a collection must round-trip through
/// these. The slots are distinct on purpose: `Settings` carries the encoded
/// settings record, `RemoteIdentity` carries the surrogate roll id attached
/// after a create-new run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Encoded per-collection settings record
    Settings,
    /// Surrogate remote roll id from an earlier run
    RemoteIdentity,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Settings => write!(f, "settings"),
            SlotKind::RemoteIdentity => write!(f, "remote_identity"),
        }
    }
}

/// Host-provided per-collection key-value surface.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Read a slot's current value, `None` when never written
    async fn read_slot(&self, collection_id: &str, slot: SlotKind) -> Result<Option<String>>;

    /// Overwrite a slot's value
    async fn write_slot(&self, collection_id: &str, slot: SlotKind, value: &str) -> Result<()>;
}

/// Minimal file access for rendered output.
///
/// The engine only ever reads a rendition for upload and deletes it during
/// cleanup; everything else about the filesystem belongs to the host.
#[async_trait]
pub trait FileAccess: Send + Sync {
    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Delete a file; `NotFound` when it does not exist
    async fn delete_file(&self, path: &Path) -> Result<()>;
}

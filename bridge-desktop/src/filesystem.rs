//! File access over tokio::fs.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::FileAccess,
};
use bytes::Bytes;
use std::path::Path;
use tracing::debug;

/// Direct filesystem access for rendered files.
#[derive(Debug, Clone, Default)]
pub struct TokioFileAccess;

impl TokioFileAccess {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileAccess for TokioFileAccess {
    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = tokio::fs::read(path).await?;
        debug!(path = %path.display(), bytes = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted file");
                Ok(())
            }
            // Deleting an already-absent file is a no-op.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }
}

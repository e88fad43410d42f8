//! Per-item and per-run results.

use bridge_traits::host::AssetRef;

/// Terminal status of one rendered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    Published,
    Failed,
}

/// What happened to one item during a run.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub asset: AssetRef,
    pub photograph_id: Option<String>,
    pub status: PublishStatus,
    pub error: Option<String>,
}

impl PublishOutcome {
    pub fn published(asset: AssetRef, photograph_id: String) -> Self {
        Self {
            asset,
            photograph_id: Some(photograph_id),
            status: PublishStatus::Published,
            error: None,
        }
    }

    pub fn failed(asset: AssetRef, reason: impl Into<String>) -> Self {
        Self {
            asset,
            photograph_id: None,
            status: PublishStatus::Failed,
            error: Some(reason.into()),
        }
    }
}

/// Aggregate result of a run.
///
/// A non-zero failure count is a user-visible warning, never a run-level
/// error.
#[derive(Debug, Clone, Default)]
pub struct PublishSummary {
    pub published: u32,
    pub failed: u32,
    /// True when the run stopped at a loop boundary on cancellation;
    /// already-published items are not rolled back.
    pub cancelled: bool,
    pub outcomes: Vec<PublishOutcome>,
}

impl PublishSummary {
    pub fn record(&mut self, outcome: PublishOutcome) {
        match outcome.status {
            PublishStatus::Published => self.published += 1,
            PublishStatus::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

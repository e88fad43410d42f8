//! # Publish Core
//!
//! The publish state machine for Filmfolio: per-collection settings kept
//! in the host's single opaque slot, roll resolution, the per-item
//! upload-and-record pipeline, and the [`PublishEngine`] facade hosts
//! embed.

pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod settings;

pub use engine::{EngineConfig, EngineConfigBuilder, PublishEngine};
pub use error::{PublishError, Result};
pub use orchestrator::PublishOrchestrator;
pub use outcome::{PublishOutcome, PublishStatus, PublishSummary};
pub use settings::{CollectionSettings, RollDate};

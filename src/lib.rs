//! # Filmfolio Publish Workspace
//!
//! Umbrella crate re-exporting the publish engine's crates so host
//! applications can depend on one package and enable the documented
//! features instead of wiring each crate individually.
//!
//! - [`bridge_traits`]: capability seams the host implements
//! - [`core_runtime`]: logging setup and the progress event bus
//! - [`core_auth`]: OAuth flow and credential lifecycle
//! - [`provider_filmfolio`]: resilient transport and typed API connector
//! - [`core_publish`]: settings codec, orchestrator and engine facade
//! - [`bridge_desktop`] (feature `desktop`): reqwest / keyring / tokio-fs
//!   implementations of the capability seams

pub use bridge_traits;
pub use core_auth;
pub use core_publish;
pub use core_runtime;
pub use provider_filmfolio;

#[cfg(feature = "desktop")]
pub use bridge_desktop;

pub use core_publish::{EngineConfig, PublishEngine, PublishSummary};

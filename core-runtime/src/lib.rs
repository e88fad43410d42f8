//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the publish engine:
//! - Logging and tracing setup
//! - Typed event broadcasting
//!
//! Every other `core-*` crate depends on this one for its ambient concerns.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{AuthEvent, CoreEvent, EventBus, PublishEvent};

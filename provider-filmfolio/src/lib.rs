//! # Filmfolio Provider
//!
//! The remote half of the publish engine: wire types for the service's
//! JSON:API envelope, the resilient transport that owns retry, rate-limit
//! and refresh-on-401 behavior, and the typed connector the orchestrator
//! drives.

pub mod connector;
pub mod error;
pub mod transport;
pub mod types;

pub use connector::FilmfolioConnector;
pub use error::{FilmfolioError, Result};
pub use transport::{ApiRequest, ApiTransport, DEFAULT_RETRY_AFTER_SECS, MAX_RETRIES};
pub use types::{GpsPoint, PhotographMetadata, Roll, UploadTarget};

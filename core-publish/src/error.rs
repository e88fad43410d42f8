use thiserror::Error;

/// Run-level failures.
///
/// Per-item failures never surface here; they are recorded as outcomes in
/// the run summary.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No roll selected and creating a new one is disabled")]
    NoCollectionSelected,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Collection storage error: {0}")]
    Storage(String),

    #[error("Host bridge error: {0}")]
    Bridge(String),

    #[error(transparent)]
    Api(#[from] provider_filmfolio::FilmfolioError),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Cancelled")]
    Cancelled,
}

impl From<bridge_traits::error::BridgeError> for PublishError {
    fn from(e: bridge_traits::error::BridgeError) -> Self {
        PublishError::Bridge(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Token exchange failed ({status}): {message}")]
    TokenExchangeFailed { status: u16, message: String },

    #[error("Invalid authorization URL: {0}")]
    InvalidAuthUrl(String),

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Credential serialization failed: {0}")]
    SerializationFailed(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilmfolioError {
    /// No response after exhausting the retry budget.
    #[error("Network error after {attempts} attempts: {message}")]
    Network { attempts: u32, message: String },

    /// The credential could not be refreshed; the caller must re-authenticate.
    #[error("Authentication expired")]
    AuthExpired,

    /// Definitive API rejection (4xx other than 401/429, or 5xx after retries).
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Object storage answered something other than 200/204.
    #[error("Upload failed with status {status}")]
    UploadFailed { status: u16 },

    /// A success response whose body does not match the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<core_auth::AuthError> for FilmfolioError {
    fn from(_: core_auth::AuthError) -> Self {
        FilmfolioError::AuthExpired
    }
}

pub type Result<T> = std::result::Result<T, FilmfolioError>;

//! # Desktop Bridge
//!
//! Desktop implementations of the capability traits the publish engine
//! consumes: reqwest HTTP, OS keychain secret storage, tokio filesystem
//! access, a JSON-file collection store, and terminal prompt / browser
//! launch for the interactive authorization.

pub mod collection_store;
pub mod filesystem;
pub mod http;
pub mod prompt;
#[cfg(feature = "secure-store")]
pub mod secure_store;

pub use collection_store::JsonCollectionStore;
pub use filesystem::TokioFileAccess;
pub use http::ReqwestHttpClient;
pub use prompt::{StdinPrompt, SystemBrowser};
#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;

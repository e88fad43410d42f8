//! # Authentication Core
//!
//! Credential lifecycle for the Filmfolio publish engine: secure
//! persistence ([`CredentialStore`]), the interactive authorization-code +
//! PKCE flow ([`AuthFlow`]) and the [`TokenSource`] seam the resilient
//! transport consumes.
//!
//! ## Invariants
//!
//! - Exactly one credential is valid per process; [`CredentialStore`] is
//!   its sole writer.
//! - A refresh is attempted at most once per token request, and a failed
//!   refresh always leaves the store empty, never half-updated.
//! - PKCE material is owned by a [`PendingAuthorization`] consumed exactly
//!   once; nothing is stashed in module-level state.

pub mod credential_store;
pub mod error;
pub mod oauth;
pub mod types;

pub use credential_store::CredentialStore;
pub use error::{AuthError, Result};
pub use oauth::{AuthConfig, AuthFlow, PendingAuthorization, PkceVerifier};
pub use types::{Credential, TokenSource, EXPIRY_BUFFER_SECS};

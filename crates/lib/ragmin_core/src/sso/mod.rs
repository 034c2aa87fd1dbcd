//! External identity exchange with the institutional CAS provider.
//!
//! The provider speaks an OAuth-like dialect: browser redirect to the
//! authorize URL, authorization code back to our callback, code → access
//! token, access token → profile.

pub mod cas;
pub mod profile;

use thiserror::Error;

use crate::FailureKind;
use crate::provision::ProvisionError;
use crate::store::StoreError;

pub use cas::{CasClient, CasConfig};
pub use profile::{CasProfile, SsoIdentity};

/// Callback path the provider redirects back to.
pub const CALLBACK_PATH: &str = "/v1/user/cas_callback";

/// Timeout applied to every provider call.
pub const PROVIDER_TIMEOUT_SECS: u64 = 10;

/// SSO errors. The display text is what the browser sees.
#[derive(Debug, Error)]
pub enum SsoError {
    #[error("Missing authorization code")]
    MissingCode,

    /// The provider answered the token request with an error payload.
    #[error("{0}")]
    TokenRejected(String),

    #[error("Failed to get access token")]
    MissingAccessToken,

    #[error("Token exchange error")]
    TokenExchange { detail: String },

    #[error("User info fetch error")]
    ProfileFetch { detail: String },

    #[error("Profile is missing a user code")]
    MissingUserCode,

    #[error("SSO is misconfigured: {0}")]
    Config(String),

    #[error("{0}")]
    Provision(#[from] ProvisionError),

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl SsoError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SsoError::MissingCode => FailureKind::InvalidInput,
            SsoError::TokenRejected(_)
            | SsoError::MissingAccessToken
            | SsoError::TokenExchange { .. }
            | SsoError::ProfileFetch { .. }
            | SsoError::MissingUserCode => FailureKind::Upstream,
            SsoError::Config(_) => FailureKind::Internal,
            SsoError::Provision(e) => e.kind(),
            SsoError::Store(e) => e.kind(),
        }
    }
}

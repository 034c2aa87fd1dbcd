//! Authentication and authorization logic.
//!
//! Provides password hashing, session token management and privilege
//! predicates shared by the management API and the user application.

pub mod access;
pub mod jwt;
pub mod password;

use thiserror::Error;

use crate::FailureKind;
use crate::store::StoreError;
use access::Privilege;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    CredentialError(String),

    #[error("Unauthorized access, please log in")]
    Unauthenticated,

    #[error("Insufficient privilege: {0} required")]
    Forbidden(Privilege),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AuthError::CredentialError(_) | AuthError::Unauthenticated => {
                FailureKind::Unauthenticated
            }
            AuthError::Forbidden(_) => FailureKind::Forbidden,
            AuthError::ValidationError(_) => FailureKind::InvalidInput,
            AuthError::Store(e) => e.kind(),
            AuthError::TokenError(_) | AuthError::Internal(_) => FailureKind::Internal,
        }
    }
}

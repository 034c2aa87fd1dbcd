//! Failure classification shared by every domain error.
//!
//! Messages shown to browsers and API clients stay human-readable strings;
//! the kind is what callers and tests branch on.

use serde::Serialize;

/// Coarse category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Missing or malformed client input.
    InvalidInput,
    /// No valid identity was presented.
    Unauthenticated,
    /// Valid identity, insufficient privilege.
    Forbidden,
    /// The identity provider failed, timed out or sent an unusable payload.
    Upstream,
    /// The relational store failed.
    Storage,
    /// A uniqueness rule was violated (e.g. two accounts for one email).
    Conflict,
    /// A local fault unrelated to input or collaborators.
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::Unauthenticated => "unauthenticated",
            FailureKind::Forbidden => "forbidden",
            FailureKind::Upstream => "upstream",
            FailureKind::Storage => "storage",
            FailureKind::Conflict => "conflict",
            FailureKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

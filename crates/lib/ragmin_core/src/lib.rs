//! # ragmin_core
//!
//! Core domain logic for Ragmin: tokens, privilege checks, persistence,
//! the CAS identity exchange and account provisioning.

pub mod auth;
pub mod failure;
pub mod ids;
pub mod migrate;
pub mod models;
pub mod provision;
pub mod sso;
pub mod store;

pub use failure::FailureKind;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

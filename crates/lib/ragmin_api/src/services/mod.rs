//! Business logic behind the handlers.

pub mod auth;
pub mod cookies;
pub mod envelope;
pub mod settings;
pub mod sso;

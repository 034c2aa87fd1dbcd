//! Domain models.

pub mod account;
pub mod auth;
pub mod role;

//! Persistence seam for accounts, tenants, credentials and roles.
//!
//! `MySqlStore` talks to the platform database; `MemoryStore` keeps the same
//! tables in process for tests and local development.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

use crate::FailureKind;
use crate::models::account::{
    Account, CatalogModel, Folder, Membership, ProfileUpdate, Tenant, TenantInfo, TenantLlm,
    TenantModelUpdate,
};
use crate::models::role::Role;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn kind(&self) -> FailureKind {
        match self {
            StoreError::Duplicate(_) => FailureKind::Conflict,
            StoreError::Unavailable(_) | StoreError::Database(_) => FailureKind::Storage,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.message().to_string())
            }
            _ => StoreError::Database(e),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row-level operations used by the auth, SSO and provisioning flows.
///
/// Each call is its own statement; there is no cross-call transaction.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    // -- accounts ------------------------------------------------------------

    /// Every account with this email, regardless of status.
    async fn accounts_by_email(&self, email: &str) -> StoreResult<Vec<Account>>;

    /// The enabled account with this email.
    async fn active_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// The enabled account holding this (non-empty) access token.
    async fn account_by_access_token(&self, token: &str) -> StoreResult<Option<Account>>;

    /// Insert an account. Returns the number of rows written.
    async fn insert_account(&self, account: &Account) -> StoreResult<u64>;

    /// Rotate the access token and stamp the login time.
    async fn record_login(
        &self,
        account_id: &str,
        token: &str,
        at: NaiveDateTime,
    ) -> StoreResult<u64>;

    /// Blank the access token so it can no longer open a session.
    async fn clear_access_token(&self, account_id: &str) -> StoreResult<u64>;

    async fn update_profile(&self, account_id: &str, update: &ProfileUpdate) -> StoreResult<u64>;

    async fn delete_account(&self, account_id: &str) -> StoreResult<u64>;

    // -- tenants -------------------------------------------------------------

    async fn insert_tenant(&self, tenant: &Tenant) -> StoreResult<()>;

    async fn delete_tenant(&self, tenant_id: &str) -> StoreResult<u64>;

    /// Model configuration of the tenant the account owns.
    async fn owned_tenant_info(&self, user_id: &str) -> StoreResult<Option<TenantInfo>>;

    async fn is_tenant_member(&self, user_id: &str, tenant_id: &str) -> StoreResult<bool>;

    async fn update_tenant_models(
        &self,
        tenant_id: &str,
        update: &TenantModelUpdate,
    ) -> StoreResult<u64>;

    async fn insert_membership(&self, membership: &Membership) -> StoreResult<()>;

    async fn delete_memberships_of_tenant(&self, tenant_id: &str) -> StoreResult<u64>;

    async fn insert_folder(&self, folder: &Folder) -> StoreResult<()>;

    /// Remove the `/` folder that is its own parent.
    async fn delete_root_folder(&self, tenant_id: &str) -> StoreResult<u64>;

    // -- model credentials ---------------------------------------------------

    /// Catalog entries published by one model factory.
    async fn catalog_models(&self, factory: &str) -> StoreResult<Vec<CatalogModel>>;

    async fn insert_tenant_llms(&self, rows: &[TenantLlm]) -> StoreResult<u64>;

    async fn delete_tenant_llms(&self, tenant_id: &str) -> StoreResult<u64>;

    // -- roles ---------------------------------------------------------------

    /// Enabled roles, default role first, then by name.
    async fn active_roles(&self) -> StoreResult<Vec<Role>>;

    /// Enabled roles assigned to an account, by name.
    async fn roles_of_user(&self, user_id: &str) -> StoreResult<Vec<Role>>;

    /// Replace the full role set of an account.
    async fn replace_user_roles(&self, user_id: &str, role_ids: &[String]) -> StoreResult<()>;
}

/// Milliseconds since the epoch, the unit of `create_time` / `update_time`.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

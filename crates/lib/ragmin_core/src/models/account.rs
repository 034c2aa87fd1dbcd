//! Account and tenancy domain models.
//!
//! Field names follow the platform's relational schema so rows map 1:1.

use chrono::NaiveDateTime;
use serde::Serialize;

/// `status` value of an enabled row.
pub const STATUS_VALID: &str = "1";

/// Default `max_tokens` for a credential row when the catalog has none.
pub const DEFAULT_MAX_TOKENS: i32 = 8192;

/// A local user account (`user` table).
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub nickname: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub avatar: Option<String>,
    pub language: Option<String>,
    pub color_schema: Option<String>,
    pub timezone: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub login_channel: Option<String>,
    pub status: Option<String>,
    pub is_superuser: bool,
    pub is_system_admin: bool,
    pub last_login_time: Option<NaiveDateTime>,
    pub create_time: Option<i64>,
    pub update_time: Option<i64>,
}

impl Account {
    /// Whether the account is enabled.
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some(STATUS_VALID)
    }
}

/// Ownership / billing scope (`tenant` table).
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: String,
    pub name: Option<String>,
    pub llm_id: String,
    pub embd_id: String,
    pub asr_id: String,
    pub img2txt_id: String,
    pub rerank_id: String,
    pub parser_ids: String,
    pub status: Option<String>,
}

/// Tenant model configuration as seen by one member.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TenantInfo {
    pub tenant_id: String,
    pub name: Option<String>,
    pub llm_id: String,
    pub embd_id: String,
    pub asr_id: String,
    pub img2txt_id: String,
    pub rerank_id: String,
    pub parser_ids: String,
    pub role: String,
}

/// New model selection for a tenant. An optional column left `None` is not touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantModelUpdate {
    pub llm_id: String,
    pub embd_id: String,
    pub asr_id: String,
    pub img2txt_id: String,
    pub rerank_id: Option<String>,
    pub parser_ids: Option<String>,
}

/// Role of an account inside a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantRole {
    Owner,
}

impl TenantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantRole::Owner => "owner",
        }
    }
}

/// Account ↔ tenant link (`user_tenant` table).
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    pub id: String,
    pub user_id: String,
    pub tenant_id: String,
    pub role: TenantRole,
    pub invited_by: String,
    pub status: String,
}

/// Kind of a `file` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Folder,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Folder => "folder",
        }
    }
}

/// A node of a tenant's file namespace (`file` table).
#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    pub id: String,
    pub parent_id: String,
    pub tenant_id: String,
    pub created_by: String,
    pub name: String,
    pub kind: FileKind,
    pub size: i64,
    pub location: String,
}

impl Folder {
    /// The root folder of a tenant: named `/`, its own parent.
    pub fn root(id: String, tenant_id: &str, created_by: &str) -> Self {
        Self {
            parent_id: id.clone(),
            id,
            tenant_id: tenant_id.to_string(),
            created_by: created_by.to_string(),
            name: "/".to_string(),
            kind: FileKind::Folder,
            size: 0,
            location: String::new(),
        }
    }
}

/// Shared model catalog entry (`llm` table).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CatalogModel {
    pub fid: String,
    pub llm_name: String,
    pub model_type: String,
    pub max_tokens: Option<i32>,
}

/// Per-tenant model credential (`tenant_llm` table).
#[derive(Debug, Clone, PartialEq)]
pub struct TenantLlm {
    pub tenant_id: String,
    pub llm_factory: String,
    pub llm_name: String,
    pub model_type: String,
    pub api_key: String,
    pub api_base: String,
    pub max_tokens: i32,
}

/// Mutable profile columns of an account. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub language: Option<String>,
    pub color_schema: Option<String>,
    pub timezone: Option<String>,
    pub password_hash: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

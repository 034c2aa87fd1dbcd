//! Just-in-time account provisioning for first-time SSO logins.
//!
//! A new account owns a tenant of the same id, an owner membership, a root
//! folder and one credential row per catalog model of the configured
//! factory. These rows are written by independent statements; when any of
//! them fails the already-written rows are deleted again.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::FailureKind;
use crate::ids::new_id;
use crate::models::account::{
    Account, DEFAULT_MAX_TOKENS, Folder, Membership, STATUS_VALID, Tenant, TenantLlm, TenantRole,
};
use crate::sso::SsoIdentity;
use crate::store::{IdentityStore, StoreError};

/// `login_channel` recorded on SSO-created accounts.
pub const LOGIN_CHANNEL_SSO: &str = "sso";

const DEFAULT_PARSERS: &str = "naive:General,qa:Q&A,resume:Resume,manual:Manual,table:Table,\
paper:Paper,book:Book,laws:Laws,presentation:Presentation,picture:Picture,one:One,\
audio:Audio,email:Email,tag:Tag";

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Fail to register {email}.")]
    NotCreated { email: String },

    #[error("Same email: {email} exists!")]
    DuplicateEmail { email: String },

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl ProvisionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProvisionError::NotCreated { .. } => FailureKind::Storage,
            ProvisionError::DuplicateEmail { .. } => FailureKind::Conflict,
            ProvisionError::Store(e) => e.kind(),
        }
    }
}

/// Model selection and credentials given to every new tenant.
#[derive(Debug, Clone, Default)]
pub struct TenantDefaults {
    pub llm_id: String,
    pub embd_id: String,
    pub asr_id: String,
    pub img2txt_id: String,
    pub rerank_id: String,
    pub parser_ids: String,
    /// Catalog factory whose models are copied into the tenant.
    pub llm_factory: String,
    pub api_key: String,
    pub base_url: String,
}

impl TenantDefaults {
    /// `CHAT_MDL`, `EMBEDDING_MDL`, `ASR_MDL`, `IMAGE2TEXT_MDL`, `RERANK_MDL`,
    /// `PARSERS`, `LLM_FACTORY`, `API_KEY`, `LLM_BASE_URL`.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).unwrap_or_default();
        Self {
            llm_id: var("CHAT_MDL"),
            embd_id: var("EMBEDDING_MDL"),
            asr_id: var("ASR_MDL"),
            img2txt_id: var("IMAGE2TEXT_MDL"),
            rerank_id: var("RERANK_MDL"),
            parser_ids: std::env::var("PARSERS").unwrap_or_else(|_| DEFAULT_PARSERS.to_string()),
            llm_factory: var("LLM_FACTORY"),
            api_key: var("API_KEY"),
            base_url: var("LLM_BASE_URL"),
        }
    }
}

/// Create an account and its dependent rows, or leave nothing behind.
pub async fn provision_account(
    store: &dyn IdentityStore,
    candidate_id: &str,
    identity: &SsoIdentity,
    defaults: &TenantDefaults,
) -> Result<Account, ProvisionError> {
    match register(store, candidate_id, identity, defaults).await {
        Ok(account) => {
            info!(email = %account.email, user_id = %account.id, "New user registered via SSO");
            Ok(account)
        }
        Err(e) => {
            warn!(
                email = %identity.email,
                user_id = %candidate_id,
                error = %e,
                "Registration failed, rolling back"
            );
            rollback_registration(store, candidate_id).await;
            Err(e)
        }
    }
}

async fn register(
    store: &dyn IdentityStore,
    candidate_id: &str,
    identity: &SsoIdentity,
    defaults: &TenantDefaults,
) -> Result<Account, ProvisionError> {
    let account = new_account(candidate_id, identity);
    let tenant = Tenant {
        id: candidate_id.to_string(),
        name: Some(format!("{}'s Kingdom", identity.display_name)),
        llm_id: defaults.llm_id.clone(),
        embd_id: defaults.embd_id.clone(),
        asr_id: defaults.asr_id.clone(),
        img2txt_id: defaults.img2txt_id.clone(),
        rerank_id: defaults.rerank_id.clone(),
        parser_ids: defaults.parser_ids.clone(),
        status: Some(STATUS_VALID.to_string()),
    };
    let membership = Membership {
        id: new_id(),
        user_id: candidate_id.to_string(),
        tenant_id: candidate_id.to_string(),
        role: TenantRole::Owner,
        invited_by: candidate_id.to_string(),
        status: STATUS_VALID.to_string(),
    };
    let folder = Folder::root(new_id(), candidate_id, candidate_id);

    let credentials: Vec<TenantLlm> = store
        .catalog_models(&defaults.llm_factory)
        .await?
        .into_iter()
        .map(|model| TenantLlm {
            tenant_id: candidate_id.to_string(),
            llm_factory: defaults.llm_factory.clone(),
            llm_name: model.llm_name,
            model_type: model.model_type,
            api_key: defaults.api_key.clone(),
            api_base: defaults.base_url.clone(),
            max_tokens: model
                .max_tokens
                .filter(|n| *n != 0)
                .unwrap_or(DEFAULT_MAX_TOKENS),
        })
        .collect();

    let written = match store.insert_account(&account).await {
        Ok(n) => n,
        Err(StoreError::Duplicate(_)) => {
            return Err(ProvisionError::DuplicateEmail {
                email: identity.email.clone(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    if written == 0 {
        return Err(ProvisionError::NotCreated {
            email: identity.email.clone(),
        });
    }
    store.insert_tenant(&tenant).await?;
    store.insert_membership(&membership).await?;
    store.insert_tenant_llms(&credentials).await?;
    store.insert_folder(&folder).await?;

    let mut accounts = store.accounts_by_email(&identity.email).await?;
    match accounts.len() {
        0 => Err(ProvisionError::NotCreated {
            email: identity.email.clone(),
        }),
        1 => Ok(accounts.remove(0)),
        _ => Err(ProvisionError::DuplicateEmail {
            email: identity.email.clone(),
        }),
    }
}

fn new_account(id: &str, identity: &SsoIdentity) -> Account {
    Account {
        id: id.to_string(),
        email: identity.email.clone(),
        nickname: identity.display_name.clone(),
        password: None,
        avatar: Some(String::new()),
        language: Some("English".to_string()),
        color_schema: Some("Bright".to_string()),
        timezone: Some("UTC+8\tAsia/Shanghai".to_string()),
        access_token: Some(new_id()),
        login_channel: Some(LOGIN_CHANNEL_SSO.to_string()),
        status: Some(STATUS_VALID.to_string()),
        is_superuser: false,
        is_system_admin: false,
        last_login_time: Some(Utc::now().naive_utc()),
        create_time: None,
        update_time: None,
    }
}

/// One compensating delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackStep {
    Account,
    Tenant,
    Memberships,
    TenantLlms,
    Folder,
}

/// Outcome of a rollback: the steps that failed, with their error text.
#[derive(Debug, Default)]
pub struct RollbackReport {
    pub failures: Vec<(RollbackStep, String)>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record<T>(&mut self, step: RollbackStep, user_id: &str, result: Result<T, StoreError>) {
        if let Err(e) = result {
            warn!(?step, %user_id, error = %e, "Rollback step failed");
            self.failures.push((step, e.to_string()));
        }
    }
}

/// Delete whatever a failed registration left behind. Every step runs even
/// when an earlier one fails.
pub async fn rollback_registration(store: &dyn IdentityStore, user_id: &str) -> RollbackReport {
    let mut report = RollbackReport::default();
    report.record(RollbackStep::Account, user_id, store.delete_account(user_id).await);
    report.record(RollbackStep::Tenant, user_id, store.delete_tenant(user_id).await);
    report.record(
        RollbackStep::Memberships,
        user_id,
        store.delete_memberships_of_tenant(user_id).await,
    );
    report.record(
        RollbackStep::TenantLlms,
        user_id,
        store.delete_tenant_llms(user_id).await,
    );
    report.record(RollbackStep::Folder, user_id, store.delete_root_folder(user_id).await);
    report
}

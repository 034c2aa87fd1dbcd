//! In-process identity store.
//!
//! Mirrors the MySQL tables closely enough for the provisioning and session
//! flows: unique emails, status filtering, role ordering. Faults can be
//! injected per operation to exercise rollback paths.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use dashmap::DashMap;

use super::{IdentityStore, StoreError, StoreResult, now_millis};
use crate::models::account::{
    Account, CatalogModel, Folder, Membership, ProfileUpdate, STATUS_VALID, Tenant, TenantInfo,
    TenantLlm, TenantModelUpdate, TenantRole,
};
use crate::models::role::Role;

/// Operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    LookupByEmail,
    InsertAccount,
    InsertTenant,
    InsertMembership,
    InsertTenantLlms,
    InsertFolder,
    RecordLogin,
    DeleteAccount,
    DeleteTenant,
    DeleteMemberships,
    DeleteTenantLlms,
    DeleteFolder,
}

/// Row counts across the provisioning tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub accounts: usize,
    pub tenants: usize,
    pub memberships: usize,
    pub folders: usize,
    pub tenant_llms: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    accounts: DashMap<String, Account>,
    tenants: DashMap<String, Tenant>,
    memberships: DashMap<String, Membership>,
    folders: DashMap<String, Folder>,
    catalog: DashMap<(String, String), CatalogModel>,
    tenant_llms: DashMap<(String, String, String), TenantLlm>,
    roles: DashMap<String, (Role, bool)>,
    user_roles: DashMap<String, Vec<String>>,
    faults: DashMap<Fault, String>,
    drop_account_inserts: AtomicBool,
    allow_duplicate_emails: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail with `message` until cleared.
    pub fn fail_on(&self, op: Fault, message: &str) {
        self.faults.insert(op, message.to_string());
    }

    pub fn clear_fault(&self, op: Fault) {
        self.faults.remove(&op);
    }

    /// Accept account inserts but write nothing (zero rows affected).
    pub fn drop_account_inserts(&self, enabled: bool) {
        self.drop_account_inserts.store(enabled, Ordering::SeqCst);
    }

    /// Disable the unique-email rule, as a table without the index would.
    pub fn allow_duplicate_emails(&self, enabled: bool) {
        self.allow_duplicate_emails.store(enabled, Ordering::SeqCst);
    }

    /// Insert an account directly, bypassing faults and uniqueness.
    pub fn seed_account(&self, account: Account) {
        self.accounts.insert(account.id.clone(), account);
    }

    pub fn seed_catalog_model(&self, model: CatalogModel) {
        self.catalog
            .insert((model.fid.clone(), model.llm_name.clone()), model);
    }

    pub fn seed_role(&self, role: Role, enabled: bool) {
        self.roles.insert(role.id.clone(), (role, enabled));
    }

    pub fn account(&self, account_id: &str) -> Option<Account> {
        self.accounts.get(account_id).map(|a| a.value().clone())
    }

    pub fn tenant(&self, tenant_id: &str) -> Option<Tenant> {
        self.tenants.get(tenant_id).map(|t| t.value().clone())
    }

    pub fn memberships_of_tenant(&self, tenant_id: &str) -> Vec<Membership> {
        self.memberships
            .iter()
            .filter(|m| m.tenant_id == tenant_id)
            .map(|m| m.value().clone())
            .collect()
    }

    pub fn folders_of_tenant(&self, tenant_id: &str) -> Vec<Folder> {
        self.folders
            .iter()
            .filter(|f| f.tenant_id == tenant_id)
            .map(|f| f.value().clone())
            .collect()
    }

    pub fn tenant_llms_of(&self, tenant_id: &str) -> Vec<TenantLlm> {
        self.tenant_llms
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .map(|r| r.value().clone())
            .collect()
    }

    pub fn counts(&self) -> TableCounts {
        TableCounts {
            accounts: self.accounts.len(),
            tenants: self.tenants.len(),
            memberships: self.memberships.len(),
            folders: self.folders.len(),
            tenant_llms: self.tenant_llms.len(),
        }
    }

    fn check(&self, op: Fault) -> StoreResult<()> {
        match self.faults.get(&op) {
            Some(message) => Err(StoreError::Unavailable(message.value().clone())),
            None => Ok(()),
        }
    }

    fn role(&self, role_id: &str) -> Option<Role> {
        self.roles
            .get(role_id)
            .filter(|entry| entry.value().1)
            .map(|entry| entry.value().0.clone())
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn accounts_by_email(&self, email: &str) -> StoreResult<Vec<Account>> {
        self.check(Fault::LookupByEmail)?;
        let mut rows: Vec<Account> = self
            .accounts
            .iter()
            .filter(|a| a.email == email)
            .map(|a| a.value().clone())
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows)
    }

    async fn active_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        self.check(Fault::LookupByEmail)?;
        Ok(self
            .accounts
            .iter()
            .find(|a| a.email == email && a.is_active())
            .map(|a| a.value().clone()))
    }

    async fn account_by_access_token(&self, token: &str) -> StoreResult<Option<Account>> {
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self
            .accounts
            .iter()
            .find(|a| a.access_token.as_deref() == Some(token) && a.is_active())
            .map(|a| a.value().clone()))
    }

    async fn insert_account(&self, account: &Account) -> StoreResult<u64> {
        self.check(Fault::InsertAccount)?;
        if self.drop_account_inserts.load(Ordering::SeqCst) {
            return Ok(0);
        }
        if self.accounts.contains_key(&account.id) {
            return Err(StoreError::Duplicate(format!("user.PRIMARY {}", account.id)));
        }
        if !self.allow_duplicate_emails.load(Ordering::SeqCst)
            && self.accounts.iter().any(|a| a.email == account.email)
        {
            return Err(StoreError::Duplicate(format!(
                "user.uk_user_email {}",
                account.email
            )));
        }
        let mut row = account.clone();
        let now = now_millis();
        row.create_time = Some(row.create_time.unwrap_or(now));
        row.update_time = Some(now);
        self.accounts.insert(row.id.clone(), row);
        Ok(1)
    }

    async fn record_login(
        &self,
        account_id: &str,
        token: &str,
        at: NaiveDateTime,
    ) -> StoreResult<u64> {
        self.check(Fault::RecordLogin)?;
        match self.accounts.get_mut(account_id) {
            Some(mut account) => {
                account.access_token = Some(token.to_string());
                account.last_login_time = Some(at);
                account.update_time = Some(now_millis());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn clear_access_token(&self, account_id: &str) -> StoreResult<u64> {
        match self.accounts.get_mut(account_id) {
            Some(mut account) => {
                account.access_token = Some(String::new());
                account.update_time = Some(now_millis());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_profile(&self, account_id: &str, update: &ProfileUpdate) -> StoreResult<u64> {
        let Some(mut account) = self.accounts.get_mut(account_id) else {
            return Ok(0);
        };
        if let Some(v) = &update.nickname {
            account.nickname = v.clone();
        }
        if let Some(v) = &update.avatar {
            account.avatar = Some(v.clone());
        }
        if let Some(v) = &update.language {
            account.language = Some(v.clone());
        }
        if let Some(v) = &update.color_schema {
            account.color_schema = Some(v.clone());
        }
        if let Some(v) = &update.timezone {
            account.timezone = Some(v.clone());
        }
        if let Some(v) = &update.password_hash {
            account.password = Some(v.clone());
        }
        account.update_time = Some(now_millis());
        Ok(1)
    }

    async fn delete_account(&self, account_id: &str) -> StoreResult<u64> {
        self.check(Fault::DeleteAccount)?;
        Ok(self.accounts.remove(account_id).map_or(0, |_| 1))
    }

    async fn insert_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
        self.check(Fault::InsertTenant)?;
        if self.tenants.contains_key(&tenant.id) {
            return Err(StoreError::Duplicate(format!("tenant.PRIMARY {}", tenant.id)));
        }
        self.tenants.insert(tenant.id.clone(), tenant.clone());
        Ok(())
    }

    async fn delete_tenant(&self, tenant_id: &str) -> StoreResult<u64> {
        self.check(Fault::DeleteTenant)?;
        Ok(self.tenants.remove(tenant_id).map_or(0, |_| 1))
    }

    async fn owned_tenant_info(&self, user_id: &str) -> StoreResult<Option<TenantInfo>> {
        let owned = self
            .memberships
            .iter()
            .find(|m| m.user_id == user_id && m.role == TenantRole::Owner)
            .map(|m| m.tenant_id.clone());
        let Some(tenant_id) = owned else {
            return Ok(None);
        };
        Ok(self
            .tenants
            .get(&tenant_id)
            .filter(|t| t.status.as_deref() == Some(STATUS_VALID))
            .map(|t| TenantInfo {
                tenant_id: t.id.clone(),
                name: t.name.clone(),
                llm_id: t.llm_id.clone(),
                embd_id: t.embd_id.clone(),
                asr_id: t.asr_id.clone(),
                img2txt_id: t.img2txt_id.clone(),
                rerank_id: t.rerank_id.clone(),
                parser_ids: t.parser_ids.clone(),
                role: TenantRole::Owner.as_str().to_string(),
            }))
    }

    async fn is_tenant_member(&self, user_id: &str, tenant_id: &str) -> StoreResult<bool> {
        Ok(self.memberships.iter().any(|m| {
            m.user_id == user_id && m.tenant_id == tenant_id && m.status == STATUS_VALID
        }))
    }

    async fn update_tenant_models(
        &self,
        tenant_id: &str,
        update: &TenantModelUpdate,
    ) -> StoreResult<u64> {
        let Some(mut tenant) = self.tenants.get_mut(tenant_id) else {
            return Ok(0);
        };
        tenant.llm_id = update.llm_id.clone();
        tenant.embd_id = update.embd_id.clone();
        tenant.asr_id = update.asr_id.clone();
        tenant.img2txt_id = update.img2txt_id.clone();
        if let Some(v) = &update.rerank_id {
            tenant.rerank_id = v.clone();
        }
        if let Some(v) = &update.parser_ids {
            tenant.parser_ids = v.clone();
        }
        Ok(1)
    }

    async fn insert_membership(&self, membership: &Membership) -> StoreResult<()> {
        self.check(Fault::InsertMembership)?;
        self.memberships
            .insert(membership.id.clone(), membership.clone());
        Ok(())
    }

    async fn delete_memberships_of_tenant(&self, tenant_id: &str) -> StoreResult<u64> {
        self.check(Fault::DeleteMemberships)?;
        let before = self.memberships.len();
        self.memberships.retain(|_, m| m.tenant_id != tenant_id);
        Ok((before - self.memberships.len()) as u64)
    }

    async fn insert_folder(&self, folder: &Folder) -> StoreResult<()> {
        self.check(Fault::InsertFolder)?;
        self.folders.insert(folder.id.clone(), folder.clone());
        Ok(())
    }

    async fn delete_root_folder(&self, tenant_id: &str) -> StoreResult<u64> {
        self.check(Fault::DeleteFolder)?;
        let before = self.folders.len();
        self.folders
            .retain(|_, f| !(f.tenant_id == tenant_id && f.id == f.parent_id && f.name == "/"));
        Ok((before - self.folders.len()) as u64)
    }

    async fn catalog_models(&self, factory: &str) -> StoreResult<Vec<CatalogModel>> {
        let mut rows: Vec<CatalogModel> = self
            .catalog
            .iter()
            .filter(|m| m.fid == factory)
            .map(|m| m.value().clone())
            .collect();
        rows.sort_by(|a, b| a.llm_name.cmp(&b.llm_name));
        Ok(rows)
    }

    async fn insert_tenant_llms(&self, rows: &[TenantLlm]) -> StoreResult<u64> {
        self.check(Fault::InsertTenantLlms)?;
        for row in rows {
            let key = (
                row.tenant_id.clone(),
                row.llm_factory.clone(),
                row.llm_name.clone(),
            );
            if self.tenant_llms.contains_key(&key) {
                return Err(StoreError::Duplicate(format!(
                    "tenant_llm.PRIMARY {}/{}",
                    row.tenant_id, row.llm_name
                )));
            }
            self.tenant_llms.insert(key, row.clone());
        }
        Ok(rows.len() as u64)
    }

    async fn delete_tenant_llms(&self, tenant_id: &str) -> StoreResult<u64> {
        self.check(Fault::DeleteTenantLlms)?;
        let before = self.tenant_llms.len();
        self.tenant_llms.retain(|key, _| key.0 != tenant_id);
        Ok((before - self.tenant_llms.len()) as u64)
    }

    async fn active_roles(&self) -> StoreResult<Vec<Role>> {
        let mut roles: Vec<Role> = self
            .roles
            .iter()
            .filter(|entry| entry.value().1)
            .map(|entry| entry.value().0.clone())
            .collect();
        roles.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(a.name.cmp(&b.name)));
        Ok(roles)
    }

    async fn roles_of_user(&self, user_id: &str) -> StoreResult<Vec<Role>> {
        let ids = self
            .user_roles
            .get(user_id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();
        let mut roles: Vec<Role> = ids.iter().filter_map(|id| self.role(id)).collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn replace_user_roles(&self, user_id: &str, role_ids: &[String]) -> StoreResult<()> {
        let mut ids: Vec<String> = Vec::with_capacity(role_ids.len());
        for id in role_ids {
            if ids.contains(id) {
                return Err(StoreError::Duplicate(format!("user_role {user_id}/{id}")));
            }
            ids.push(id.clone());
        }
        self.user_roles.insert(user_id.to_string(), ids);
        Ok(())
    }
}

//! MySQL-backed identity store.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use super::{IdentityStore, StoreResult, now_millis};
use crate::ids::new_id;
use crate::models::account::{
    Account, CatalogModel, Folder, Membership, ProfileUpdate, STATUS_VALID, Tenant, TenantInfo,
    TenantLlm, TenantModelUpdate,
};
use crate::models::role::Role;

const ACCOUNT_COLUMNS: &str = "id, email, nickname, password, avatar, language, color_schema, \
     timezone, access_token, login_channel, status, is_superuser, is_system_admin, \
     last_login_time, create_time, update_time";

/// Identity store over a MySQL connection pool.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for MySqlStore {
    async fn accounts_by_email(&self, email: &str) -> StoreResult<Vec<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM `user` WHERE email = ?");
        let rows = sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn active_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM `user` WHERE email = ? AND status = ?");
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .bind(STATUS_VALID)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn account_by_access_token(&self, token: &str) -> StoreResult<Option<Account>> {
        if token.is_empty() {
            return Ok(None);
        }
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM `user` WHERE access_token = ? AND status = ? LIMIT 1"
        );
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(token)
            .bind(STATUS_VALID)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_account(&self, account: &Account) -> StoreResult<u64> {
        let now = now_millis();
        let result = sqlx::query(
            "INSERT INTO `user` (id, email, nickname, password, avatar, language, color_schema, \
             timezone, access_token, login_channel, status, is_superuser, is_system_admin, \
             last_login_time, create_time, update_time) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.nickname)
        .bind(&account.password)
        .bind(&account.avatar)
        .bind(&account.language)
        .bind(&account.color_schema)
        .bind(&account.timezone)
        .bind(&account.access_token)
        .bind(&account.login_channel)
        .bind(&account.status)
        .bind(account.is_superuser)
        .bind(account.is_system_admin)
        .bind(account.last_login_time)
        .bind(account.create_time.unwrap_or(now))
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn record_login(
        &self,
        account_id: &str,
        token: &str,
        at: NaiveDateTime,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE `user` SET access_token = ?, last_login_time = ?, update_time = ? WHERE id = ?",
        )
        .bind(token)
        .bind(at)
        .bind(now_millis())
        .bind(account_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn clear_access_token(&self, account_id: &str) -> StoreResult<u64> {
        let result =
            sqlx::query("UPDATE `user` SET access_token = '', update_time = ? WHERE id = ?")
                .bind(now_millis())
                .bind(account_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn update_profile(&self, account_id: &str, update: &ProfileUpdate) -> StoreResult<u64> {
        let mut qb = QueryBuilder::<MySql>::new("UPDATE `user` SET update_time = ");
        qb.push_bind(now_millis());
        let columns = [
            ("nickname", &update.nickname),
            ("avatar", &update.avatar),
            ("language", &update.language),
            ("color_schema", &update.color_schema),
            ("timezone", &update.timezone),
            ("password", &update.password_hash),
        ];
        for (column, value) in columns {
            if let Some(value) = value {
                qb.push(format!(", {column} = "));
                qb.push_bind(value.clone());
            }
        }
        qb.push(" WHERE id = ");
        qb.push_bind(account_id.to_string());
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_account(&self, account_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM `user` WHERE id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
        let now = now_millis();
        sqlx::query(
            "INSERT INTO tenant (id, name, llm_id, embd_id, asr_id, img2txt_id, rerank_id, \
             parser_ids, status, create_time, update_time) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.llm_id)
        .bind(&tenant.embd_id)
        .bind(&tenant.asr_id)
        .bind(&tenant.img2txt_id)
        .bind(&tenant.rerank_id)
        .bind(&tenant.parser_ids)
        .bind(&tenant.status)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_tenant(&self, tenant_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM tenant WHERE id = ?")
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn owned_tenant_info(&self, user_id: &str) -> StoreResult<Option<TenantInfo>> {
        let row = sqlx::query_as::<_, TenantInfo>(
            "SELECT t.id AS tenant_id, t.name, t.llm_id, t.embd_id, t.asr_id, t.img2txt_id, \
             t.rerank_id, t.parser_ids, ut.role \
             FROM tenant t JOIN user_tenant ut ON ut.tenant_id = t.id \
             WHERE ut.user_id = ? AND ut.role = 'owner' AND t.status = ? \
             LIMIT 1",
        )
        .bind(user_id)
        .bind(STATUS_VALID)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn is_tenant_member(&self, user_id: &str, tenant_id: &str) -> StoreResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_tenant WHERE user_id = ? AND tenant_id = ? AND status = ?",
        )
        .bind(user_id)
        .bind(tenant_id)
        .bind(STATUS_VALID)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn update_tenant_models(
        &self,
        tenant_id: &str,
        update: &TenantModelUpdate,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE tenant SET llm_id = ?, embd_id = ?, asr_id = ?, img2txt_id = ?, \
             rerank_id = COALESCE(?, rerank_id), parser_ids = COALESCE(?, parser_ids), \
             update_time = ? WHERE id = ?",
        )
        .bind(&update.llm_id)
        .bind(&update.embd_id)
        .bind(&update.asr_id)
        .bind(&update.img2txt_id)
        .bind(&update.rerank_id)
        .bind(&update.parser_ids)
        .bind(now_millis())
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_membership(&self, membership: &Membership) -> StoreResult<()> {
        let now = now_millis();
        sqlx::query(
            "INSERT INTO user_tenant (id, user_id, tenant_id, role, invited_by, status, \
             create_time, update_time) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&membership.id)
        .bind(&membership.user_id)
        .bind(&membership.tenant_id)
        .bind(membership.role.as_str())
        .bind(&membership.invited_by)
        .bind(&membership.status)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_memberships_of_tenant(&self, tenant_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_tenant WHERE tenant_id = ?")
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_folder(&self, folder: &Folder) -> StoreResult<()> {
        let now = now_millis();
        sqlx::query(
            "INSERT INTO file (id, parent_id, tenant_id, created_by, name, location, size, type, \
             create_time, update_time) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&folder.id)
        .bind(&folder.parent_id)
        .bind(&folder.tenant_id)
        .bind(&folder.created_by)
        .bind(&folder.name)
        .bind(&folder.location)
        .bind(folder.size)
        .bind(folder.kind.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_root_folder(&self, tenant_id: &str) -> StoreResult<u64> {
        let result =
            sqlx::query("DELETE FROM file WHERE tenant_id = ? AND id = parent_id AND name = '/'")
                .bind(tenant_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn catalog_models(&self, factory: &str) -> StoreResult<Vec<CatalogModel>> {
        let rows = sqlx::query_as::<_, CatalogModel>(
            "SELECT fid, llm_name, model_type, max_tokens FROM llm WHERE fid = ?",
        )
        .bind(factory)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_tenant_llms(&self, rows: &[TenantLlm]) -> StoreResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let now = now_millis();
        let mut qb = QueryBuilder::<MySql>::new(
            "INSERT INTO tenant_llm (tenant_id, llm_factory, llm_name, model_type, api_key, \
             api_base, max_tokens, create_time, update_time) ",
        );
        qb.push_values(rows, |mut b, row| {
            b.push_bind(row.tenant_id.clone())
                .push_bind(row.llm_factory.clone())
                .push_bind(row.llm_name.clone())
                .push_bind(row.model_type.clone())
                .push_bind(row.api_key.clone())
                .push_bind(row.api_base.clone())
                .push_bind(row.max_tokens)
                .push_bind(now)
                .push_bind(now);
        });
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_tenant_llms(&self, tenant_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM tenant_llm WHERE tenant_id = ?")
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn active_roles(&self) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, (String, String, i32)>(
            "SELECT id, name, is_default FROM role WHERE status = ? \
             ORDER BY is_default DESC, name ASC",
        )
        .bind(STATUS_VALID)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(role_from_row).collect())
    }

    async fn roles_of_user(&self, user_id: &str) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, (String, String, i32)>(
            "SELECT r.id, r.name, r.is_default FROM user_role ur \
             INNER JOIN role r ON ur.role_id = r.id \
             WHERE ur.user_id = ? AND r.status = ? ORDER BY r.name ASC",
        )
        .bind(user_id)
        .bind(STATUS_VALID)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(role_from_row).collect())
    }

    async fn replace_user_roles(&self, user_id: &str, role_ids: &[String]) -> StoreResult<()> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_role WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        for role_id in role_ids {
            sqlx::query(
                "INSERT INTO user_role (id, user_id, role_id, create_time, update_time) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(new_id())
            .bind(user_id)
            .bind(role_id)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn role_from_row((id, name, is_default): (String, String, i32)) -> Role {
    Role {
        id,
        name,
        is_default: is_default == 1,
    }
}

//! 授权仓储
//!
//! 访问码、一次性令牌与诊所访问授权的数据访问。
//! 发放与兑换的原子性依赖事务内的行级锁（`FOR UPDATE`），
//! 对应方法以 `_in_tx` 结尾并接收 `&mut PgConnection`。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::GrantRepositoryTrait;
use crate::error::Result;
use crate::models::{
    AccessCode, GrantSource, ShareToken, TokenKind, VetAccessToken, VetPetAccess,
};

/// 授权仓储
pub struct GrantRepository {
    pool: PgPool,
}

impl GrantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 访问码 ====================

    /// 获取宠物当前的访问码行（无论是否过期）
    pub async fn get_code_for_pet(&self, pet_id: Uuid) -> Result<Option<AccessCode>> {
        let code = sqlx::query_as::<_, AccessCode>(
            r#"
            SELECT id, pet_id, code, created_at, expires_at
            FROM access_codes
            WHERE pet_id = $1
            "#,
        )
        .bind(pet_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(code)
    }

    /// 在事务中读取宠物的访问码行
    ///
    /// 调用方需已持有宠物行锁，访问码行本身无需再加锁
    pub async fn get_code_for_pet_in_tx(
        tx: &mut PgConnection,
        pet_id: Uuid,
    ) -> Result<Option<AccessCode>> {
        let code = sqlx::query_as::<_, AccessCode>(
            r#"
            SELECT id, pet_id, code, created_at, expires_at
            FROM access_codes
            WHERE pet_id = $1
            "#,
        )
        .bind(pet_id)
        .fetch_optional(tx)
        .await?;

        Ok(code)
    }

    /// 在事务中删除访问码行
    pub async fn delete_code_in_tx(tx: &mut PgConnection, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM access_codes WHERE id = $1")
            .bind(id)
            .execute(tx)
            .await?;

        Ok(())
    }

    /// 在事务中探测码值是否被其他宠物的有效码占用
    ///
    /// 过期码不参与判定：验证只会命中未过期的码，
    /// 因此唯一性约束的范围是"当前有效"而非"历史全部"
    pub async fn valid_code_in_use_in_tx(
        tx: &mut PgConnection,
        code: &str,
        exclude_pet: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM access_codes
                WHERE code = $1 AND pet_id <> $2 AND expires_at > $3
            )
            "#,
        )
        .bind(code)
        .bind(exclude_pet)
        .bind(now)
        .fetch_one(tx)
        .await?;

        Ok(exists)
    }

    /// 在事务中创建访问码
    pub async fn create_code_in_tx(
        tx: &mut PgConnection,
        pet_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<AccessCode> {
        let created = sqlx::query_as::<_, AccessCode>(
            r#"
            INSERT INTO access_codes (pet_id, code, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, pet_id, code, created_at, expires_at
            "#,
        )
        .bind(pet_id)
        .bind(code)
        .bind(expires_at)
        .fetch_one(tx)
        .await?;

        Ok(created)
    }

    // ==================== 一次性令牌 ====================

    /// 创建分享令牌（总是新建，允许同一宠物多个令牌并存）
    pub async fn create_share_token(&self, pet_id: Uuid) -> Result<ShareToken> {
        let token = sqlx::query_as::<_, ShareToken>(
            r#"
            INSERT INTO share_tokens (pet_id, token)
            VALUES ($1, $2)
            RETURNING id, pet_id, token, used, created_at
            "#,
        )
        .bind(pet_id)
        .bind(Uuid::new_v4())
        .fetch_one(&self.pool)
        .await?;

        Ok(token)
    }

    /// 创建诊所快速入口令牌
    pub async fn create_vet_token(&self, pet_id: Uuid) -> Result<VetAccessToken> {
        let token = sqlx::query_as::<_, VetAccessToken>(
            r#"
            INSERT INTO vet_access_tokens (pet_id, token)
            VALUES ($1, $2)
            RETURNING id, pet_id, token, used, created_at
            "#,
        )
        .bind(pet_id)
        .bind(Uuid::new_v4())
        .fetch_one(&self.pool)
        .await?;

        Ok(token)
    }

    /// 在事务中按令牌值锁定分享令牌行
    ///
    /// `FOR UPDATE` 保证两个并发兑换者只有一个能看到 used=false
    pub async fn get_share_token_for_update(
        tx: &mut PgConnection,
        token: Uuid,
    ) -> Result<Option<ShareToken>> {
        let row = sqlx::query_as::<_, ShareToken>(
            r#"
            SELECT id, pet_id, token, used, created_at
            FROM share_tokens
            WHERE token = $1
            FOR UPDATE
            "#,
        )
        .bind(token)
        .fetch_optional(tx)
        .await?;

        Ok(row)
    }

    /// 在事务中将分享令牌置为已使用
    pub async fn mark_share_token_used_in_tx(tx: &mut PgConnection, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE share_tokens SET used = TRUE WHERE id = $1")
            .bind(id)
            .execute(tx)
            .await?;

        Ok(())
    }

    /// 在事务中按令牌值锁定诊所令牌行
    pub async fn get_vet_token_for_update(
        tx: &mut PgConnection,
        token: Uuid,
    ) -> Result<Option<VetAccessToken>> {
        let row = sqlx::query_as::<_, VetAccessToken>(
            r#"
            SELECT id, pet_id, token, used, created_at
            FROM vet_access_tokens
            WHERE token = $1
            FOR UPDATE
            "#,
        )
        .bind(token)
        .fetch_optional(tx)
        .await?;

        Ok(row)
    }

    /// 在事务中将诊所令牌置为已使用
    pub async fn mark_vet_token_used_in_tx(tx: &mut PgConnection, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE vet_access_tokens SET used = TRUE WHERE id = $1")
            .bind(id)
            .execute(tx)
            .await?;

        Ok(())
    }

    // ==================== 诊所访问授权 ====================

    /// upsert 诊所访问授权：后授予覆盖先授予，刷新窗口
    pub async fn upsert_vet_access(
        &self,
        vet_id: Uuid,
        pet_id: Uuid,
        source: GrantSource,
        expires_at: DateTime<Utc>,
    ) -> Result<VetPetAccess> {
        let access = sqlx::query_as::<_, VetPetAccess>(
            r#"
            INSERT INTO vet_pet_access (vet_id, pet_id, granted_by, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (vet_id, pet_id)
            DO UPDATE SET
                granted_by = EXCLUDED.granted_by,
                expires_at = EXCLUDED.expires_at,
                created_at = NOW()
            RETURNING id, vet_id, pet_id, granted_by, created_at, expires_at
            "#,
        )
        .bind(vet_id)
        .bind(pet_id)
        .bind(source)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(access)
    }

    /// 事务版 upsert（令牌兑换与置位 used 在同一事务内提交）
    pub async fn upsert_vet_access_in_tx(
        tx: &mut PgConnection,
        vet_id: Uuid,
        pet_id: Uuid,
        source: GrantSource,
        expires_at: DateTime<Utc>,
    ) -> Result<VetPetAccess> {
        let access = sqlx::query_as::<_, VetPetAccess>(
            r#"
            INSERT INTO vet_pet_access (vet_id, pet_id, granted_by, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (vet_id, pet_id)
            DO UPDATE SET
                granted_by = EXCLUDED.granted_by,
                expires_at = EXCLUDED.expires_at,
                created_at = NOW()
            RETURNING id, vet_id, pet_id, granted_by, created_at, expires_at
            "#,
        )
        .bind(vet_id)
        .bind(pet_id)
        .bind(source)
        .bind(expires_at)
        .fetch_one(tx)
        .await?;

        Ok(access)
    }

    // ==================== 清理 ====================

    /// 删除一批过期且未使用的令牌，返回删除行数
    ///
    /// 分批删除避免在大表上长时间持锁
    async fn delete_stale_batch(
        &self,
        kind: TokenKind,
        older_than: DateTime<Utc>,
        batch: i64,
    ) -> Result<u64> {
        // 表名来自固定枚举映射，不存在注入风险
        let sql = format!(
            r#"
            DELETE FROM {table}
            WHERE id IN (
                SELECT id FROM {table}
                WHERE used = FALSE AND created_at < $1
                LIMIT $2
            )
            "#,
            table = kind.table()
        );

        let result = sqlx::query(&sql)
            .bind(older_than)
            .bind(batch)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl GrantRepositoryTrait for GrantRepository {
    async fn get_code_for_pet(&self, pet_id: Uuid) -> Result<Option<AccessCode>> {
        self.get_code_for_pet(pet_id).await
    }

    async fn create_share_token(&self, pet_id: Uuid) -> Result<ShareToken> {
        self.create_share_token(pet_id).await
    }

    async fn create_vet_token(&self, pet_id: Uuid) -> Result<VetAccessToken> {
        self.create_vet_token(pet_id).await
    }

    async fn upsert_vet_access(
        &self,
        vet_id: Uuid,
        pet_id: Uuid,
        source: GrantSource,
        expires_at: DateTime<Utc>,
    ) -> Result<VetPetAccess> {
        self.upsert_vet_access(vet_id, pet_id, source, expires_at).await
    }

    async fn purge_expired_unused(
        &self,
        kind: TokenKind,
        older_than: DateTime<Utc>,
        batch: i64,
    ) -> Result<u64> {
        let mut total = 0u64;

        loop {
            let deleted = self.delete_stale_batch(kind, older_than, batch).await?;
            total += deleted;

            if deleted < batch as u64 {
                break;
            }
        }

        Ok(total)
    }
}

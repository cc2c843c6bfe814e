//! 宠物仓储
//!
//! 提供宠物与主人关系的数据访问，支持事务场景下的所有权变更。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::PetRepositoryTrait;
use crate::error::Result;
use crate::models::{Identity, Pet};

/// 宠物仓储
pub struct PetRepository {
    pool: PgPool,
}

impl PetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    /// 按 ID 获取宠物
    pub async fn get_pet(&self, id: Uuid) -> Result<Option<Pet>> {
        let pet = sqlx::query_as::<_, Pet>(
            r#"
            SELECT id, name, species, breed, sex, date_of_birth, passport_number,
                   created_at, updated_at
            FROM pets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pet)
    }

    /// 按当前有效的访问码反查宠物
    pub async fn get_pet_by_valid_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Pet>> {
        let pet = sqlx::query_as::<_, Pet>(
            r#"
            SELECT p.id, p.name, p.species, p.breed, p.sex, p.date_of_birth,
                   p.passport_number, p.created_at, p.updated_at
            FROM pets p
            JOIN access_codes c ON c.pet_id = p.id
            WHERE c.code = $1 AND c.expires_at > $2
            "#,
        )
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pet)
    }

    /// 列出宠物的所有主人
    pub async fn list_owners(&self, pet_id: Uuid) -> Result<Vec<Identity>> {
        let owners = sqlx::query_as::<_, Identity>(
            r#"
            SELECT i.id, i.email, i.first_name, i.last_name, i.role, i.language,
                   i.created_at, i.updated_at
            FROM identities i
            JOIN pet_owners po ON po.identity_id = i.id
            WHERE po.pet_id = $1
            ORDER BY po.added_at ASC
            "#,
        )
        .bind(pet_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(owners)
    }

    /// 判断身份是否已是宠物主人
    pub async fn is_owner(&self, pet_id: Uuid, identity_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM pet_owners
                WHERE pet_id = $1 AND identity_id = $2
            )
            "#,
        )
        .bind(pet_id)
        .bind(identity_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    // ==================== 事务操作 ====================

    /// 在事务中锁定宠物行
    ///
    /// 用于串行化同一宠物上的访问码发放，同时校验宠物存在
    pub async fn lock_pet_in_tx(tx: &mut PgConnection, pet_id: Uuid) -> Result<bool> {
        let row: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM pets WHERE id = $1 FOR UPDATE")
                .bind(pet_id)
                .fetch_optional(tx)
                .await?;

        Ok(row.is_some())
    }

    /// 在事务中将身份加入宠物主人（幂等）
    pub async fn add_owner_in_tx(
        tx: &mut PgConnection,
        pet_id: Uuid,
        identity_id: Uuid,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pet_owners (pet_id, identity_id)
            VALUES ($1, $2)
            ON CONFLICT (pet_id, identity_id) DO NOTHING
            "#,
        )
        .bind(pet_id)
        .bind(identity_id)
        .execute(tx)
        .await?;

        Ok(())
    }

    /// 在事务中移除待确认主人（成为正式主人后清理）
    pub async fn remove_pending_owner_in_tx(
        tx: &mut PgConnection,
        pet_id: Uuid,
        identity_id: Uuid,
    ) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM pet_pending_owners
            WHERE pet_id = $1 AND identity_id = $2
            "#,
        )
        .bind(pet_id)
        .bind(identity_id)
        .execute(tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PetRepositoryTrait for PetRepository {
    async fn get_pet(&self, id: Uuid) -> Result<Option<Pet>> {
        self.get_pet(id).await
    }

    async fn get_pet_by_valid_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Pet>> {
        self.get_pet_by_valid_code(code, now).await
    }

    async fn list_owners(&self, pet_id: Uuid) -> Result<Vec<Identity>> {
        self.list_owners(pet_id).await
    }

    async fn is_owner(&self, pet_id: Uuid, identity_id: Uuid) -> Result<bool> {
        self.is_owner(pet_id, identity_id).await
    }
}

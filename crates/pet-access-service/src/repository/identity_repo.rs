//! 身份仓储
//!
//! 身份的创建与维护属于外部账户系统，这里只提供读取。

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::traits::IdentityRepositoryTrait;
use crate::error::Result;
use crate::models::Identity;

/// 身份仓储
pub struct IdentityRepository {
    pool: PgPool,
}

impl IdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按 ID 获取身份
    pub async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, email, first_name, last_name, role, language, created_at, updated_at
            FROM identities
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }
}

#[async_trait]
impl IdentityRepositoryTrait for IdentityRepository {
    async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>> {
        self.get_identity(id).await
    }
}

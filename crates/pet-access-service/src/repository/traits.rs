//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试。
//! 事务内的行锁操作不在此列——它们是具体仓储上的静态方法。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AccessCode, DueRecord, GrantSource, Identity, Pet, ShareToken, TokenKind, VetAccessToken,
    VetPetAccess,
};

/// 宠物仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PetRepositoryTrait: Send + Sync {
    async fn get_pet(&self, id: Uuid) -> Result<Option<Pet>>;

    /// 按当前有效的访问码反查宠物
    ///
    /// 过期码被惰性删除，因此"不存在"与"已过期"在这里无法区分
    async fn get_pet_by_valid_code(&self, code: &str, now: DateTime<Utc>)
    -> Result<Option<Pet>>;

    async fn list_owners(&self, pet_id: Uuid) -> Result<Vec<Identity>>;

    async fn is_owner(&self, pet_id: Uuid, identity_id: Uuid) -> Result<bool>;
}

/// 身份仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityRepositoryTrait: Send + Sync {
    async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>>;
}

/// 授权仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GrantRepositoryTrait: Send + Sync {
    // 访问码
    async fn get_code_for_pet(&self, pet_id: Uuid) -> Result<Option<AccessCode>>;

    // 一次性令牌
    async fn create_share_token(&self, pet_id: Uuid) -> Result<ShareToken>;
    async fn create_vet_token(&self, pet_id: Uuid) -> Result<VetAccessToken>;

    // 诊所访问授权
    async fn upsert_vet_access(
        &self,
        vet_id: Uuid,
        pet_id: Uuid,
        source: GrantSource,
        expires_at: DateTime<Utc>,
    ) -> Result<VetPetAccess>;

    /// 批量清理过期且未使用的令牌
    ///
    /// 每批最多删除 `batch` 行，内部循环直到没有可删行，返回删除总数
    async fn purge_expired_unused(
        &self,
        kind: TokenKind,
        older_than: DateTime<Utc>,
        batch: i64,
    ) -> Result<u64>;
}

/// 医疗记录仓储接口
///
/// 记录由外部录入流程写入，本服务只读
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordRepositoryTrait: Send + Sync {
    /// 查询 `valid_until` 恰好等于给定日期的疫苗记录
    async fn vaccinations_due(&self, on: NaiveDate) -> Result<Vec<DueRecord>>;

    /// 查询 `valid_until` 恰好等于给定日期的用药记录
    async fn medications_due(&self, on: NaiveDate) -> Result<Vec<DueRecord>>;
}

//! 授权兑换服务
//!
//! 授权物的一次性或时间门控消费，触发对应副作用：
//! - 分享令牌：按兑换者角色分支——主人获得共同所有权，诊所获得临时访问
//! - 诊所令牌：仅限诊所，兑换后进入检查录入流程
//! - 访问码：诊所凭码换取 10 分钟访问授权与宠物摘要
//!
//! 状态机（所有授权物）：`CREATED -> VALID -> {CONSUMED | EXPIRED}`，
//! CONSUMED 与 EXPIRED 均为终态。未过期但已使用的令牌与已过期的令牌
//! 返回同一条对外文案，两种失败原因只在内部日志中区分。
//!
//! 消费与副作用在单个事务内完成（令牌行 `FOR UPDATE`），
//! 两个并发兑换者最多一个成功。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use petpass_shared::cache::Cache;
use petpass_shared::config::GrantConfig;
use petpass_shared::observability::metrics;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{AccessError, Result};
use crate::models::{GrantSource, IdentityRole, OwnerSummary, Pet, PetSummary};
use crate::repository::{GrantRepository, GrantRepositoryTrait, PetRepository, PetRepositoryTrait};
use crate::service::dto::{RedeemOutcome, RequestContext, ShareRedemption};
use crate::service::issue_service::GrantIssueService;

/// 缓存键生成
mod cache_keys {
    use uuid::Uuid;

    pub fn pet_summary(pet_id: Uuid) -> String {
        format!("pet:summary:{}", pet_id)
    }
}

/// 宠物摘要缓存时长
const SUMMARY_CACHE_TTL: StdDuration = StdDuration::from_secs(60);

/// 授权兑换服务
pub struct GrantRedeemService<PR, GR>
where
    PR: PetRepositoryTrait,
    GR: GrantRepositoryTrait,
{
    pet_repo: Arc<PR>,
    issue_service: Arc<GrantIssueService<PR, GR>>,
    pool: PgPool,
    cache: Arc<Cache>,
    config: GrantConfig,
}

impl<PR, GR> GrantRedeemService<PR, GR>
where
    PR: PetRepositoryTrait,
    GR: GrantRepositoryTrait,
{
    pub fn new(
        pet_repo: Arc<PR>,
        issue_service: Arc<GrantIssueService<PR, GR>>,
        pool: PgPool,
        cache: Arc<Cache>,
        config: GrantConfig,
    ) -> Self {
        Self {
            pet_repo,
            issue_service,
            pool,
            cache,
            config,
        }
    }

    /// 兑换分享令牌
    ///
    /// 同一令牌类型按兑换者身份产生两种授予语义：
    /// - 主人角色：加入宠物主人集合（共同所有权，单次兑换）
    /// - 诊所角色：获得 10 分钟访问授权，主人集合不变
    ///
    /// 其余角色拒绝且不消耗令牌。
    #[instrument(skip(self, ctx), fields(identity_id = %ctx.identity_id(), role = ?ctx.role()))]
    pub async fn redeem_share_token(
        &self,
        token: Uuid,
        ctx: &RequestContext,
    ) -> Result<ShareRedemption> {
        let now = Utc::now();
        let ttl = Duration::seconds(self.config.token_ttl_seconds);

        let mut tx = self.pool.begin().await?;

        let Some(share_token) = GrantRepository::get_share_token_for_update(&mut tx, token).await?
        else {
            metrics::record_token_redemption("share", "not_found");
            return Err(AccessError::TokenNotFound);
        };

        if !share_token.is_valid(now, ttl) {
            // used 与超窗两种原因仅在日志区分，对外文案一致
            warn!(
                pet_id = %share_token.pet_id,
                used = share_token.used,
                age_seconds = (now - share_token.created_at).num_seconds(),
                "分享令牌兑换被拒绝"
            );
            metrics::record_token_redemption("share", "rejected");
            return Err(AccessError::TokenExpired);
        }

        let outcome = match ctx.role() {
            IdentityRole::Owner => {
                PetRepository::add_owner_in_tx(&mut tx, share_token.pet_id, ctx.identity_id())
                    .await?;
                PetRepository::remove_pending_owner_in_tx(
                    &mut tx,
                    share_token.pet_id,
                    ctx.identity_id(),
                )
                .await?;
                RedeemOutcome::CoOwnership
            }
            IdentityRole::Clinic => {
                let expires_at = now + Duration::seconds(self.config.vet_access_ttl_seconds);
                GrantRepository::upsert_vet_access_in_tx(
                    &mut tx,
                    ctx.identity_id(),
                    share_token.pet_id,
                    GrantSource::Qr,
                    expires_at,
                )
                .await?;
                RedeemOutcome::VetAccess
            }
            IdentityRole::Groomer | IdentityRole::Store => {
                // 角色不符：拒绝且不消耗令牌
                metrics::record_token_redemption("share", "role_not_allowed");
                return Err(AccessError::RoleNotAllowed);
            }
        };

        GrantRepository::mark_share_token_used_in_tx(&mut tx, share_token.id).await?;
        tx.commit().await?;

        // 所有权变化使缓存的宠物摘要失效
        if outcome == RedeemOutcome::CoOwnership {
            self.invalidate_pet_summary(share_token.pet_id).await;
        }

        metrics::record_token_redemption("share", "consumed");
        info!(
            pet_id = %share_token.pet_id,
            identity_id = %ctx.identity_id(),
            outcome = ?outcome,
            "分享令牌已兑换"
        );

        let pet = self.load_pet(share_token.pet_id).await?;
        Ok(ShareRedemption { pet, outcome })
    }

    /// 兑换诊所快速入口令牌
    ///
    /// 仅限诊所角色；兑换成功后获得访问授权并进入检查录入流程
    #[instrument(skip(self, ctx), fields(identity_id = %ctx.identity_id(), role = ?ctx.role()))]
    pub async fn redeem_vet_token(&self, token: Uuid, ctx: &RequestContext) -> Result<Pet> {
        if ctx.role() != IdentityRole::Clinic {
            metrics::record_token_redemption("vet_access", "role_not_allowed");
            return Err(AccessError::RoleNotAllowed);
        }

        let now = Utc::now();
        let ttl = Duration::seconds(self.config.token_ttl_seconds);

        let mut tx = self.pool.begin().await?;

        let Some(vet_token) = GrantRepository::get_vet_token_for_update(&mut tx, token).await?
        else {
            metrics::record_token_redemption("vet_access", "not_found");
            return Err(AccessError::TokenNotFound);
        };

        if !vet_token.is_valid(now, ttl) {
            warn!(
                pet_id = %vet_token.pet_id,
                used = vet_token.used,
                age_seconds = (now - vet_token.created_at).num_seconds(),
                "诊所令牌兑换被拒绝"
            );
            metrics::record_token_redemption("vet_access", "rejected");
            return Err(AccessError::TokenExpired);
        }

        let expires_at = now + Duration::seconds(self.config.vet_access_ttl_seconds);
        GrantRepository::upsert_vet_access_in_tx(
            &mut tx,
            ctx.identity_id(),
            vet_token.pet_id,
            GrantSource::Qr,
            expires_at,
        )
        .await?;
        GrantRepository::mark_vet_token_used_in_tx(&mut tx, vet_token.id).await?;

        tx.commit().await?;

        metrics::record_token_redemption("vet_access", "consumed");
        info!(
            pet_id = %vet_token.pet_id,
            vet_id = %ctx.identity_id(),
            "诊所令牌已兑换"
        );

        self.load_pet(vet_token.pet_id).await
    }

    /// 凭访问码换取诊所访问
    ///
    /// 按码值反查宠物：查不到时"从未发放"与"已过期并被惰性删除"
    /// 无法区分，统一返回 InvalidCode。成功时刷新 10 分钟访问授权
    /// 并返回宠物摘要。
    #[instrument(skip(self, ctx), fields(identity_id = %ctx.identity_id(), role = ?ctx.role()))]
    pub async fn verify_access_code(
        &self,
        code: &str,
        ctx: &RequestContext,
    ) -> Result<PetSummary> {
        if ctx.role() != IdentityRole::Clinic {
            metrics::record_code_verification("role_not_allowed");
            return Err(AccessError::RoleNotAllowed);
        }

        let now = Utc::now();

        let Some(pet) = self.pet_repo.get_pet_by_valid_code(code, now).await? else {
            metrics::record_code_verification("invalid");
            return Err(AccessError::InvalidCode);
        };

        self.issue_service
            .grant_vet_access(&ctx.identity, pet.id, GrantSource::Code)
            .await?;

        metrics::record_code_verification("ok");
        info!(
            pet_id = %pet.id,
            vet_id = %ctx.identity_id(),
            "访问码验证通过，已授予临时访问"
        );

        self.pet_summary(pet).await
    }

    // ==================== 私有方法 ====================

    /// 组装宠物摘要（带缓存）
    async fn pet_summary(&self, pet: Pet) -> Result<PetSummary> {
        let key = cache_keys::pet_summary(pet.id);

        // 缓存故障按未命中处理，不阻断主流程
        match self.cache.get::<PetSummary>(&key).await {
            Ok(Some(summary)) => return Ok(summary),
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "读取宠物摘要缓存失败"),
        }

        let owners = self.pet_repo.list_owners(pet.id).await?;
        let summary = PetSummary {
            pet_id: pet.id,
            name: pet.name.clone(),
            species: pet.species.clone(),
            age: pet.age_on(Utc::now().date_naive()),
            owners: owners
                .into_iter()
                .map(|owner| OwnerSummary {
                    id: owner.id,
                    full_name: owner.full_name(),
                    first_name: owner.first_name,
                    last_name: owner.last_name,
                })
                .collect(),
        };

        if let Err(e) = self.cache.set(&key, &summary, SUMMARY_CACHE_TTL).await {
            warn!(key = %key, error = %e, "写入宠物摘要缓存失败");
        }

        Ok(summary)
    }

    /// 使宠物摘要缓存失效（所有权变化后调用）
    async fn invalidate_pet_summary(&self, pet_id: Uuid) {
        let key = cache_keys::pet_summary(pet_id);
        if let Err(e) = self.cache.delete(&key).await {
            warn!(key = %key, error = %e, "宠物摘要缓存失效失败");
        }
    }

    /// 加载宠物；外键保证兑换过的令牌必然指向存在的宠物
    async fn load_pet(&self, pet_id: Uuid) -> Result<Pet> {
        self.pet_repo
            .get_pet(pet_id)
            .await?
            .ok_or(AccessError::PetNotFound(pet_id))
    }
}

//! 授权发放服务
//!
//! 在授权仓储之上实现发放策略：
//! - 访问码幂等复用：窗口内重复请求返回同一码（页面刷新安全）
//! - 过期即重生成：旧行删除，新码配新 240 分钟窗口
//! - 码值冲突重试：新码不得与其他宠物的在用码相同
//! - 一次性令牌总是新建，允许同一宠物多个链接并存
//! - 诊所访问授权 upsert："最近一次授予获胜"，刷新窗口而非累积
//!
//! ## 发放流程（访问码）
//!
//! 1. 无锁快路径：已有有效码直接返回 -> 2. 事务内锁宠物行
//! -> 3. 复读码行（并发者可能已重生成）-> 4. 删除过期行
//! -> 5. 生成 + 冲突探测循环 -> 6. 插入并提交

use std::sync::Arc;
use std::sync::Mutex;

use chrono::{Duration, Utc};
use petpass_shared::config::GrantConfig;
use petpass_shared::observability::metrics;
use rand::Rng;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{AccessError, Result};
use crate::models::{GrantSource, Identity, VetPetAccess};
use crate::repository::{GrantRepository, GrantRepositoryTrait, PetRepository, PetRepositoryTrait};
use crate::service::dto::{IssuedCode, IssuedToken};

/// 访问码生成器
///
/// 可注入实现，便于测试构造确定性的冲突序列
pub trait CodeGenerator: Send + Sync {
    /// 生成一个 6 位数字码候选
    fn generate(&self) -> String;
}

/// 随机生成器（生产默认）
///
/// 取值范围 100000..=999999，约 90 万个候选
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        rand::rng().random_range(100_000..=999_999).to_string()
    }
}

/// 预置序列生成器（测试用）
///
/// 依次返回预置的码值，耗尽后回落到最后一个
pub struct SequenceCodeGenerator {
    codes: Mutex<Vec<String>>,
}

impl SequenceCodeGenerator {
    pub fn new(codes: Vec<&str>) -> Self {
        let mut codes: Vec<String> = codes.into_iter().map(String::from).collect();
        codes.reverse();
        Self {
            codes: Mutex::new(codes),
        }
    }
}

impl CodeGenerator for SequenceCodeGenerator {
    fn generate(&self) -> String {
        let mut codes = self.codes.lock().expect("generator mutex poisoned");
        if codes.len() > 1 {
            codes.pop().expect("non-empty sequence")
        } else {
            codes.last().cloned().unwrap_or_else(|| "000000".to_string())
        }
    }
}

/// 授权发放服务
pub struct GrantIssueService<PR, GR>
where
    PR: PetRepositoryTrait,
    GR: GrantRepositoryTrait,
{
    pet_repo: Arc<PR>,
    grant_repo: Arc<GR>,
    pool: PgPool,
    config: GrantConfig,
    code_gen: Arc<dyn CodeGenerator>,
}

impl<PR, GR> GrantIssueService<PR, GR>
where
    PR: PetRepositoryTrait,
    GR: GrantRepositoryTrait,
{
    pub fn new(pet_repo: Arc<PR>, grant_repo: Arc<GR>, pool: PgPool, config: GrantConfig) -> Self {
        Self {
            pet_repo,
            grant_repo,
            pool,
            config,
            code_gen: Arc::new(RandomCodeGenerator),
        }
    }

    /// 替换码生成器（测试用）
    pub fn with_code_generator(mut self, code_gen: Arc<dyn CodeGenerator>) -> Self {
        self.code_gen = code_gen;
        self
    }

    /// 发放或复用访问码
    ///
    /// 窗口内的重复调用返回同一码且无副作用；过期后重新生成。
    /// 新码保证不与其他宠物的在用码相同，冲突时内部重试，
    /// 重试预算耗尽返回内部错误，冲突本身永远不暴露给调用方。
    #[instrument(skip(self), fields(pet_id = %pet_id))]
    pub async fn issue_or_reuse_code(&self, pet_id: Uuid) -> Result<IssuedCode> {
        let now = Utc::now();

        // 无锁快路径：绝大多数重复请求（页面刷新）在这里返回
        if let Some(existing) = self.grant_repo.get_code_for_pet(pet_id).await? {
            if existing.is_valid(now) {
                metrics::record_code_issued(true);
                return Ok(IssuedCode {
                    code: existing.code,
                    expires_at: existing.expires_at,
                    reused: true,
                });
            }
        }

        let mut tx = self.pool.begin().await?;

        // 宠物行锁串行化同一宠物上的并发发放，同时校验宠物存在
        if !PetRepository::lock_pet_in_tx(&mut tx, pet_id).await? {
            return Err(AccessError::PetNotFound(pet_id));
        }

        // 持锁复读：并发请求可能已经完成重生成
        if let Some(existing) = GrantRepository::get_code_for_pet_in_tx(&mut tx, pet_id).await? {
            if existing.is_valid(now) {
                tx.commit().await?;
                metrics::record_code_issued(true);
                return Ok(IssuedCode {
                    code: existing.code,
                    expires_at: existing.expires_at,
                    reused: true,
                });
            }
            // 过期行惰性删除
            GrantRepository::delete_code_in_tx(&mut tx, existing.id).await?;
        }

        // 生成 + 冲突探测循环
        let mut attempts = 0u32;
        let code = loop {
            attempts += 1;
            if attempts > self.config.code_retry_budget {
                return Err(AccessError::CodeSpaceExhausted { attempts });
            }

            let candidate = self.code_gen.generate();
            let collides =
                GrantRepository::valid_code_in_use_in_tx(&mut tx, &candidate, pet_id, now).await?;

            if !collides {
                break candidate;
            }

            warn!(
                pet_id = %pet_id,
                attempt = attempts,
                "访问码候选与在用码冲突，重新生成"
            );
        };

        let expires_at = now + Duration::seconds(self.config.code_ttl_seconds);
        let created = GrantRepository::create_code_in_tx(&mut tx, pet_id, &code, expires_at).await?;

        tx.commit().await?;

        metrics::record_code_issued(false);
        info!(
            pet_id = %pet_id,
            expires_at = %created.expires_at,
            attempts,
            "访问码已发放"
        );

        Ok(IssuedCode {
            code: created.code,
            expires_at: created.expires_at,
            reused: false,
        })
    }

    /// 发放分享令牌
    ///
    /// 与访问码不同：总是新建，不复用既有令牌，
    /// 同一宠物的多个未使用分享链接可以并存
    #[instrument(skip(self), fields(pet_id = %pet_id))]
    pub async fn issue_share_token(&self, pet_id: Uuid) -> Result<IssuedToken> {
        self.ensure_pet_exists(pet_id).await?;

        let token = self.grant_repo.create_share_token(pet_id).await?;

        metrics::record_token_issued("share");
        info!(pet_id = %pet_id, "分享令牌已发放");

        Ok(IssuedToken {
            token: token.token,
            expires_at: token.created_at + Duration::seconds(self.config.token_ttl_seconds),
        })
    }

    /// 发放诊所快速入口令牌
    #[instrument(skip(self), fields(pet_id = %pet_id))]
    pub async fn issue_vet_token(&self, pet_id: Uuid) -> Result<IssuedToken> {
        self.ensure_pet_exists(pet_id).await?;

        let token = self.grant_repo.create_vet_token(pet_id).await?;

        metrics::record_token_issued("vet_access");
        info!(pet_id = %pet_id, "诊所令牌已发放");

        Ok(IssuedToken {
            token: token.token,
            expires_at: token.created_at + Duration::seconds(self.config.token_ttl_seconds),
        })
    }

    /// 授予诊所临时访问权
    ///
    /// 总是把 (vet, pet) 的过期时间刷新为 now + 10 分钟，
    /// 覆盖先前的授予而非累积行
    #[instrument(skip(self, vet), fields(vet_id = %vet.id, pet_id = %pet_id))]
    pub async fn grant_vet_access(
        &self,
        vet: &Identity,
        pet_id: Uuid,
        source: GrantSource,
    ) -> Result<VetPetAccess> {
        let expires_at = Utc::now() + Duration::seconds(self.config.vet_access_ttl_seconds);

        let access = self
            .grant_repo
            .upsert_vet_access(vet.id, pet_id, source, expires_at)
            .await?;

        info!(
            vet_id = %vet.id,
            pet_id = %pet_id,
            source = ?source,
            expires_at = %access.expires_at,
            "诊所访问授权已刷新"
        );

        Ok(access)
    }

    async fn ensure_pet_exists(&self, pet_id: Uuid) -> Result<()> {
        if self.pet_repo.get_pet(pet_id).await?.is_none() {
            return Err(AccessError::PetNotFound(pet_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Pet, PetSex, ShareToken};
    use crate::repository::{MockGrantRepositoryTrait, MockPetRepositoryTrait};
    use chrono::NaiveDate;

    fn create_test_pet(id: Uuid) -> Pet {
        Pet {
            id,
            name: "Rex".to_string(),
            species: "Dog".to_string(),
            breed: "Mixed".to_string(),
            sex: PetSex::Male,
            date_of_birth: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            passport_number: "BG0123456789".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn lazy_pool() -> PgPool {
        PgPool::connect_lazy("postgres://localhost/unused").unwrap()
    }

    #[test]
    fn test_random_generator_range() {
        let generator = RandomCodeGenerator;
        for _ in 0..100 {
            let code = generator.generate();
            assert_eq!(code.len(), 6, "码长必须是 6: {code}");
            let value: u32 = code.parse().expect("码必须是数字");
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn test_sequence_generator_yields_in_order_then_sticks() {
        let generator = SequenceCodeGenerator::new(vec!["111111", "222222"]);
        assert_eq!(generator.generate(), "111111");
        assert_eq!(generator.generate(), "222222");
        // 耗尽后停留在最后一个
        assert_eq!(generator.generate(), "222222");
    }

    #[tokio::test]
    async fn test_issue_code_reuses_valid_code_without_touching_db() {
        let pet_id = Uuid::new_v4();
        let now = Utc::now();

        let pet_repo = MockPetRepositoryTrait::new();
        let mut grant_repo = MockGrantRepositoryTrait::new();

        let expires_at = now + Duration::minutes(200);
        grant_repo
            .expect_get_code_for_pet()
            .returning(move |pid| {
                Ok(Some(crate::models::AccessCode {
                    id: Uuid::new_v4(),
                    pet_id: pid,
                    code: "483920".to_string(),
                    created_at: now,
                    expires_at,
                }))
            });

        let service = GrantIssueService::new(
            Arc::new(pet_repo),
            Arc::new(grant_repo),
            lazy_pool(),
            GrantConfig::default(),
        );

        let issued = service.issue_or_reuse_code(pet_id).await.unwrap();
        assert_eq!(issued.code, "483920");
        assert!(issued.reused);
        assert_eq!(issued.expires_at, expires_at);
    }

    #[tokio::test]
    async fn test_issue_share_token_unknown_pet() {
        let mut pet_repo = MockPetRepositoryTrait::new();
        pet_repo.expect_get_pet().returning(|_| Ok(None));

        let grant_repo = MockGrantRepositoryTrait::new();

        let service = GrantIssueService::new(
            Arc::new(pet_repo),
            Arc::new(grant_repo),
            lazy_pool(),
            GrantConfig::default(),
        );

        let err = service.issue_share_token(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AccessError::PetNotFound(_)));
    }

    #[tokio::test]
    async fn test_issue_share_token_always_creates_new() {
        let pet_id = Uuid::new_v4();

        let mut pet_repo = MockPetRepositoryTrait::new();
        pet_repo
            .expect_get_pet()
            .returning(move |id| Ok(Some(create_test_pet(id))));

        let mut grant_repo = MockGrantRepositoryTrait::new();
        // 两次调用必须各创建一个新令牌
        grant_repo
            .expect_create_share_token()
            .times(2)
            .returning(|pid| {
                Ok(ShareToken {
                    id: Uuid::new_v4(),
                    pet_id: pid,
                    token: Uuid::new_v4(),
                    used: false,
                    created_at: Utc::now(),
                })
            });

        let service = GrantIssueService::new(
            Arc::new(pet_repo),
            Arc::new(grant_repo),
            lazy_pool(),
            GrantConfig::default(),
        );

        let first = service.issue_share_token(pet_id).await.unwrap();
        let second = service.issue_share_token(pet_id).await.unwrap();
        assert_ne!(first.token, second.token);
    }

    #[tokio::test]
    async fn test_issued_token_expiry_uses_config_ttl() {
        let pet_id = Uuid::new_v4();
        let created_at = Utc::now();

        let mut pet_repo = MockPetRepositoryTrait::new();
        pet_repo
            .expect_get_pet()
            .returning(move |id| Ok(Some(create_test_pet(id))));

        let mut grant_repo = MockGrantRepositoryTrait::new();
        grant_repo.expect_create_vet_token().returning(move |pid| {
            Ok(crate::models::VetAccessToken {
                id: Uuid::new_v4(),
                pet_id: pid,
                token: Uuid::new_v4(),
                used: false,
                created_at,
            })
        });

        let config = GrantConfig {
            token_ttl_seconds: 600,
            ..Default::default()
        };
        let service = GrantIssueService::new(
            Arc::new(pet_repo),
            Arc::new(grant_repo),
            lazy_pool(),
            config,
        );

        let issued = service.issue_vet_token(pet_id).await.unwrap();
        assert_eq!(issued.expires_at, created_at + Duration::seconds(600));
    }

    #[tokio::test]
    async fn test_grant_vet_access_refreshes_window() {
        let pet_id = Uuid::new_v4();
        let vet = Identity {
            id: Uuid::new_v4(),
            email: "clinic@example.com".to_string(),
            first_name: "Sofia".to_string(),
            last_name: "Vet".to_string(),
            role: crate::models::IdentityRole::Clinic,
            language: "en".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let pet_repo = MockPetRepositoryTrait::new();
        let mut grant_repo = MockGrantRepositoryTrait::new();
        let expected_vet = vet.id;
        grant_repo
            .expect_upsert_vet_access()
            .withf(move |vid, pid, source, _| {
                *vid == expected_vet && *pid == pet_id && *source == GrantSource::Code
            })
            .returning(|vet_id, pet_id, source, expires_at| {
                Ok(VetPetAccess {
                    id: Uuid::new_v4(),
                    vet_id,
                    pet_id,
                    granted_by: source,
                    created_at: Utc::now(),
                    expires_at,
                })
            });

        let service = GrantIssueService::new(
            Arc::new(pet_repo),
            Arc::new(grant_repo),
            lazy_pool(),
            GrantConfig::default(),
        );

        let before = Utc::now();
        let access = service
            .grant_vet_access(&vet, pet_id, GrantSource::Code)
            .await
            .unwrap();

        // 过期时间约为 now + 10 分钟
        let delta = access.expires_at - before;
        assert!(delta >= Duration::seconds(598) && delta <= Duration::seconds(602));
    }
}

//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use petpass_shared::cache::Cache;
use sqlx::PgPool;

use crate::repository::{GrantRepository, IdentityRepository, PetRepository};
use crate::service::{GrantIssueService, GrantRedeemService};

/// Axum 应用共享状态
///
/// 仓储与服务通过 Arc 在 handler 间共享
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL 连接池
    pub pool: PgPool,
    /// Redis 缓存客户端
    pub cache: Arc<Cache>,
    /// 身份仓储（请求上下文解析用）
    pub identity_repo: Arc<IdentityRepository>,
    /// 宠物仓储（handler 层做所有权校验）
    pub pet_repo: Arc<PetRepository>,
    /// 授权发放服务
    pub issue_service: Arc<GrantIssueService<PetRepository, GrantRepository>>,
    /// 授权兑换服务
    pub redeem_service: Arc<GrantRedeemService<PetRepository, GrantRepository>>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        cache: Arc<Cache>,
        identity_repo: Arc<IdentityRepository>,
        pet_repo: Arc<PetRepository>,
        issue_service: Arc<GrantIssueService<PetRepository, GrantRepository>>,
        redeem_service: Arc<GrantRedeemService<PetRepository, GrantRepository>>,
    ) -> Self {
        Self {
            pool,
            cache,
            identity_repo,
            pet_repo,
            issue_service,
            redeem_service,
        }
    }
}

//! 宠物医疗记录访问授权服务
//!
//! 负责宠物医疗记录的时间窗访问授权与到期提醒。
//!
//! ## 核心功能
//!
//! - **访问码**：主人生成 6 位数字码，诊所凭码获得 240 分钟内可兑换的
//!   10 分钟临时访问；窗口内幂等复用，过期后重新生成
//! - **分享令牌**：一次性二维码链接，主人兑换获得共同所有权，
//!   诊所兑换获得临时访问——同一令牌按兑换者角色分支
//! - **诊所令牌**：一次性快速通道，兑换后直接进入检查录入流程
//! - **到期扫描**：每日扫描疫苗/用药记录，按配置的提前量向主人发送提醒
//! - **令牌清理**：周期删除过期且未使用的一次性令牌
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `repository`: 数据库仓储层
//! - `service`: 业务服务层（发放 / 兑换）
//! - `notification`: 通知模块（模板、渠道、发送器）
//! - `worker`: 后台任务（到期扫描、令牌清理）
//! - `handlers` / `routes` / `state` / `dto`: HTTP API

pub mod dto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notification;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
pub mod worker;

pub use error::{AccessError, Result, TOKEN_REJECTED_MESSAGE};
pub use models::*;
pub use notification::{
    ExpiryNotice, Notification, NotificationSender, NotificationService, TemplateEngine,
};
pub use repository::{
    GrantRepository, GrantRepositoryTrait, IdentityRepository, IdentityRepositoryTrait,
    PetRepository, PetRepositoryTrait, RecordRepository, RecordRepositoryTrait,
};
pub use service::{
    GrantIssueService, GrantRedeemService, IssuedCode, IssuedToken, RedeemOutcome, RequestContext,
    ShareRedemption,
};
pub use state::AppState;
pub use worker::{ExpiryScanWorker, TokenCleanupWorker};

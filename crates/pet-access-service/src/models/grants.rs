//! 访问授权实体定义
//!
//! 四种时间驱动的授权物：
//! - 访问码：6 位数字，240 分钟窗口，同一宠物幂等复用
//! - 分享令牌 / 诊所令牌：一次性 UUID，10 分钟窗口
//! - 诊所-宠物访问授权：(诊所, 宠物) 唯一，后授予覆盖先授予
//!
//! 有效性全部是读取时的墙钟比较，没有主动定时器。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 授权来源
///
/// 记录诊所访问授权是通过访问码还是扫码获得的
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum GrantSource {
    /// 6 位访问码
    Code,
    /// 二维码分享令牌
    Qr,
}

/// 一次性令牌种类（用于清理与指标打点）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Share,
    VetAccess,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Share => "share",
            Self::VetAccess => "vet_access",
        }
    }

    /// 对应的数据库表名
    pub fn table(&self) -> &'static str {
        match self {
            Self::Share => "share_tokens",
            Self::VetAccess => "vet_access_tokens",
        }
    }
}

/// 宠物访问码
///
/// 每只宠物至多持有一行；过期行在下一次发放时惰性删除。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AccessCode {
    pub id: Uuid,
    pub pet_id: Uuid,
    /// 6 位数字码
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessCode {
    /// 访问码是否仍然有效
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// 分享令牌
///
/// 一次性：兑换后 `used` 永久置位，不可复用或续期。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShareToken {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub token: Uuid,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl ShareToken {
    /// 令牌是否可兑换：未使用且在窗口内
    pub fn is_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.used && now - self.created_at < ttl
    }
}

/// 诊所快速入口令牌
///
/// 与分享令牌同构，但只服务于诊所检查录入的快速通道。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VetAccessToken {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub token: Uuid,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl VetAccessToken {
    /// 令牌是否可兑换：未使用且在窗口内
    pub fn is_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.used && now - self.created_at < ttl
    }
}

/// 诊所-宠物访问授权
///
/// 以 (vet_id, pet_id) 为键 upsert，重复授予刷新窗口而非累积行。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VetPetAccess {
    pub id: Uuid,
    pub vet_id: Uuid,
    pub pet_id: Uuid,
    pub granted_by: GrantSource,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VetPetAccess {
    /// 授权是否仍在窗口内
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

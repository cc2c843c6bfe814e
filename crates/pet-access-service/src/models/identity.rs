//! 身份实体定义
//!
//! 以带角色标签的单一实体取代"同一张用户表 + 标志位"的建模方式，
//! 角色相关行为通过对 `IdentityRole` 的模式匹配分发。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 身份角色
///
/// 决定授权兑换路径的走向：主人兑换分享令牌获得共同所有权，
/// 诊所兑换则获得临时访问授权，其余角色不允许兑换。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum IdentityRole {
    /// 宠物主人
    Owner,
    /// 诊所/兽医
    Clinic,
    /// 美容师
    Groomer,
    /// 宠物商店
    Store,
}

/// 系统身份
///
/// 主人与诊所共用同一实体，语言字段驱动通知的本地化。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: uuid::Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// 身份角色
    pub role: IdentityRole,
    /// 通知语言（如 "en", "bg"）
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// 组合全名
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_identity(role: IdentityRole) -> Identity {
        Identity {
            id: uuid::Uuid::new_v4(),
            email: "ivan@example.com".to_string(),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            role,
            language: "bg".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_full_name() {
        let identity = create_test_identity(IdentityRole::Owner);
        assert_eq!(identity.full_name(), "Ivan Petrov");
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_value(IdentityRole::Clinic).unwrap();
        assert_eq!(json, "CLINIC");

        let role: IdentityRole = serde_json::from_value(serde_json::json!("OWNER")).unwrap();
        assert_eq!(role, IdentityRole::Owner);
    }
}

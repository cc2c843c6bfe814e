//! 服务层数据传输对象

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Identity, IdentityRole, Pet};

/// 请求上下文
///
/// 操作者身份的显式载体：服务层不读取任何环境态，
/// 身份由 HTTP 层解析后作为参数传入。
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identity: Identity,
}

impl RequestContext {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn identity_id(&self) -> Uuid {
        self.identity.id
    }

    pub fn role(&self) -> IdentityRole {
        self.identity.role
    }
}

/// 发放的访问码
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    /// 是否为幂等复用的既有码
    pub reused: bool,
}

/// 发放的一次性令牌
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// 分享令牌兑换的结果分支
///
/// 同一令牌类型按兑换者角色产生两种语义：
/// 主人获得共同所有权，诊所获得临时访问授权
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// 兑换者加入宠物主人
    CoOwnership,
    /// 兑换者获得 10 分钟诊所访问授权
    VetAccess,
}

/// 分享令牌兑换结果
#[derive(Debug, Clone)]
pub struct ShareRedemption {
    pub pet: Pet,
    pub outcome: RedeemOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_request_context_accessors() {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: "clinic@example.com".to_string(),
            first_name: "Sofia".to_string(),
            last_name: "Vet".to_string(),
            role: IdentityRole::Clinic,
            language: "en".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let id = identity.id;
        let ctx = RequestContext::new(identity);

        assert_eq!(ctx.identity_id(), id);
        assert_eq!(ctx.role(), IdentityRole::Clinic);
    }

    #[test]
    fn test_issued_code_serialization() {
        let issued = IssuedCode {
            code: "483920".to_string(),
            expires_at: Utc::now(),
            reused: false,
        };

        let json = serde_json::to_value(&issued).unwrap();
        assert_eq!(json["code"], "483920");
        assert_eq!(json["reused"], false);
        assert!(json.get("expiresAt").is_some());
    }
}

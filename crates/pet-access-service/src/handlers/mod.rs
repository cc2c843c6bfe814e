//! REST API 处理器
//!
//! 身份通过 `X-Identity-Id` 请求头解析为显式的 `RequestContext`
//! 传入服务层——认证机制本身（登录、会话）属于外部账户系统。

pub mod health;
pub mod issue;
pub mod redeem;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AccessError;
use crate::service::RequestContext;
use crate::state::AppState;

/// 操作者身份请求头
pub const IDENTITY_HEADER: &str = "x-identity-id";

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AccessError;

    /// 从 `X-Identity-Id` 头解析操作者身份
    ///
    /// 头缺失、格式非法与身份不存在统一返回未认证，不泄露差别
    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity_id = parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .ok_or(AccessError::Unauthenticated)?;

        let identity = state
            .identity_repo
            .get_identity(identity_id)
            .await?
            .ok_or(AccessError::Unauthenticated)?;

        Ok(RequestContext::new(identity))
    }
}

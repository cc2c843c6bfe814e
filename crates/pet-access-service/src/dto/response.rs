//! HTTP 响应 DTO 定义

use serde::Serialize;
use uuid::Uuid;

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "OK".to_string(),
            data: Some(data),
        }
    }

    /// 创建成功响应（自定义消息）
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

/// 令牌兑换响应
///
/// `redirect` 是调用方（Web 层）应跳转的目标页面
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResponse {
    pub redirect: &'static str,
    pub pet_id: Uuid,
}

//! 访问授权服务错误类型
//!
//! 定义服务层的业务错误和系统错误，并提供到 HTTP 响应的映射。
//!
//! 令牌的"不存在"与"已过期/已使用"在内部是两个变体（便于日志与指标区分），
//! 但对外返回同一条提示文案，避免调用方据此枚举有效令牌。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// 一次性令牌兑换失败的统一对外文案
pub const TOKEN_REJECTED_MESSAGE: &str = "This link has expired or has already been used.";

/// 访问授权服务错误类型
#[derive(Debug, Error)]
pub enum AccessError {
    // === 资源不存在 ===
    #[error("宠物不存在: {0}")]
    PetNotFound(Uuid),

    #[error("身份不存在: {0}")]
    IdentityNotFound(Uuid),

    // === 授权校验错误 ===
    #[error("Invalid access code.")]
    InvalidCode,

    #[error("{}", TOKEN_REJECTED_MESSAGE)]
    TokenNotFound,

    #[error("{}", TOKEN_REJECTED_MESSAGE)]
    TokenExpired,

    #[error("Your account is not allowed to use this link.")]
    RoleNotAllowed,

    #[error("Authentication required.")]
    Unauthenticated,

    // === 发放内部错误 ===
    #[error("访问码空间耗尽: 连续 {attempts} 次生成均与在用码冲突")]
    CodeSpaceExhausted { attempts: u32 },

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 访问授权服务 Result 类型别名
pub type Result<T> = std::result::Result<T, AccessError>;

impl AccessError {
    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PetNotFound(_) => "PET_NOT_FOUND",
            Self::IdentityNotFound(_) => "IDENTITY_NOT_FOUND",
            Self::InvalidCode => "INVALID_CODE",
            // 两个变体共用一个对外错误码，内部仍可由日志区分
            Self::TokenNotFound | Self::TokenExpired => "TOKEN_REJECTED",
            Self::RoleNotAllowed => "ROLE_NOT_ALLOWED",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::CodeSpaceExhausted { .. } => "INTERNAL_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PetNotFound(_) | Self::IdentityNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidCode | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::TokenNotFound | Self::TokenExpired => StatusCode::GONE,
            Self::RoleNotAllowed => StatusCode::FORBIDDEN,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::CodeSpaceExhausted { .. }
            | Self::Database(_)
            | Self::Serialization(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::CodeSpaceExhausted { .. }
                | Self::Database(_)
                | Self::Serialization(_)
                | Self::Internal(_)
        )
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志，防止信息泄露
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "Internal server error, please try again later.".to_string()
            }
            Self::Serialization(e) => {
                tracing::error!(error = %e, "序列化失败");
                "Internal server error, please try again later.".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "Internal server error, please try again later.".to_string()
            }
            Self::CodeSpaceExhausted { attempts } => {
                tracing::error!(attempts, "访问码生成重试预算耗尽");
                "Internal server error, please try again later.".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for AccessError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    /// 构造错误变体及其期望的 (StatusCode, error_code) 映射。
    /// 表驱动方式保证新增变体时只需在一处维护。
    fn all_error_variants() -> Vec<(AccessError, StatusCode, &'static str)> {
        let pet_id = Uuid::new_v4();
        let identity_id = Uuid::new_v4();
        vec![
            (
                AccessError::PetNotFound(pet_id),
                StatusCode::NOT_FOUND,
                "PET_NOT_FOUND",
            ),
            (
                AccessError::IdentityNotFound(identity_id),
                StatusCode::NOT_FOUND,
                "IDENTITY_NOT_FOUND",
            ),
            (
                AccessError::InvalidCode,
                StatusCode::BAD_REQUEST,
                "INVALID_CODE",
            ),
            (
                AccessError::TokenNotFound,
                StatusCode::GONE,
                "TOKEN_REJECTED",
            ),
            (
                AccessError::TokenExpired,
                StatusCode::GONE,
                "TOKEN_REJECTED",
            ),
            (
                AccessError::RoleNotAllowed,
                StatusCode::FORBIDDEN,
                "ROLE_NOT_ALLOWED",
            ),
            (
                AccessError::Unauthenticated,
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
            ),
            (
                AccessError::CodeSpaceExhausted { attempts: 16 },
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
            (
                AccessError::Validation("bad".into()),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                AccessError::Internal("oom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ]
    }

    #[test]
    fn test_all_variants_status_code() {
        for (error, expected_status, label) in all_error_variants() {
            assert_eq!(
                error.status_code(),
                expected_status,
                "状态码不匹配: variant={label}"
            );
        }
    }

    #[test]
    fn test_all_variants_error_code() {
        for (error, _status, expected_code) in all_error_variants() {
            assert_eq!(
                error.error_code(),
                expected_code,
                "错误码不匹配: expected={expected_code}"
            );
        }
    }

    /// 令牌不存在和令牌过期/已用必须返回完全相同的对外文案，
    /// 否则调用方可以据此区分两种失败原因来枚举有效令牌。
    #[test]
    fn test_token_errors_share_user_message() {
        assert_eq!(
            AccessError::TokenNotFound.to_string(),
            AccessError::TokenExpired.to_string()
        );
        assert_eq!(AccessError::TokenNotFound.to_string(), TOKEN_REJECTED_MESSAGE);
        assert_eq!(
            AccessError::TokenNotFound.error_code(),
            AccessError::TokenExpired.error_code()
        );
        assert_eq!(
            AccessError::TokenNotFound.status_code(),
            AccessError::TokenExpired.status_code()
        );
    }

    #[test]
    fn test_is_business_error() {
        assert!(AccessError::InvalidCode.is_business_error());
        assert!(AccessError::TokenExpired.is_business_error());
        assert!(!AccessError::CodeSpaceExhausted { attempts: 16 }.is_business_error());
        assert!(!AccessError::Internal("x".into()).is_business_error());
    }

    #[tokio::test]
    async fn test_into_response_body_structure() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let label = format!("{:?}", error);
            let response = error.into_response();

            assert_eq!(response.status(), expected_status, "状态码不匹配: {label}");

            let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("读取响应体失败");
            let body: serde_json::Value =
                serde_json::from_slice(&body_bytes).expect("响应体不是合法 JSON");

            assert_eq!(body["success"], json!(false), "success 应为 false: {label}");
            assert_eq!(body["code"], json!(expected_code), "code 不匹配: {label}");
            assert!(
                !body["message"].as_str().unwrap_or("").is_empty(),
                "message 不应为空: {label}"
            );
            assert!(body["data"].is_null(), "data 应为 null: {label}");
        }
    }

    /// 系统级错误的响应消息不应泄露内部细节
    #[tokio::test]
    async fn test_system_errors_hide_internal_details() {
        let error = AccessError::Internal("stack overflow at module X".into());
        let response = error.into_response();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        let message = body["message"].as_str().unwrap();

        assert!(!message.contains("stack overflow"));
        assert!(message.contains("Internal server error"));
    }

    #[test]
    fn test_from_validation_errors() {
        use validator::{ValidationError, ValidationErrors};

        let mut errors = ValidationErrors::new();
        let mut field_error = ValidationError::new("length");
        field_error.message = Some("access code must be 6 digits".into());
        errors.add("access_code", field_error);

        let err: AccessError = errors.into();
        match &err {
            AccessError::Validation(msg) => {
                assert!(msg.contains("access_code"), "转换后应保留字段名: {msg}");
            }
            other => panic!("期望 Validation 变体，实际: {:?}", other),
        }
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}

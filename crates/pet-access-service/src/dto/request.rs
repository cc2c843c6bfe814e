//! HTTP 请求 DTO 定义

use serde::Deserialize;
use validator::Validate;

/// 访问码验证请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyAccessCodeRequest {
    /// 6 位数字访问码
    #[validate(length(min = 6, max = 6, message = "access code must be 6 digits"))]
    pub access_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_request_validation() {
        let valid = VerifyAccessCodeRequest {
            access_code: "483920".to_string(),
        };
        assert!(valid.validate().is_ok());

        let too_short = VerifyAccessCodeRequest {
            access_code: "4839".to_string(),
        };
        assert!(too_short.validate().is_err());

        let too_long = VerifyAccessCodeRequest {
            access_code: "48392011".to_string(),
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_verify_request_deserializes_camel_case() {
        let request: VerifyAccessCodeRequest =
            serde_json::from_value(serde_json::json!({"accessCode": "483920"})).unwrap();
        assert_eq!(request.access_code, "483920");
    }
}

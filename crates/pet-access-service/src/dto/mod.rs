//! HTTP 层 DTO 模块
//!
//! 包含请求与响应的数据传输对象

pub mod request;
pub mod response;

pub use request::VerifyAccessCodeRequest;
pub use response::{ApiResponse, RedeemResponse};

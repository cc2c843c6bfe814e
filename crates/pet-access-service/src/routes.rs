//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// 构建授权发放路由（宠物主人侧）
fn issue_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/pets/{pet_id}/access-code",
            post(handlers::issue::issue_access_code),
        )
        .route(
            "/pets/{pet_id}/share-token",
            post(handlers::issue::issue_share_token),
        )
        .route(
            "/pets/{pet_id}/vet-token",
            post(handlers::issue::issue_vet_token),
        )
}

/// 构建授权兑换路由（诊所与受邀主人侧）
fn redeem_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/access-codes/verify",
            post(handlers::redeem::verify_access_code),
        )
        .route(
            "/tokens/share/{token}/redeem",
            post(handlers::redeem::redeem_share_token),
        )
        .route(
            "/tokens/vet/{token}/redeem",
            post(handlers::redeem::redeem_vet_token),
        )
}

/// 构建完整的 API 路由
///
/// 返回所有 API 路由（不含前缀，由调用方在 main.rs 中挂载）
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(issue_routes())
        .merge(redeem_routes())
        .route("/healthz", get(handlers::health::healthz))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_construction() {
        let _issue = issue_routes();
        let _redeem = redeem_routes();
        let _api = api_routes();
    }
}

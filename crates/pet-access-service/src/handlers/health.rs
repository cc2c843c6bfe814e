//! 健康检查处理器

use axum::Json;
use axum::extract::State;

use crate::dto::ApiResponse;
use crate::error::Result;
use crate::state::AppState;

/// 存活检查
///
/// GET /api/healthz
///
/// 带数据库 ping：连接池不可用时返回 500
pub async fn healthz(State(state): State<AppState>) -> Result<Json<ApiResponse<&'static str>>> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;

    Ok(Json(ApiResponse::success("ok")))
}

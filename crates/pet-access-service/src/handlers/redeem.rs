//! 授权兑换 API 处理器
//!
//! 访问码验证与一次性令牌兑换的入口。响应中的 `redirect`
//! 告诉 Web 层兑换成功后应跳转的页面。

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;
use validator::Validate;

use crate::dto::{ApiResponse, RedeemResponse, VerifyAccessCodeRequest};
use crate::error::{AccessError, Result};
use crate::models::PetSummary;
use crate::service::RequestContext;
use crate::state::AppState;

/// 令牌路径参数解析
///
/// 非法 UUID 与不存在的令牌返回同一条文案，避免格式探测
fn parse_token(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AccessError::TokenNotFound)
}

/// 验证访问码
///
/// POST /api/access-codes/verify
///
/// 成功时授予 10 分钟诊所访问并返回宠物摘要；
/// 查不到码时不区分"从未发放"与"已过期"
pub async fn verify_access_code(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<VerifyAccessCodeRequest>,
) -> Result<Json<ApiResponse<PetSummary>>> {
    request.validate()?;

    let summary = state
        .redeem_service
        .verify_access_code(&request.access_code, &ctx)
        .await?;

    Ok(Json(ApiResponse::success(summary)))
}

/// 兑换分享令牌
///
/// POST /api/tokens/share/{token}/redeem
///
/// 主人角色获得共同所有权，诊所角色获得临时访问；
/// 两种结果都跳转宠物详情页
pub async fn redeem_share_token(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<RedeemResponse>>> {
    let token = parse_token(&token)?;

    let redemption = state.redeem_service.redeem_share_token(token, &ctx).await?;

    Ok(Json(ApiResponse::success(RedeemResponse {
        redirect: "pet-details",
        pet_id: redemption.pet.id,
    })))
}

/// 兑换诊所快速入口令牌
///
/// POST /api/tokens/vet/{token}/redeem
///
/// 兑换成功后跳转检查录入流程
pub async fn redeem_vet_token(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<RedeemResponse>>> {
    let token = parse_token(&token)?;

    let pet = state.redeem_service.redeem_vet_token(token, &ctx).await?;

    Ok(Json(ApiResponse::success(RedeemResponse {
        redirect: "exam-entry",
        pet_id: pet.id,
    })))
}

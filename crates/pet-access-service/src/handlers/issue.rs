//! 授权发放 API 处理器
//!
//! 访问码与一次性令牌的发放入口。三个端点都要求操作者
//! 是该宠物的主人——发放授权等同于对外开放宠物的医疗记录。

use axum::Json;
use axum::extract::{Path, State};
use tracing::info;
use uuid::Uuid;

use crate::dto::ApiResponse;
use crate::error::{AccessError, Result};
use crate::models::IdentityRole;
use crate::service::{IssuedCode, IssuedToken, RequestContext};
use crate::state::AppState;

/// 校验操作者是该宠物的主人
async fn ensure_owner_of(state: &AppState, ctx: &RequestContext, pet_id: Uuid) -> Result<()> {
    if ctx.role() != IdentityRole::Owner {
        return Err(AccessError::RoleNotAllowed);
    }

    if !state.pet_repo.is_owner(pet_id, ctx.identity_id()).await? {
        return Err(AccessError::RoleNotAllowed);
    }

    Ok(())
}

/// 发放或复用访问码
///
/// POST /api/pets/{pet_id}/access-code
///
/// 幂等：窗口内重复调用（如页面刷新）返回同一码
pub async fn issue_access_code(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(pet_id): Path<Uuid>,
) -> Result<Json<ApiResponse<IssuedCode>>> {
    ensure_owner_of(&state, &ctx, pet_id).await?;

    let issued = state.issue_service.issue_or_reuse_code(pet_id).await?;

    info!(
        pet_id = %pet_id,
        owner_id = %ctx.identity_id(),
        reused = issued.reused,
        "访问码发放请求完成"
    );

    Ok(Json(ApiResponse::success(issued)))
}

/// 发放分享令牌
///
/// POST /api/pets/{pet_id}/share-token
///
/// 总是新建；同一宠物的多个分享链接可以并存
pub async fn issue_share_token(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(pet_id): Path<Uuid>,
) -> Result<Json<ApiResponse<IssuedToken>>> {
    ensure_owner_of(&state, &ctx, pet_id).await?;

    let issued = state.issue_service.issue_share_token(pet_id).await?;

    Ok(Json(ApiResponse::success(issued)))
}

/// 发放诊所快速入口令牌
///
/// POST /api/pets/{pet_id}/vet-token
pub async fn issue_vet_token(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(pet_id): Path<Uuid>,
) -> Result<Json<ApiResponse<IssuedToken>>> {
    ensure_owner_of(&state, &ctx, pet_id).await?;

    let issued = state.issue_service.issue_vet_token(pet_id).await?;

    Ok(Json(ApiResponse::success(issued)))
}

use crate::api::error::AppError;
use crate::models::{Capability, Principal};
use crate::utils::auth::{Claims, validate_jwt};
use crate::{AppState, entities::prelude::Users};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use sea_orm::EntityTrait;

pub const MISSING_TOKEN: &str = "访问被拒绝，未提供认证令牌";
pub const INVALID_TOKEN: &str = "无效的认证令牌";
pub const INSUFFICIENT_ROLE: &str = "权限不足，无法访问此资源";

/// Accepts `Authorization: Bearer <token>` and, for older clients, the raw
/// token as the whole header value.
fn bearer_token(req: &Request) -> Option<&str> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?
        .trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or_else(|| AppError::Unauthorized(MISSING_TOKEN.to_string()))?;

    let claims = validate_jwt(token, &state.config.jwt_secret).map_err(|e| {
        tracing::debug!("Token rejected: {}", e);
        AppError::Unauthorized(INVALID_TOKEN.to_string())
    })?;

    // Tokens outlive deleted accounts.
    let user_exists = Users::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .is_some();
    if !user_exists {
        return Err(AppError::Unauthorized(INVALID_TOKEN.to_string()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// The caller's principal, provided it holds `capability`.
pub fn require(claims: &Claims, capability: Capability) -> Result<Principal, AppError> {
    let principal = claims.principal();
    if principal.can(capability) {
        Ok(principal)
    } else {
        Err(AppError::Forbidden(INSUFFICIENT_ROLE.to_string()))
    }
}

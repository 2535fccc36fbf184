use crate::AppState;
use crate::api::error::AppError;
use crate::services::user_service::{LoginRequest, RegisterRequest, UserService};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = crate::services::user_service::AuthSession),
        (status = 400, description = "Invalid input or username taken")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = UserService::register(&state.db, &state.config, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "用户注册成功",
            "token": session.token,
            "user": session.user,
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = crate::services::user_service::AuthSession),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = UserService::login(&state.db, &state.config, payload).await?;
    Ok(Json(json!({
        "message": "登录成功",
        "token": session.token,
        "user": session.user,
    })))
}

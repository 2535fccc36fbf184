use crate::AppState;
use crate::api::error::AppError;
use crate::api::middleware::auth::require;
use crate::models::Capability;
use crate::services::user_service::{CreateUserRequest, UpdateUserRequest, UserListQuery, UserService};
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "One page of users with case counts", body = crate::services::user_service::UserPage),
        (status = 403, description = "Admins only")
    ),
    security(("jwt" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse, AppError> {
    require(&claims, Capability::ManageUsers)?;
    let page = UserService::list(&state.db, &query).await?;
    Ok(Json(json!({
        "message": "获取用户列表成功",
        "users": page.users,
        "pagination": page.pagination,
    })))
}

#[utoipa::path(
    get,
    path = "/api/users/stats/overview",
    responses(
        (status = 200, description = "Role counts and recent registrations", body = crate::services::user_service::UserOverview),
        (status = 403, description = "Admins only")
    ),
    security(("jwt" = [])),
    tag = "users"
)]
pub async fn stats_overview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    require(&claims, Capability::ManageUsers)?;
    let stats = UserService::overview(&state.db).await?;
    Ok(Json(json!({
        "message": "获取用户统计成功",
        "stats": stats,
    })))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User with case statistics", body = crate::services::user_service::UserDetail),
        (status = 403, description = "Admins only"),
        (status = 404, description = "User not found")
    ),
    security(("jwt" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    require(&claims, Capability::ManageUsers)?;
    let user = UserService::get_with_stats(&state.db, id).await?;
    Ok(Json(json!({
        "message": "获取用户详情成功",
        "user": user,
    })))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = crate::services::user_service::UserSummary),
        (status = 400, description = "Validation failed or username taken"),
        (status = 403, description = "Admins only")
    ),
    security(("jwt" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&claims, Capability::ManageUsers)?;
    let user = UserService::create(&state.db, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "用户创建成功",
            "user": user,
        })),
    ))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = crate::services::user_service::UserSummary),
        (status = 400, description = "Validation failed, last admin or nothing to update"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "User not found")
    ),
    security(("jwt" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&claims, Capability::ManageUsers)?;
    let user = UserService::update(&state.db, id, req).await?;
    Ok(Json(json!({
        "message": "用户信息更新成功",
        "user": user,
    })))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Self, last admin, or user still owns cases"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "User not found")
    ),
    security(("jwt" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let principal = require(&claims, Capability::ManageUsers)?;
    let user = UserService::delete(&state.db, id, principal.user_id).await?;
    Ok(Json(json!({
        "message": "用户删除成功",
        "deletedUser": {
            "id": user.id,
            "username": user.username,
        },
    })))
}

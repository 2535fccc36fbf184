use crate::AppState;
use crate::api::error::AppError;
use crate::api::middleware::auth::require;
use crate::models::Capability;
use crate::services::config_service::{ConfigService, CreateConfigRequest, UpdateConfigRequest};
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/config",
    responses(
        (status = 200, description = "Active taxonomy entries grouped by type")
    ),
    tag = "config"
)]
pub async fn list_active(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let configs = ConfigService::grouped_active(&state.db).await?;
    Ok(Json(json!({
        "message": "获取配置选项成功",
        "configs": configs,
    })))
}

#[utoipa::path(
    get,
    path = "/api/config/{config_type}",
    params(("config_type" = String, Path, description = "industry, language, case_type, subject, target_audience")),
    responses(
        (status = 200, description = "Active entries of one type", body = [crate::services::config_service::ConfigOption])
    ),
    tag = "config"
)]
pub async fn list_by_type(
    State(state): State<AppState>,
    Path(config_type): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let options = ConfigService::active_of_type(&state.db, &config_type).await?;
    Ok(Json(json!({
        "message": "获取配置选项成功",
        "options": options,
    })))
}

#[utoipa::path(
    get,
    path = "/api/config/admin/all",
    responses(
        (status = 200, description = "Every entry, inactive ones included", body = [crate::services::config_service::ConfigEntry]),
        (status = 403, description = "Admins only")
    ),
    security(("jwt" = [])),
    tag = "config"
)]
pub async fn list_all(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    require(&claims, Capability::ManageTaxonomy)?;
    let configs = ConfigService::all_entries(&state.db).await?;
    Ok(Json(json!({
        "message": "获取所有配置成功",
        "configs": configs,
    })))
}

#[utoipa::path(
    post,
    path = "/api/config",
    request_body = CreateConfigRequest,
    responses(
        (status = 201, description = "Entry created", body = crate::services::config_service::ConfigEntry),
        (status = 400, description = "Missing fields or duplicate entry"),
        (status = 403, description = "Admins only")
    ),
    security(("jwt" = [])),
    tag = "config"
)]
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&claims, Capability::ManageTaxonomy)?;
    let config = ConfigService::create(&state.db, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "配置选项添加成功",
            "config": config,
        })),
    ))
}

#[utoipa::path(
    put,
    path = "/api/config/{id}",
    params(("id" = i32, Path, description = "Entry ID")),
    request_body = UpdateConfigRequest,
    responses(
        (status = 200, description = "Entry updated", body = crate::services::config_service::ConfigEntry),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Entry not found")
    ),
    security(("jwt" = [])),
    tag = "config"
)]
pub async fn update_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&claims, Capability::ManageTaxonomy)?;
    let config = ConfigService::update(&state.db, id, req).await?;
    Ok(Json(json!({
        "message": "配置选项更新成功",
        "config": config,
    })))
}

#[utoipa::path(
    delete,
    path = "/api/config/{id}",
    params(("id" = i32, Path, description = "Entry ID")),
    responses(
        (status = 200, description = "Entry deleted"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Entry not found")
    ),
    security(("jwt" = [])),
    tag = "config"
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    require(&claims, Capability::ManageTaxonomy)?;
    ConfigService::delete(&state.db, id).await?;
    Ok(Json(json!({ "message": "配置选项删除成功" })))
}

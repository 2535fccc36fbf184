use crate::AppState;
use crate::api::error::AppError;
use crate::api::handlers::payload::CasePayload;
use crate::services::case_service::CaseFilter;
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
    path = "/api/cases",
    params(CaseFilter),
    responses(
        (status = 200, description = "Matching cases, newest first", body = [crate::services::case_service::CaseResponse])
    ),
    tag = "cases"
)]
pub async fn list_cases(
    State(state): State<AppState>,
    Query(filter): Query<CaseFilter>,
) -> Result<impl IntoResponse, AppError> {
    let cases = state.case_service.list_cases(&filter).await?;
    Ok(Json(json!({
        "message": "获取案例列表成功",
        "cases": cases,
    })))
}

#[utoipa::path(
    get,
    path = "/api/cases/filter-options",
    responses(
        (status = 200, description = "Values currently in use", body = crate::services::case_service::FilterOptions)
    ),
    tag = "cases"
)]
pub async fn filter_options(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let options = state.case_service.filter_options().await?;
    Ok(Json(json!({
        "message": "获取筛选选项成功",
        "options": options,
    })))
}

#[utoipa::path(
    get,
    path = "/api/cases/{id}",
    params(("id" = i32, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Case detail", body = crate::services::case_service::CaseResponse),
        (status = 404, description = "Case not found")
    ),
    tag = "cases"
)]
pub async fn get_case(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let case = state.case_service.get_case(id).await?;
    Ok(Json(json!({
        "message": "获取案例详情成功",
        "case": case,
    })))
}

#[utoipa::path(
    post,
    path = "/api/cases",
    request_body(content = crate::services::case_service::CaseInput, description = "JSON, or multipart form with `attachments` file parts"),
    responses(
        (status = 201, description = "Case created", body = crate::services::case_service::CaseResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only teachers and admins may create cases")
    ),
    security(("jwt" = [])),
    tag = "cases"
)]
pub async fn create_case(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: CasePayload,
) -> Result<impl IntoResponse, AppError> {
    let case = state
        .case_service
        .create_case(&claims.principal(), payload.input, payload.files)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "案例创建成功",
            "case": case,
        })),
    ))
}

#[utoipa::path(
    put,
    path = "/api/cases/{id}",
    params(("id" = i32, Path, description = "Case ID")),
    request_body(content = crate::services::case_service::CaseInput, description = "Full replacement; JSON or multipart"),
    responses(
        (status = 200, description = "Case updated", body = crate::services::case_service::CaseResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not the author or an admin"),
        (status = 404, description = "Case not found")
    ),
    security(("jwt" = [])),
    tag = "cases"
)]
pub async fn update_case(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    payload: CasePayload,
) -> Result<impl IntoResponse, AppError> {
    let case = state
        .case_service
        .update_case(id, &claims.principal(), payload.input, payload.files)
        .await?;

    Ok(Json(json!({
        "message": "案例更新成功",
        "case": case,
    })))
}

#[utoipa::path(
    delete,
    path = "/api/cases/{id}",
    params(("id" = i32, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Case deleted"),
        (status = 403, description = "Not the author or an admin"),
        (status = 404, description = "Case not found")
    ),
    security(("jwt" = [])),
    tag = "cases"
)]
pub async fn delete_case(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state
        .case_service
        .delete_case(id, &claims.principal())
        .await?;
    Ok(Json(json!({ "message": "案例删除成功" })))
}

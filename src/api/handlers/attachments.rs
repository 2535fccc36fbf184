use crate::AppState;
use crate::api::error::AppError;
use crate::api::handlers::payload::AttachmentUpload;
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/cases/{id}/attachments",
    params(("id" = i32, Path, description = "Case ID")),
    request_body(content = Vec<u8>, description = "Multipart form with `attachments` file parts", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Persisted attachments", body = [crate::models::AttachmentView]),
        (status = 400, description = "No files or a rejected file"),
        (status = 403, description = "Not the author or an admin"),
        (status = 404, description = "Case not found")
    ),
    security(("jwt" = [])),
    tag = "attachments"
)]
pub async fn add_attachments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    AttachmentUpload(files): AttachmentUpload,
) -> Result<impl IntoResponse, AppError> {
    let attachments = state
        .case_service
        .add_attachments(id, &claims.principal(), files)
        .await?;

    Ok(Json(json!({
        "message": "附件添加成功",
        "attachments": attachments,
    })))
}

#[utoipa::path(
    delete,
    path = "/api/cases/{id}/attachments/{attachment_id}",
    params(
        ("id" = i32, Path, description = "Case ID"),
        ("attachment_id" = i32, Path, description = "Attachment ID")
    ),
    responses(
        (status = 200, description = "Attachment deleted"),
        (status = 403, description = "Not the author or an admin"),
        (status = 404, description = "Case or attachment not found")
    ),
    security(("jwt" = [])),
    tag = "attachments"
)]
pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, attachment_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .case_service
        .delete_attachment(id, attachment_id, &claims.principal())
        .await?;
    Ok(Json(json!({ "message": "附件删除成功" })))
}

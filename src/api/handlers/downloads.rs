use crate::AppState;
use crate::api::error::AppError;
use crate::services::storage::validate_key;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use utoipa::IntoParams;

pub const FILE_NOT_FOUND: &str = "文件不存在";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Filename offered to the browser; defaults to the stored name
    pub name: Option<String>,
}

/// `attachment` disposition with an ASCII fallback plus the RFC 5987 form,
/// so non-ASCII original names survive.
pub(crate) fn content_disposition(filename: &str) -> String {
    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .take(64)
        .collect::<String>();
    let fallback_filename = if ascii_filename.is_empty() {
        "file"
    } else {
        &ascii_filename
    };

    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_filename, encoded_filename
    )
}

#[utoipa::path(
    get,
    path = "/attachments/{name}",
    params(
        ("name" = String, Path, description = "Stored filename"),
        DownloadQuery
    ),
    responses(
        (status = 200, description = "File content stream"),
        (status = 404, description = "File not found")
    ),
    tag = "attachments"
)]
pub async fn download_attachment(
    State(state): State<AppState>,
    Path(stored_name): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    if validate_key(&stored_name).is_err() {
        return Err(AppError::NotFound(FILE_NOT_FOUND.to_string()));
    }

    if !state.storage.file_exists(&stored_name).await? {
        return Err(AppError::NotFound(FILE_NOT_FOUND.to_string()));
    }

    let reader = state.storage.open_file(&stored_name).await?;
    let download_name = query
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| stored_name.clone());

    let content_type = mime_guess::from_path(&stored_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let disposition = HeaderValue::from_str(&content_disposition(&download_name))
        .map_err(|e| AppError::Internal(format!("Invalid Content-Disposition: {}", e)))?;

    tracing::debug!("📥 Streaming {} as {}", stored_name, download_name);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\"; filename*=UTF-8''report%2Epdf"
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let value = content_disposition("案例.pdf");
        assert!(value.starts_with("attachment; filename=\".pdf\""));
        assert!(value.contains("filename*=UTF-8''%E6%A1%88%E4%BE%8B%2Epdf"));

        let value = content_disposition("报告");
        assert!(value.contains("filename=\"file\""));
    }
}

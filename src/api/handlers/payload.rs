//! Request bodies for case writes: multipart forms with files, or plain
//! JSON without them.

use crate::api::error::AppError;
use crate::models::TagInput;
use crate::services::case_service::{CaseInput, UploadedFile};
use axum::{
    Json,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use std::collections::HashMap;

pub const ATTACHMENT_FIELD: &str = "attachments";

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.parse::<mime::Mime>().ok())
        .is_some_and(|m| m.essence_str() == mime::MULTIPART_FORM_DATA.essence_str())
}

/// Text parts and file parts of a multipart body.
#[derive(Debug, Default)]
struct FormParts {
    /// Values per field name, with a trailing `[]` stripped
    text: HashMap<String, Vec<String>>,
    /// Field names that were sent in `name[]` form
    bracketed: Vec<String>,
    files: Vec<UploadedFile>,
}

impl FormParts {
    fn scalar(&mut self, name: &str) -> Option<String> {
        self.text.remove(name).and_then(|values| values.into_iter().last())
    }

    /// A tag field sent once is free text, sent repeatedly or as `name[]`
    /// it is a list.
    fn tags(&mut self, name: &str) -> Option<TagInput> {
        let values = self.text.remove(name)?;
        let bracketed = self.bracketed.iter().any(|b| b == name);
        match values.len() {
            1 if !bracketed => values.into_iter().next().map(TagInput::Text),
            _ => Some(TagInput::List(values)),
        }
    }

    fn into_case_input(mut self) -> (CaseInput, Vec<UploadedFile>) {
        let input = CaseInput {
            title: self.scalar("title"),
            content: self.scalar("content"),
            summary: self.scalar("summary"),
            industry: self.scalar("industry"),
            language: self.scalar("language"),
            case_type: self.scalar("case_type"),
            subject: self.scalar("subject"),
            target_audience: self.scalar("target_audience"),
            knowledge_points: self.tags("knowledge_points"),
            teaching_points: self.tags("teaching_points"),
            tags: self.tags("tags"),
        };
        (input, self.files)
    }
}

async fn read_form(mut multipart: Multipart) -> Result<FormParts, AppError> {
    let mut parts = FormParts::default();

    while let Some(field) = multipart.next_field().await? {
        let raw_name = field.name().unwrap_or_default().to_string();
        let (name, bracketed) = match raw_name.strip_suffix("[]") {
            Some(stripped) => (stripped.to_string(), true),
            None => (raw_name, false),
        };

        if name == ATTACHMENT_FIELD {
            let Some(original_name) = field.file_name().map(str::to_string) else {
                continue;
            };
            if original_name.is_empty() {
                continue;
            }
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await?;
            parts.files.push(UploadedFile {
                original_name,
                content_type,
                data,
            });
            continue;
        }

        let value = field.text().await?;
        if bracketed && !parts.bracketed.contains(&name) {
            parts.bracketed.push(name.clone());
        }
        parts.text.entry(name).or_default().push(value);
    }

    Ok(parts)
}

/// Case fields plus any uploaded files.
#[derive(Debug)]
pub struct CasePayload {
    pub input: CaseInput,
    pub files: Vec<UploadedFile>,
}

#[axum::async_trait]
impl<S> FromRequest<S> for CasePayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(format!("上传数据格式错误: {}", e.body_text())))?;
            let (input, files) = read_form(multipart).await?.into_case_input();
            return Ok(Self { input, files });
        }

        let Json(input) = Json::<CaseInput>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(format!("请求数据格式错误: {}", e.body_text())))?;
        Ok(Self {
            input,
            files: Vec::new(),
        })
    }
}

/// Only the `attachments` file parts of a multipart body.
#[derive(Debug)]
pub struct AttachmentUpload(pub Vec<UploadedFile>);

#[axum::async_trait]
impl<S> FromRequest<S> for AttachmentUpload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            return Ok(Self(Vec::new()));
        }
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(format!("上传数据格式错误: {}", e.body_text())))?;
        Ok(Self(read_form(multipart).await?.files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(fields: &[(&str, &str)], bracketed: &[&str]) -> FormParts {
        let mut parts = FormParts::default();
        for (name, value) in fields {
            parts
                .text
                .entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
        parts.bracketed = bracketed.iter().map(|b| b.to_string()).collect();
        parts
    }

    #[test]
    fn test_single_tag_field_is_text() {
        let (input, _) = parts(&[("tags", "a,b")], &[]).into_case_input();
        assert!(matches!(input.tags, Some(TagInput::Text(ref t)) if t == "a,b"));
    }

    #[test]
    fn test_repeated_or_bracketed_tag_field_is_list() {
        let (input, _) = parts(&[("tags", "a"), ("tags", "b")], &[]).into_case_input();
        assert!(matches!(input.tags, Some(TagInput::List(ref v)) if v == &["a", "b"]));

        let (input, _) = parts(&[("knowledge_points", "only")], &["knowledge_points"]).into_case_input();
        assert!(matches!(input.knowledge_points, Some(TagInput::List(ref v)) if v == &["only"]));
    }

    #[test]
    fn test_scalar_fields_and_absent_tags() {
        let (input, files) = parts(&[("title", "Hello"), ("industry", "finance")], &[]).into_case_input();
        assert_eq!(input.title.as_deref(), Some("Hello"));
        assert_eq!(input.industry.as_deref(), Some("finance"));
        assert!(input.teaching_points.is_none());
        assert!(files.is_empty());
    }
}

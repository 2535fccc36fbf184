use crate::entities::{case_attachments, cases};
use crate::models::{AttachmentView, TagInput, decode_tags, project_attachments};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_LANGUAGE: &str = "zh-CN";

/// Case fields as submitted on create and update. Update is a full
/// replace, so every omitted optional field resets to its default.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CaseInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub industry: Option<String>,
    pub language: Option<String>,
    pub case_type: Option<String>,
    pub subject: Option<String>,
    pub target_audience: Option<String>,
    pub knowledge_points: Option<TagInput>,
    pub teaching_points: Option<TagInput>,
    pub tags: Option<TagInput>,
}

impl CaseInput {
    pub fn language_or_default(&self) -> String {
        self.language
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
    }
}

/// A file received in the request body, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A file whose bytes are in storage but which may not have a row yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub stored_name: String,
    pub original_name: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CaseFilter {
    pub industry: Option<String>,
    pub language: Option<String>,
    pub case_type: Option<String>,
    pub subject: Option<String>,
    pub target_audience: Option<String>,
    /// Matches cases whose `knowledge_points` contain this value
    pub knowledge_point: Option<String>,
    /// Matches cases whose `teaching_points` contain this value
    pub teaching_point: Option<String>,
    /// Matches cases whose `tags` contain this value
    pub tag: Option<String>,
    /// Substring of title, content, summary or author name
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CaseResponse {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub industry: String,
    pub language: String,
    pub case_type: String,
    pub subject: String,
    pub knowledge_points: Vec<String>,
    pub target_audience: String,
    pub teaching_points: Vec<String>,
    pub tags: Vec<String>,
    pub author_id: i32,
    pub author_name: Option<String>,
    pub attachment_filename: Option<String>,
    pub attachment_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attachments: Vec<AttachmentView>,
}

impl CaseResponse {
    /// Read-side assembly: tag columns decoded, both attachment generations
    /// projected into one list.
    pub fn from_model(
        case: cases::Model,
        author_name: Option<String>,
        rows: Vec<case_attachments::Model>,
    ) -> Self {
        let attachments = project_attachments(&case, rows);
        Self {
            id: case.id,
            knowledge_points: decode_tags(case.knowledge_points.as_deref()),
            teaching_points: decode_tags(case.teaching_points.as_deref()),
            tags: decode_tags(case.tags.as_deref()),
            title: case.title,
            content: case.content,
            summary: case.summary.unwrap_or_default(),
            industry: case.industry.unwrap_or_default(),
            language: case
                .language
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            case_type: case.case_type.unwrap_or_default(),
            subject: case.subject.unwrap_or_default(),
            target_audience: case.target_audience.unwrap_or_default(),
            author_id: case.author_id,
            author_name,
            attachment_filename: case.attachment_filename,
            attachment_path: case.attachment_path,
            created_at: case.created_at,
            updated_at: case.updated_at,
            attachments,
        }
    }
}

/// Distinct values currently in use, for building filter menus.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub industries: Vec<String>,
    pub languages: Vec<String>,
    pub case_types: Vec<String>,
    pub subjects: Vec<String>,
    pub target_audiences: Vec<String>,
    pub knowledge_points: Vec<String>,
    pub teaching_points: Vec<String>,
    pub tags: Vec<String>,
}

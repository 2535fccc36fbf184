use crate::entities::{case_attachments, cases};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Attachment descriptor as returned by the API.
///
/// `original_name` and `mime_type` come straight from the uploading client
/// and are display-only.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttachmentView {
    /// `None` for a legacy single attachment that has no table row.
    pub id: Option<i32>,
    pub filename: String,
    pub original_name: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub legacy: bool,
}

impl From<case_attachments::Model> for AttachmentView {
    fn from(row: case_attachments::Model) -> Self {
        Self {
            id: Some(row.id),
            filename: row.filename,
            original_name: row.original_name,
            file_size: row.file_size,
            mime_type: row.mime_type,
            created_at: Some(row.created_at),
            legacy: false,
        }
    }
}

/// Where a case's attachments live. Rows written before the attachment table
/// existed only carry the single-file column pair on the case itself.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentSource {
    Table(Vec<case_attachments::Model>),
    Legacy {
        original_name: String,
        stored_name: String,
    },
    Empty,
}

impl AttachmentSource {
    pub fn resolve(case: &cases::Model, rows: Vec<case_attachments::Model>) -> Self {
        if !rows.is_empty() {
            return Self::Table(rows);
        }

        match (&case.attachment_filename, &case.attachment_path) {
            (Some(original), Some(stored)) if !stored.is_empty() => Self::Legacy {
                original_name: original.clone(),
                stored_name: stored.clone(),
            },
            _ => Self::Empty,
        }
    }

    pub fn into_views(self) -> Vec<AttachmentView> {
        match self {
            Self::Table(rows) => rows.into_iter().map(AttachmentView::from).collect(),
            Self::Legacy {
                original_name,
                stored_name,
            } => vec![AttachmentView {
                id: None,
                filename: stored_name,
                original_name,
                file_size: None,
                mime_type: None,
                created_at: None,
                legacy: true,
            }],
            Self::Empty => Vec::new(),
        }
    }
}

/// The single read-time view over both attachment generations.
pub fn project_attachments(
    case: &cases::Model,
    rows: Vec<case_attachments::Model>,
) -> Vec<AttachmentView> {
    AttachmentSource::resolve(case, rows).into_views()
}

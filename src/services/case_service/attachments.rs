use crate::api::error::AppError;
use crate::entities::{case_attachments, cases, prelude::*};
use crate::models::{AttachmentView, Principal};
use crate::utils::validation::{file_extension, generate_stored_filename};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use super::{CASE_NOT_FOUND, CaseService, FORBIDDEN_MODIFY, StoredUpload, UploadedFile};

pub const NO_FILES_SELECTED: &str = "请选择要上传的附件";
pub const ATTACHMENT_NOT_FOUND: &str = "附件不存在";

impl CaseService {
    /// Rejects a batch before anything is written: too many files, an
    /// oversized file or an extension outside the allowlist.
    pub fn check_uploads(&self, files: &[UploadedFile]) -> Result<(), AppError> {
        if files.len() > self.config.max_files {
            return Err(AppError::BadRequest(format!(
                "一次最多上传{}个附件",
                self.config.max_files
            )));
        }

        for file in files {
            if file.data.len() > self.config.max_file_size {
                return Err(AppError::BadRequest(format!(
                    "附件 {} 超过大小限制（{}MB）",
                    file.original_name,
                    self.config.max_file_size / (1024 * 1024)
                )));
            }

            let allowed = file_extension(&file.original_name)
                .is_some_and(|ext| self.config.is_extension_allowed(&ext));
            if !allowed {
                return Err(AppError::BadRequest(format!(
                    "不支持的文件类型: {}",
                    file.original_name
                )));
            }
        }

        Ok(())
    }

    /// Writes each file under a fresh stored name. A file whose write fails
    /// is logged and dropped from the batch.
    pub(crate) async fn store_uploads(&self, files: Vec<UploadedFile>) -> Vec<StoredUpload> {
        let mut stored = Vec::with_capacity(files.len());

        for file in files {
            let stored_name = generate_stored_filename(&file.original_name);
            match self.storage.save_file(&stored_name, &file.data).await {
                Ok(()) => stored.push(StoredUpload {
                    stored_name,
                    original_name: file.original_name,
                    mime_type: file.content_type,
                }),
                Err(e) => {
                    tracing::warn!("⚠️  Failed to store upload {}: {}", file.original_name, e);
                }
            }
        }

        stored
    }

    /// Records one attachment row per stored file. When the stat or the
    /// insert fails the file's bytes are removed and the next file is tried.
    pub(crate) async fn record_attachments(
        &self,
        case_id: i32,
        uploads: &[StoredUpload],
    ) -> Vec<case_attachments::Model> {
        let mut persisted = Vec::with_capacity(uploads.len());

        for upload in uploads {
            let file_size = match self.storage.file_size(&upload.stored_name).await {
                Ok(size) => size as i64,
                Err(e) => {
                    tracing::warn!(
                        "⚠️  Could not stat {} for case {}: {}",
                        upload.stored_name,
                        case_id,
                        e
                    );
                    self.storage.remove_if_exists(&upload.stored_name).await;
                    continue;
                }
            };

            let row = case_attachments::ActiveModel {
                case_id: Set(case_id),
                filename: Set(upload.stored_name.clone()),
                original_name: Set(upload.original_name.clone()),
                file_path: Set(upload.stored_name.clone()),
                file_size: Set(Some(file_size)),
                mime_type: Set(upload.mime_type.clone()),
                created_at: Set(Utc::now()),
                ..Default::default()
            };

            match row.insert(&self.db).await {
                Ok(model) => persisted.push(model),
                Err(e) => {
                    tracing::warn!(
                        "⚠️  Failed to record attachment {} for case {}: {}",
                        upload.original_name,
                        case_id,
                        e
                    );
                    self.storage.remove_if_exists(&upload.stored_name).await;
                }
            }
        }

        persisted
    }

    /// Points the legacy column pair at `row`, or clears it. A no-op when
    /// the case already matches.
    pub(crate) async fn set_legacy_pair(
        &self,
        case: cases::Model,
        row: Option<&case_attachments::Model>,
    ) -> Result<cases::Model, AppError> {
        let filename = row.map(|r| r.original_name.clone());
        let path = row.map(|r| r.file_path.clone());
        if case.attachment_filename == filename && case.attachment_path == path {
            return Ok(case);
        }

        let mut active: cases::ActiveModel = case.into();
        active.attachment_filename = Set(filename);
        active.attachment_path = Set(path);
        Ok(active.update(&self.db).await?)
    }

    pub(crate) async fn attachment_rows(
        &self,
        case_id: i32,
    ) -> Result<Vec<case_attachments::Model>, AppError> {
        Ok(CaseAttachments::find()
            .filter(case_attachments::Column::CaseId.eq(case_id))
            .order_by_asc(case_attachments::Column::CreatedAt)
            .order_by_asc(case_attachments::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Loads a case the principal may modify: 404 before 403.
    pub(crate) async fn find_modifiable(
        &self,
        case_id: i32,
        principal: &Principal,
        forbidden: &str,
    ) -> Result<cases::Model, AppError> {
        let case = Cases::find_by_id(case_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(CASE_NOT_FOUND.to_string()))?;

        if !principal.can_modify_case(case.author_id) {
            return Err(AppError::Forbidden(forbidden.to_string()));
        }

        Ok(case)
    }

    /// Adds files to an existing case. The legacy attachment columns are
    /// left as they are.
    pub async fn add_attachments(
        &self,
        case_id: i32,
        principal: &Principal,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<AttachmentView>, AppError> {
        if files.is_empty() {
            return Err(AppError::BadRequest(NO_FILES_SELECTED.to_string()));
        }

        self.find_modifiable(case_id, principal, FORBIDDEN_MODIFY)
            .await?;
        self.check_uploads(&files)?;

        let stored = self.store_uploads(files).await;
        let rows = self.record_attachments(case_id, &stored).await;

        tracing::info!(
            "📎 Added {} attachment(s) to case {}",
            rows.len(),
            case_id
        );

        Ok(rows.into_iter().map(AttachmentView::from).collect())
    }

    pub async fn delete_attachment(
        &self,
        case_id: i32,
        attachment_id: i32,
        principal: &Principal,
    ) -> Result<(), AppError> {
        let case = self
            .find_modifiable(case_id, principal, FORBIDDEN_MODIFY)
            .await?;

        let attachment = CaseAttachments::find_by_id(attachment_id)
            .filter(case_attachments::Column::CaseId.eq(case_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(ATTACHMENT_NOT_FOUND.to_string()))?;

        self.storage.remove_if_exists(&attachment.file_path).await;

        CaseAttachments::delete_by_id(attachment.id)
            .exec(&self.db)
            .await?;

        // The legacy pair must not outlive the file it points at.
        if case.attachment_path.as_deref() == Some(attachment.file_path.as_str()) {
            let mut active: cases::ActiveModel = case.into();
            active.attachment_filename = Set(None);
            active.attachment_path = Set(None);
            active.update(&self.db).await?;
        }

        tracing::info!(
            "🗑️  Deleted attachment {} of case {}",
            attachment_id,
            case_id
        );

        Ok(())
    }
}

use crate::api::error::AppError;
use crate::entities::{case_attachments, cases, prelude::*};
use crate::models::{Principal, encode_tags};
use crate::utils::validation::validate_case_fields;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use super::{CaseInput, CaseResponse, CaseService, FORBIDDEN_MODIFY, UploadedFile};

impl CaseService {
    /// Full replace of the case fields. The first new file that gets
    /// recorded replaces the legacy attachment; every recorded file becomes
    /// an attachment row.
    pub async fn update_case(
        &self,
        case_id: i32,
        principal: &Principal,
        input: CaseInput,
        files: Vec<UploadedFile>,
    ) -> Result<CaseResponse, AppError> {
        let existing = self
            .find_modifiable(case_id, principal, FORBIDDEN_MODIFY)
            .await?;

        validate_case_fields(
            input.title.as_deref(),
            input.content.as_deref(),
            input.summary.as_deref(),
        )
        .map_err(|e| AppError::BadRequest(e.message))?;
        self.check_uploads(&files)?;

        let stored = self.store_uploads(files).await;

        let language = input.language_or_default();
        let mut active: cases::ActiveModel = existing.into();
        active.title = Set(input.title.unwrap_or_default().trim().to_string());
        active.content = Set(input.content.unwrap_or_default());
        active.summary = Set(Some(input.summary.unwrap_or_default()));
        active.industry = Set(Some(input.industry.unwrap_or_default()));
        active.language = Set(Some(language));
        active.case_type = Set(Some(input.case_type.unwrap_or_default()));
        active.subject = Set(Some(input.subject.unwrap_or_default()));
        active.knowledge_points = Set(Some(encode_tags(input.knowledge_points.as_ref())));
        active.target_audience = Set(Some(input.target_audience.unwrap_or_default()));
        active.teaching_points = Set(Some(encode_tags(input.teaching_points.as_ref())));
        active.tags = Set(Some(encode_tags(input.tags.as_ref())));
        active.updated_at = Set(Utc::now());

        let case = match active.update(&self.db).await {
            Ok(case) => case,
            Err(e) => {
                for upload in &stored {
                    self.storage.remove_if_exists(&upload.stored_name).await;
                }
                return Err(e.into());
            }
        };

        let rows = self.record_attachments(case_id, &stored).await;

        // Nothing recorded: the old legacy attachment stays as it was.
        if let Some(first) = rows.first() {
            if let Some(old) = case.attachment_path.clone().filter(|p| !p.is_empty()) {
                CaseAttachments::delete_many()
                    .filter(case_attachments::Column::CaseId.eq(case_id))
                    .filter(case_attachments::Column::FilePath.eq(old.as_str()))
                    .exec(&self.db)
                    .await?;
                self.storage.remove_if_exists(&old).await;
            }
            self.set_legacy_pair(case, Some(first)).await?;
        }

        tracing::info!(
            "✏️  Case {} updated by {} ({}/{} new attachment(s))",
            case_id,
            principal.username,
            rows.len(),
            stored.len()
        );

        self.get_case(case_id).await
    }
}

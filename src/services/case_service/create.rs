use crate::api::error::AppError;
use crate::entities::cases;
use crate::models::{AttachmentView, Capability, Principal, encode_tags};
use crate::utils::validation::validate_case_fields;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};

use super::{CaseInput, CaseResponse, CaseService, UploadedFile};

pub const FORBIDDEN_CREATE: &str = "权限不足，只有教师和管理员可以创建案例";

impl CaseService {
    pub async fn create_case(
        &self,
        principal: &Principal,
        input: CaseInput,
        files: Vec<UploadedFile>,
    ) -> Result<CaseResponse, AppError> {
        if !principal.can(Capability::CreateCase) {
            return Err(AppError::Forbidden(FORBIDDEN_CREATE.to_string()));
        }

        validate_case_fields(
            input.title.as_deref(),
            input.content.as_deref(),
            input.summary.as_deref(),
        )
        .map_err(|e| AppError::BadRequest(e.message))?;
        self.check_uploads(&files)?;

        let knowledge_points = encode_tags(input.knowledge_points.as_ref());
        let teaching_points = encode_tags(input.teaching_points.as_ref());
        let tags = encode_tags(input.tags.as_ref());
        let language = input.language_or_default();

        // Bytes first; rows reference only files that made it to storage.
        let stored = self.store_uploads(files).await;
        let legacy = stored.first();

        let now = Utc::now();
        let case = cases::ActiveModel {
            title: Set(input.title.unwrap_or_default().trim().to_string()),
            content: Set(input.content.unwrap_or_default()),
            summary: Set(Some(input.summary.unwrap_or_default())),
            industry: Set(Some(input.industry.unwrap_or_default())),
            language: Set(Some(language)),
            case_type: Set(Some(input.case_type.unwrap_or_default())),
            subject: Set(Some(input.subject.unwrap_or_default())),
            knowledge_points: Set(Some(knowledge_points)),
            target_audience: Set(Some(input.target_audience.unwrap_or_default())),
            teaching_points: Set(Some(teaching_points)),
            tags: Set(Some(tags)),
            author_id: Set(principal.user_id),
            attachment_filename: Set(legacy.map(|f| f.original_name.clone())),
            attachment_path: Set(legacy.map(|f| f.stored_name.clone())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let case = match case.insert(&self.db).await {
            Ok(case) => case,
            Err(e) => {
                for upload in &stored {
                    self.storage.remove_if_exists(&upload.stored_name).await;
                }
                return Err(e.into());
            }
        };

        let rows = self.record_attachments(case.id, &stored).await;
        // The first stored file may not have been recorded.
        let case = self.set_legacy_pair(case, rows.first()).await?;

        tracing::info!(
            "📝 Case {} created by {} with {}/{} attachment(s)",
            case.id,
            principal.username,
            rows.len(),
            stored.len()
        );

        // Only the rows that were persisted are reported, never the legacy pair.
        let mut response = CaseResponse::from_model(case, Some(principal.username.clone()), vec![]);
        response.attachments = rows.into_iter().map(AttachmentView::from).collect();
        Ok(response)
    }
}

use crate::api::error::AppError;
use crate::entities::{case_attachments, prelude::*};
use crate::models::Principal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::collections::BTreeSet;

use super::{CaseService, FORBIDDEN_DELETE};

impl CaseService {
    /// Deletes the case with its attachment rows, then unlinks every stored
    /// file that belonged to it.
    pub async fn delete_case(&self, case_id: i32, principal: &Principal) -> Result<(), AppError> {
        let case = self
            .find_modifiable(case_id, principal, FORBIDDEN_DELETE)
            .await?;

        let rows = self.attachment_rows(case_id).await?;

        let mut stored_files: BTreeSet<String> =
            rows.into_iter().map(|row| row.file_path).collect();
        if let Some(legacy) = case.attachment_path.filter(|p| !p.is_empty()) {
            stored_files.insert(legacy);
        }

        // Rows also cascade from `cases`; this covers connections that run
        // with foreign keys off.
        CaseAttachments::delete_many()
            .filter(case_attachments::Column::CaseId.eq(case_id))
            .exec(&self.db)
            .await?;
        Cases::delete_by_id(case_id).exec(&self.db).await?;

        for key in &stored_files {
            self.storage.remove_if_exists(key).await;
        }

        tracing::info!(
            "🗑️  Case {} deleted by {} ({} file(s) unlinked)",
            case_id,
            principal.username,
            stored_files.len()
        );

        Ok(())
    }
}

use crate::api::error::AppError;
use crate::entities::{case_attachments, cases, prelude::*, users};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;

use super::{CASE_NOT_FOUND, CaseFilter, CaseResponse, CaseService};

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Tag columns hold JSON arrays or legacy free text; a value matches as a
/// quoted element, a bracketed element or any substring.
pub(crate) fn tag_condition(column: cases::Column, value: &str) -> Condition {
    Condition::any()
        .add(column.like(format!("%\"{}\"%", value)))
        .add(column.like(format!("%[{}]%", value)))
        .add(column.like(format!("%{}%", value)))
}

fn search_condition(term: &str) -> Condition {
    Condition::any()
        .add(cases::Column::Title.contains(term))
        .add(cases::Column::Content.contains(term))
        .add(cases::Column::Summary.contains(term))
        .add(users::Column::Username.contains(term))
}

pub(crate) fn filter_condition(filter: &CaseFilter) -> Condition {
    let equality: [(cases::Column, &Option<String>); 5] = [
        (cases::Column::Industry, &filter.industry),
        (cases::Column::Language, &filter.language),
        (cases::Column::CaseType, &filter.case_type),
        (cases::Column::Subject, &filter.subject),
        (cases::Column::TargetAudience, &filter.target_audience),
    ];
    let tagged: [(cases::Column, &Option<String>); 3] = [
        (cases::Column::KnowledgePoints, &filter.knowledge_point),
        (cases::Column::TeachingPoints, &filter.teaching_point),
        (cases::Column::Tags, &filter.tag),
    ];

    let mut condition = Condition::all();

    for (column, value) in equality {
        if let Some(value) = non_blank(value) {
            condition = condition.add(column.eq(value));
        }
    }

    for (column, value) in tagged {
        if let Some(value) = non_blank(value) {
            condition = condition.add(tag_condition(column, value));
        }
    }

    if let Some(term) = non_blank(&filter.search) {
        condition = condition.add(search_condition(term));
    }

    condition
}

impl CaseService {
    /// Every matching case, newest first, each with its attachments.
    pub async fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<CaseResponse>, AppError> {
        let rows = Cases::find()
            .find_also_related(Users)
            .filter(filter_condition(filter))
            .order_by_desc(cases::Column::CreatedAt)
            .order_by_desc(cases::Column::Id)
            .all(&self.db)
            .await?;

        let case_ids: Vec<i32> = rows.iter().map(|(case, _)| case.id).collect();
        let mut by_case: HashMap<i32, Vec<case_attachments::Model>> = HashMap::new();
        if !case_ids.is_empty() {
            let attachments = CaseAttachments::find()
                .filter(case_attachments::Column::CaseId.is_in(case_ids))
                .order_by_asc(case_attachments::Column::CreatedAt)
                .order_by_asc(case_attachments::Column::Id)
                .all(&self.db)
                .await?;
            for attachment in attachments {
                by_case
                    .entry(attachment.case_id)
                    .or_default()
                    .push(attachment);
            }
        }

        Ok(rows
            .into_iter()
            .map(|(case, author)| {
                let attachments = by_case.remove(&case.id).unwrap_or_default();
                CaseResponse::from_model(case, author.map(|u| u.username), attachments)
            })
            .collect())
    }

    pub async fn get_case(&self, case_id: i32) -> Result<CaseResponse, AppError> {
        let (case, author) = Cases::find_by_id(case_id)
            .find_also_related(Users)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(CASE_NOT_FOUND.to_string()))?;

        let attachments = self.attachment_rows(case_id).await?;

        Ok(CaseResponse::from_model(
            case,
            author.map(|u| u.username),
            attachments,
        ))
    }
}

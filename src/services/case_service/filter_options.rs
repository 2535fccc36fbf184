use crate::api::error::AppError;
use crate::entities::{cases, prelude::*};
use crate::models::decode_tags;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use std::collections::HashSet;

use super::{CaseService, FilterOptions};

/// Appends values not seen yet, keeping first-seen order.
fn extend_unique(target: &mut Vec<String>, seen: &mut HashSet<String>, values: Vec<String>) {
    for value in values {
        if seen.insert(value.clone()) {
            target.push(value);
        }
    }
}

impl CaseService {
    async fn distinct_values(&self, column: cases::Column) -> Result<Vec<String>, AppError> {
        Ok(Cases::find()
            .select_only()
            .column(column)
            .distinct()
            .filter(column.is_not_null())
            .filter(column.ne(""))
            .order_by_asc(column)
            .into_tuple::<String>()
            .all(&self.db)
            .await?)
    }

    /// Classification values in use plus the flattened tag sets.
    pub async fn filter_options(&self) -> Result<FilterOptions, AppError> {
        let mut options = FilterOptions {
            industries: self.distinct_values(cases::Column::Industry).await?,
            languages: self.distinct_values(cases::Column::Language).await?,
            case_types: self.distinct_values(cases::Column::CaseType).await?,
            subjects: self.distinct_values(cases::Column::Subject).await?,
            target_audiences: self.distinct_values(cases::Column::TargetAudience).await?,
            ..Default::default()
        };

        let tag_columns: Vec<(Option<String>, Option<String>, Option<String>)> = Cases::find()
            .select_only()
            .column(cases::Column::KnowledgePoints)
            .column(cases::Column::TeachingPoints)
            .column(cases::Column::Tags)
            .order_by_asc(cases::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut seen_knowledge = HashSet::new();
        let mut seen_teaching = HashSet::new();
        let mut seen_tags = HashSet::new();

        for (knowledge_points, teaching_points, tags) in tag_columns {
            extend_unique(
                &mut options.knowledge_points,
                &mut seen_knowledge,
                decode_tags(knowledge_points.as_deref()),
            );
            extend_unique(
                &mut options.teaching_points,
                &mut seen_teaching,
                decode_tags(teaching_points.as_deref()),
            );
            extend_unique(&mut options.tags, &mut seen_tags, decode_tags(tags.as_deref()));
        }

        Ok(options)
    }
}

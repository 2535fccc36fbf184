use crate::api::error::AppError;
use crate::entities::{case_config, prelude::*};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

pub const CONFIG_NOT_FOUND: &str = "配置项不存在";
pub const CONFIG_DUPLICATE: &str = "该配置选项已存在";
pub const CONFIG_MISSING_FIELDS: &str = "配置类型、值和显示名称不能为空";

/// Public view of an active taxonomy entry.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct ConfigOption {
    pub value: String,
    pub label: String,
    pub order: i32,
}

impl From<case_config::Model> for ConfigOption {
    fn from(m: case_config::Model) -> Self {
        Self {
            value: m.config_value,
            label: m.display_name,
            order: m.sort_order,
        }
    }
}

/// Admin view of a taxonomy entry, inactive ones included.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConfigEntry {
    pub id: i32,
    pub config_type: String,
    pub config_value: String,
    pub display_name: String,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<case_config::Model> for ConfigEntry {
    fn from(m: case_config::Model) -> Self {
        Self {
            id: m.id,
            config_type: m.config_type,
            config_value: m.config_value,
            display_name: m.display_name,
            sort_order: m.sort_order,
            is_active: m.is_active,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateConfigRequest {
    pub config_type: Option<String>,
    pub config_value: Option<String>,
    pub display_name: Option<String>,
    pub sort_order: Option<i32>,
}

/// Omitted fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateConfigRequest {
    pub config_type: Option<String>,
    pub config_value: Option<String>,
    pub display_name: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub struct ConfigService;

impl ConfigService {
    /// Active entries grouped by type, each group ordered by `sort_order`.
    pub async fn grouped_active(
        db: &DatabaseConnection,
    ) -> Result<BTreeMap<String, Vec<ConfigOption>>, AppError> {
        let entries = CaseConfig::find()
            .filter(case_config::Column::IsActive.eq(true))
            .order_by_asc(case_config::Column::ConfigType)
            .order_by_asc(case_config::Column::SortOrder)
            .all(db)
            .await?;

        let mut grouped: BTreeMap<String, Vec<ConfigOption>> = BTreeMap::new();
        for entry in entries {
            grouped
                .entry(entry.config_type.clone())
                .or_default()
                .push(ConfigOption::from(entry));
        }
        Ok(grouped)
    }

    pub async fn active_of_type(
        db: &DatabaseConnection,
        config_type: &str,
    ) -> Result<Vec<ConfigOption>, AppError> {
        let entries = CaseConfig::find()
            .filter(case_config::Column::ConfigType.eq(config_type))
            .filter(case_config::Column::IsActive.eq(true))
            .order_by_asc(case_config::Column::SortOrder)
            .all(db)
            .await?;
        Ok(entries.into_iter().map(ConfigOption::from).collect())
    }

    pub async fn all_entries(db: &DatabaseConnection) -> Result<Vec<ConfigEntry>, AppError> {
        let entries = CaseConfig::find()
            .order_by_asc(case_config::Column::ConfigType)
            .order_by_asc(case_config::Column::SortOrder)
            .all(db)
            .await?;
        Ok(entries.into_iter().map(ConfigEntry::from).collect())
    }

    async fn pair_taken(
        db: &DatabaseConnection,
        config_type: &str,
        config_value: &str,
        except_id: Option<i32>,
    ) -> Result<bool, AppError> {
        let mut query = CaseConfig::find()
            .filter(case_config::Column::ConfigType.eq(config_type))
            .filter(case_config::Column::ConfigValue.eq(config_value));
        if let Some(id) = except_id {
            query = query.filter(case_config::Column::Id.ne(id));
        }
        Ok(query.one(db).await?.is_some())
    }

    pub async fn create(
        db: &DatabaseConnection,
        req: CreateConfigRequest,
    ) -> Result<ConfigEntry, AppError> {
        let (Some(config_type), Some(config_value), Some(display_name)) = (
            non_blank(req.config_type),
            non_blank(req.config_value),
            non_blank(req.display_name),
        ) else {
            return Err(AppError::BadRequest(CONFIG_MISSING_FIELDS.to_string()));
        };

        if Self::pair_taken(db, &config_type, &config_value, None).await? {
            return Err(AppError::BadRequest(CONFIG_DUPLICATE.to_string()));
        }

        let now = Utc::now();
        let entry = case_config::ActiveModel {
            config_type: Set(config_type),
            config_value: Set(config_value),
            display_name: Set(display_name),
            sort_order: Set(req.sort_order.unwrap_or(0)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        tracing::info!(
            "🏷️  Config entry added: {}={}",
            entry.config_type,
            entry.config_value
        );

        Ok(ConfigEntry::from(entry))
    }

    pub async fn update(
        db: &DatabaseConnection,
        id: i32,
        req: UpdateConfigRequest,
    ) -> Result<ConfigEntry, AppError> {
        let existing = CaseConfig::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(CONFIG_NOT_FOUND.to_string()))?;

        let config_type = non_blank(req.config_type).unwrap_or_else(|| existing.config_type.clone());
        let config_value =
            non_blank(req.config_value).unwrap_or_else(|| existing.config_value.clone());

        if (config_type != existing.config_type || config_value != existing.config_value)
            && Self::pair_taken(db, &config_type, &config_value, Some(id)).await?
        {
            return Err(AppError::BadRequest(CONFIG_DUPLICATE.to_string()));
        }

        let display_name =
            non_blank(req.display_name).unwrap_or_else(|| existing.display_name.clone());
        let sort_order = req.sort_order.unwrap_or(existing.sort_order);
        let is_active = req.is_active.unwrap_or(existing.is_active);

        let mut active: case_config::ActiveModel = existing.into();
        active.config_type = Set(config_type);
        active.config_value = Set(config_value);
        active.display_name = Set(display_name);
        active.sort_order = Set(sort_order);
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now());

        Ok(ConfigEntry::from(active.update(db).await?))
    }

    pub async fn delete(db: &DatabaseConnection, id: i32) -> Result<(), AppError> {
        let result = CaseConfig::delete_by_id(id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(CONFIG_NOT_FOUND.to_string()));
        }
        Ok(())
    }
}

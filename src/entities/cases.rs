use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cases")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,
    pub industry: Option<String>,
    pub language: Option<String>,
    pub case_type: Option<String>,
    pub subject: Option<String>,
    /// JSON-encoded string array, see `models::tags`.
    #[sea_orm(column_type = "Text", nullable)]
    pub knowledge_points: Option<String>,
    pub target_audience: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub teaching_points: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub tags: Option<String>,
    pub author_id: i32,
    /// Original name of the first uploaded file (pre-attachment-table schema).
    pub attachment_filename: Option<String>,
    /// Stored name of the first uploaded file (pre-attachment-table schema).
    pub attachment_path: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AuthorId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
    #[sea_orm(has_many = "super::case_attachments::Entity")]
    CaseAttachments,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::case_attachments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CaseAttachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

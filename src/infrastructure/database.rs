use crate::config::AppConfig;
use crate::entities::{case_attachments, case_config, cases, prelude::*, users};
use crate::services::storage::StorageService;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, Schema, Set,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub async fn setup_database(config: &AppConfig) -> anyhow::Result<DatabaseConnection> {
    let db_url = &config.database_url;

    info!("📂 Database: {}", db_url);

    if let Some(parent) = sqlite_file_path(db_url).and_then(|p| p.parent().map(Path::to_path_buf))
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(&parent).await?;
    }

    let mut opt = ConnectOptions::new(db_url.as_str());
    opt.max_connections(16)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

/// Filesystem path of a `sqlite://` URL, `None` for in-memory databases.
fn sqlite_file_path(url: &str) -> Option<&Path> {
    let rest = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        None
    } else {
        Some(Path::new(path))
    }
}

/// Brings any database (empty, first-generation or current) up to the
/// current schema. Every step is safe to repeat.
pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    // Order matters for foreign keys: Users -> Cases -> CaseAttachments
    let stmts = vec![
        (
            "users",
            schema
                .create_table_from_entity(users::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "cases",
            schema
                .create_table_from_entity(cases::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "case_attachments",
            schema
                .create_table_from_entity(case_attachments::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "case_config",
            schema
                .create_table_from_entity(case_config::Entity)
                .if_not_exists()
                .to_owned(),
        ),
    ];

    for (name, stmt) in stmts {
        let stmt = builder.build(&stmt);
        match db.execute(stmt).await {
            Ok(_) => info!("   - Table '{}' checked/created", name),
            Err(e) => tracing::warn!("   - Failed to create table '{}': {}", name, e),
        }
    }

    // First-generation databases only have title/content and the single
    // attachment pair on `cases`; the columns below arrived with the second.
    info!("🔄 Checking for schema updates...");

    let schema_updates = [
        "ALTER TABLE cases ADD COLUMN summary TEXT",
        "ALTER TABLE cases ADD COLUMN industry TEXT",
        "ALTER TABLE cases ADD COLUMN language TEXT DEFAULT 'zh-CN'",
        "ALTER TABLE cases ADD COLUMN case_type TEXT",
        "ALTER TABLE cases ADD COLUMN subject TEXT",
        "ALTER TABLE cases ADD COLUMN knowledge_points TEXT",
        "ALTER TABLE cases ADD COLUMN target_audience TEXT",
        "ALTER TABLE cases ADD COLUMN teaching_points TEXT",
        "ALTER TABLE cases ADD COLUMN tags TEXT",
        // Indexes
        "CREATE INDEX IF NOT EXISTS idx_cases_author_id ON cases(author_id)",
        "CREATE INDEX IF NOT EXISTS idx_cases_created_at ON cases(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_case_attachments_case_id ON case_attachments(case_id)",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_case_config_type_value ON case_config(config_type, config_value)",
    ];

    for query in schema_updates {
        match db
            .execute(sea_orm::Statement::from_string(builder, query.to_owned()))
            .await
        {
            Ok(_) => info!("   - Executed schema update: {}", query),
            Err(e) => {
                let err_msg = e.to_string().to_lowercase();
                if err_msg.contains("duplicate column") || err_msg.contains("already exists") {
                    tracing::debug!("   - Already up to date (skipped): {}", query);
                } else {
                    tracing::warn!("   - Schema update warning: {} -> {}", query, e);
                }
            }
        }
    }

    crate::infrastructure::seed::seed_case_config(db).await?;

    Ok(())
}

/// Copies every case's legacy single attachment into `case_attachments`
/// unless a row for that stored file already exists. The legacy columns are
/// left untouched. Returns the number of rows created.
pub async fn backfill_legacy_attachments(
    db: &DatabaseConnection,
    storage: &dyn StorageService,
) -> anyhow::Result<usize> {
    let legacy_cases = Cases::find()
        .filter(cases::Column::AttachmentFilename.is_not_null())
        .filter(cases::Column::AttachmentPath.is_not_null())
        .all(db)
        .await?;

    let mut migrated = 0;

    for case in legacy_cases {
        let (Some(original_name), Some(stored_name)) =
            (case.attachment_filename.clone(), case.attachment_path.clone())
        else {
            continue;
        };
        if stored_name.is_empty() {
            continue;
        }

        let already_present = CaseAttachments::find()
            .filter(case_attachments::Column::CaseId.eq(case.id))
            .filter(case_attachments::Column::Filename.eq(&stored_name))
            .count(db)
            .await?
            > 0;
        if already_present {
            continue;
        }

        // Size and type are only known when the bytes are still on disk.
        let (file_size, mime_type) = match storage.file_size(&stored_name).await {
            Ok(size) => (
                Some(size as i64),
                Some(
                    mime_guess::from_path(&original_name)
                        .first_or_octet_stream()
                        .essence_str()
                        .to_string(),
                ),
            ),
            Err(_) => (None, None),
        };

        case_attachments::ActiveModel {
            case_id: Set(case.id),
            filename: Set(stored_name.clone()),
            original_name: Set(original_name.clone()),
            file_path: Set(stored_name),
            file_size: Set(file_size),
            mime_type: Set(mime_type),
            created_at: Set(case.created_at),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(
            "   - Migrated attachment of case {}: {}",
            case.id, original_name
        );
        migrated += 1;
    }

    if migrated > 0 {
        info!("📎 Migrated {} legacy attachment(s)", migrated);
    }

    Ok(migrated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(
            sqlite_file_path("sqlite://./database/case.db?mode=rwc"),
            Some(Path::new("./database/case.db"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://x"), None);
    }
}

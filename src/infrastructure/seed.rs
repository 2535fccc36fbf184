use crate::entities::{case_config, prelude::*, users};
use crate::models::Role;
use crate::utils::auth::hash_password;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::info;

/// (config_type, config_value, display_name, sort_order)
pub const DEFAULT_CASE_CONFIG: &[(&str, &str, &str, i32)] = &[
    // Industry
    ("industry", "technology", "科技行业", 1),
    ("industry", "education", "教育行业", 2),
    ("industry", "finance", "金融行业", 3),
    ("industry", "healthcare", "医疗健康", 4),
    ("industry", "retail", "零售电商", 5),
    ("industry", "manufacturing", "制造业", 6),
    // Language
    ("language", "zh-CN", "中文", 1),
    ("language", "en-US", "English", 2),
    // Case type
    ("case_type", "problem_solving", "问题解决", 1),
    ("case_type", "decision_making", "决策分析", 2),
    ("case_type", "process_analysis", "流程分析", 3),
    ("case_type", "strategy_planning", "战略规划", 4),
    ("case_type", "innovation", "创新管理", 5),
    // Subject
    ("subject", "management", "管理学", 1),
    ("subject", "marketing", "市场营销", 2),
    ("subject", "finance", "财务管理", 3),
    ("subject", "hr", "人力资源", 4),
    ("subject", "operations", "运营管理", 5),
    ("subject", "strategy", "战略管理", 6),
    // Target audience
    ("target_audience", "undergraduate", "本科生", 1),
    ("target_audience", "graduate", "研究生", 2),
    ("target_audience", "mba", "MBA学员", 3),
    ("target_audience", "executive", "高管培训", 4),
    ("target_audience", "professional", "专业人士", 5),
];

pub async fn seed_case_config(db: &DatabaseConnection) -> anyhow::Result<()> {
    info!("🌱 Seeding default case configuration...");

    let mut inserted = 0;
    for (config_type, value, name, order) in DEFAULT_CASE_CONFIG {
        let exists = CaseConfig::find()
            .filter(case_config::Column::ConfigType.eq(*config_type))
            .filter(case_config::Column::ConfigValue.eq(*value))
            .one(db)
            .await?;

        if exists.is_none() {
            let now = Utc::now();
            case_config::ActiveModel {
                config_type: Set(config_type.to_string()),
                config_value: Set(value.to_string()),
                display_name: Set(name.to_string()),
                sort_order: Set(*order),
                is_active: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
            inserted += 1;
        }
    }

    info!("✅ Case configuration ready ({} new entries)", inserted);
    Ok(())
}

/// Demo accounts, one per role. Existing usernames are left alone.
pub async fn seed_demo_users(db: &DatabaseConnection) -> anyhow::Result<()> {
    info!("🌱 Seeding demo accounts...");

    let accounts = [
        ("admin", Role::Admin),
        ("teacher", Role::Teacher),
        ("student", Role::Student),
    ];

    for (username, role) in accounts {
        let exists = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(db)
            .await?;

        if exists.is_some() {
            info!("   - Account already exists: {}", username);
            continue;
        }

        users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(hash_password("password")?),
            role: Set(role),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        info!("   - Created account: {} ({})", username, role);
    }

    Ok(())
}

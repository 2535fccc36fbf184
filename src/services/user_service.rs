use crate::api::error::AppError;
use crate::config::AppConfig;
use crate::entities::{cases, prelude::*, users};
use crate::models::Role;
use crate::utils::auth::{create_jwt, hash_password, verify_password};
use crate::utils::validation::first_message;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const USER_NOT_FOUND: &str = "用户不存在";
pub const USERNAME_TAKEN: &str = "用户名已存在";
pub const CREDENTIALS_REQUIRED: &str = "用户名和密码不能为空";
pub const INVALID_CREDENTIALS: &str = "用户名或密码错误";
pub const INVALID_ROLE: &str = "无效的用户角色";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for UserSummary {
    fn from(m: users::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            role: m.role,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserListItem {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub case_count: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current: u64,
    pub page_size: u64,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserPage {
    pub users: Vec<UserListItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CaseStats {
    pub total_cases: u64,
    pub today_cases: u64,
    pub week_cases: u64,
    pub month_cases: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserDetail {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub stats: CaseStats,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserOverview {
    pub total_users: u64,
    pub admin_count: u64,
    pub teacher_count: u64,
    pub student_count: u64,
    pub today_users: u64,
    pub week_users: u64,
    pub month_users: u64,
    pub recent_users: Vec<UserSummary>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Substring of the username
    pub search: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, message = "用户名至少3个字符"))]
    pub username: Option<String>,
    #[validate(length(min = 6, message = "密码长度至少6位"))]
    pub password: Option<String>,
    /// `student` (default) or `teacher`
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, message = "用户名至少3个字符"))]
    pub username: Option<String>,
    #[validate(length(min = 6, message = "密码至少6个字符"))]
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, message = "用户名至少3个字符"))]
    pub username: Option<String>,
    #[validate(length(min = 6, message = "密码至少6个字符"))]
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthSession {
    pub token: String,
    pub user: UserSummary,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_role(raw: &str) -> Result<Role, AppError> {
    raw.parse::<Role>()
        .map_err(|_| AppError::BadRequest(INVALID_ROLE.to_string()))
}

/// Start of the current UTC day and the 7- and 30-day windows before it.
fn stat_thresholds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
    let today = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .unwrap_or(now);
    (today, today - Duration::days(7), today - Duration::days(30))
}

pub struct UserService;

impl UserService {
    async fn username_taken(
        db: &DatabaseConnection,
        username: &str,
        except_id: Option<i32>,
    ) -> Result<bool, AppError> {
        let mut query = Users::find().filter(users::Column::Username.eq(username));
        if let Some(id) = except_id {
            query = query.filter(users::Column::Id.ne(id));
        }
        Ok(query.one(db).await?.is_some())
    }

    async fn admin_count(db: &DatabaseConnection) -> Result<u64, AppError> {
        Ok(Users::find()
            .filter(users::Column::Role.eq(Role::Admin))
            .count(db)
            .await?)
    }

    async fn case_count(db: &DatabaseConnection, user_id: i32) -> Result<u64, AppError> {
        Ok(Cases::find()
            .filter(cases::Column::AuthorId.eq(user_id))
            .count(db)
            .await?)
    }

    async fn insert_user(
        db: &DatabaseConnection,
        username: String,
        password: &str,
        role: Role,
    ) -> Result<users::Model, AppError> {
        if Self::username_taken(db, &username, None).await? {
            return Err(AppError::BadRequest(USERNAME_TAKEN.to_string()));
        }

        let user = users::ActiveModel {
            username: Set(username),
            password_hash: Set(hash_password(password)?),
            role: Set(role),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(user)
    }

    /// Self-service sign-up. Only student and teacher accounts can be created
    /// this way.
    pub async fn register(
        db: &DatabaseConnection,
        config: &AppConfig,
        req: RegisterRequest,
    ) -> Result<AuthSession, AppError> {
        let (Some(username), Some(password)) =
            (non_blank(req.username.clone()), non_blank(req.password.clone()))
        else {
            return Err(AppError::BadRequest(CREDENTIALS_REQUIRED.to_string()));
        };
        req.validate()
            .map_err(|e| AppError::BadRequest(first_message(&e)))?;

        let role = match non_blank(req.role) {
            None => Role::Student,
            Some(raw) => match parse_role(&raw)? {
                Role::Admin => return Err(AppError::BadRequest(INVALID_ROLE.to_string())),
                role => role,
            },
        };

        let user = Self::insert_user(db, username, &password, role).await?;
        let token = create_jwt(
            user.id,
            &user.username,
            user.role,
            &config.jwt_secret,
            config.token_ttl_days,
        )?;

        tracing::info!("👤 Registered {} ({})", user.username, user.role);

        Ok(AuthSession {
            token,
            user: user.into(),
        })
    }

    pub async fn login(
        db: &DatabaseConnection,
        config: &AppConfig,
        req: LoginRequest,
    ) -> Result<AuthSession, AppError> {
        let (Some(username), Some(password)) = (non_blank(req.username), non_blank(req.password))
        else {
            return Err(AppError::BadRequest(CREDENTIALS_REQUIRED.to_string()));
        };

        let user = Users::find()
            .filter(users::Column::Username.eq(&username))
            .one(db)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(&password, &user.password_hash) {
            tracing::warn!("🔒 Failed login for {}", username);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let token = create_jwt(
            user.id,
            &user.username,
            user.role,
            &config.jwt_secret,
            config.token_ttl_days,
        )?;

        Ok(AuthSession {
            token,
            user: user.into(),
        })
    }

    pub async fn list(db: &DatabaseConnection, query: &UserListQuery) -> Result<UserPage, AppError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);

        let mut condition = Condition::all();
        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            condition = condition.add(users::Column::Username.contains(search));
        }
        if let Some(role) = query.role.as_deref().filter(|r| !r.is_empty()) {
            condition = condition.add(users::Column::Role.eq(parse_role(role)?));
        }

        let paginator = Users::find()
            .filter(condition)
            .order_by_desc(users::Column::CreatedAt)
            .order_by_desc(users::Column::Id)
            .paginate(db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;

        let ids: Vec<i32> = rows.iter().map(|u| u.id).collect();
        let counts: HashMap<i32, i64> = if ids.is_empty() {
            HashMap::new()
        } else {
            Cases::find()
                .select_only()
                .column(cases::Column::AuthorId)
                .column_as(Expr::col(cases::Column::Id).count(), "case_count")
                .filter(cases::Column::AuthorId.is_in(ids))
                .group_by(cases::Column::AuthorId)
                .into_tuple::<(i32, i64)>()
                .all(db)
                .await?
                .into_iter()
                .collect()
        };

        let users = rows
            .into_iter()
            .map(|u| UserListItem {
                case_count: counts.get(&u.id).copied().unwrap_or(0) as u64,
                id: u.id,
                username: u.username,
                role: u.role,
                created_at: u.created_at,
            })
            .collect();

        Ok(UserPage {
            users,
            pagination: Pagination {
                current: page,
                page_size: limit,
                total,
                pages: total.div_ceil(limit),
            },
        })
    }

    pub async fn get_with_stats(db: &DatabaseConnection, id: i32) -> Result<UserDetail, AppError> {
        let user = Users::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

        let (today, week, month) = stat_thresholds(Utc::now());
        let authored = || Cases::find().filter(cases::Column::AuthorId.eq(id));

        let stats = CaseStats {
            total_cases: authored().count(db).await?,
            today_cases: authored()
                .filter(cases::Column::CreatedAt.gte(today))
                .count(db)
                .await?,
            week_cases: authored()
                .filter(cases::Column::CreatedAt.gte(week))
                .count(db)
                .await?,
            month_cases: authored()
                .filter(cases::Column::CreatedAt.gte(month))
                .count(db)
                .await?,
        };

        Ok(UserDetail {
            id: user.id,
            username: user.username,
            role: user.role,
            created_at: user.created_at,
            stats,
        })
    }

    pub async fn create(
        db: &DatabaseConnection,
        req: CreateUserRequest,
    ) -> Result<UserSummary, AppError> {
        let (Some(username), Some(password)) =
            (non_blank(req.username.clone()), non_blank(req.password.clone()))
        else {
            return Err(AppError::BadRequest(CREDENTIALS_REQUIRED.to_string()));
        };
        req.validate()
            .map_err(|e| AppError::BadRequest(first_message(&e)))?;

        let role = match non_blank(req.role) {
            Some(raw) => parse_role(&raw)?,
            None => Role::Student,
        };

        let user = Self::insert_user(db, username, &password, role).await?;
        tracing::info!("👤 Admin created {} ({})", user.username, user.role);
        Ok(user.into())
    }

    pub async fn update(
        db: &DatabaseConnection,
        id: i32,
        req: UpdateUserRequest,
    ) -> Result<UserSummary, AppError> {
        let existing = Users::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

        let role = non_blank(req.role.clone()).map(|r| parse_role(&r)).transpose()?;

        if existing.role == Role::Admin
            && role.is_some_and(|r| r != Role::Admin)
            && Self::admin_count(db).await? <= 1
        {
            return Err(AppError::BadRequest("不能修改最后一个管理员的角色".to_string()));
        }

        req.validate()
            .map_err(|e| AppError::BadRequest(first_message(&e)))?;

        let username = non_blank(req.username).filter(|u| *u != existing.username);
        if let Some(username) = &username
            && Self::username_taken(db, username, Some(id)).await?
        {
            return Err(AppError::BadRequest(USERNAME_TAKEN.to_string()));
        }
        let password = non_blank(req.password);

        if username.is_none() && password.is_none() && role.is_none() {
            return Err(AppError::BadRequest("没有需要更新的字段".to_string()));
        }

        let mut active: users::ActiveModel = existing.into();
        if let Some(username) = username {
            active.username = Set(username);
        }
        if let Some(password) = password {
            active.password_hash = Set(hash_password(&password)?);
        }
        if let Some(role) = role {
            active.role = Set(role);
        }

        Ok(active.update(db).await?.into())
    }

    /// Refuses to delete the caller, the last admin, or anyone who still
    /// authors cases.
    pub async fn delete(
        db: &DatabaseConnection,
        id: i32,
        acting_user_id: i32,
    ) -> Result<UserSummary, AppError> {
        let user = Users::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

        if user.id == acting_user_id {
            return Err(AppError::BadRequest("不能删除自己的账户".to_string()));
        }

        if user.role == Role::Admin && Self::admin_count(db).await? <= 1 {
            return Err(AppError::BadRequest("不能删除最后一个管理员账户".to_string()));
        }

        let case_count = Self::case_count(db, id).await?;
        if case_count > 0 {
            return Err(AppError::BadRequest(format!(
                "该用户有 {} 个案例，请先处理相关案例后再删除用户",
                case_count
            )));
        }

        Users::delete_by_id(id).exec(db).await?;
        tracing::info!("👤 Deleted user {} ({})", user.username, user.id);

        Ok(user.into())
    }

    pub async fn overview(db: &DatabaseConnection) -> Result<UserOverview, AppError> {
        let (today, week, month) = stat_thresholds(Utc::now());
        let with_role = |role: Role| Users::find().filter(users::Column::Role.eq(role));
        let since = |t: DateTime<Utc>| Users::find().filter(users::Column::CreatedAt.gte(t));

        let recent_users = Users::find()
            .order_by_desc(users::Column::CreatedAt)
            .order_by_desc(users::Column::Id)
            .limit(5)
            .all(db)
            .await?
            .into_iter()
            .map(UserSummary::from)
            .collect();

        Ok(UserOverview {
            total_users: Users::find().count(db).await?,
            admin_count: with_role(Role::Admin).count(db).await?,
            teacher_count: with_role(Role::Teacher).count(db).await?,
            student_count: with_role(Role::Student).count(db).await?,
            today_users: since(today).count(db).await?,
            week_users: since(week).count(db).await?,
            month_users: since(month).count(db).await?,
            recent_users,
        })
    }
}

pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::case_service::CaseService;
use crate::services::storage::StorageService;
use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, Request},
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::cases::list_cases,
        api::handlers::cases::filter_options,
        api::handlers::cases::get_case,
        api::handlers::cases::create_case,
        api::handlers::cases::update_case,
        api::handlers::cases::delete_case,
        api::handlers::attachments::add_attachments,
        api::handlers::attachments::delete_attachment,
        api::handlers::downloads::download_attachment,
        api::handlers::config::list_active,
        api::handlers::config::list_by_type,
        api::handlers::config::list_all,
        api::handlers::config::create_entry,
        api::handlers::config::update_entry,
        api::handlers::config::delete_entry,
        api::handlers::users::list_users,
        api::handlers::users::stats_overview,
        api::handlers::users::get_user,
        api::handlers::users::create_user,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            models::Role,
            models::TagInput,
            models::AttachmentView,
            services::case_service::CaseInput,
            services::case_service::CaseResponse,
            services::case_service::FilterOptions,
            services::config_service::ConfigOption,
            services::config_service::ConfigEntry,
            services::config_service::CreateConfigRequest,
            services::config_service::UpdateConfigRequest,
            services::user_service::RegisterRequest,
            services::user_service::LoginRequest,
            services::user_service::AuthSession,
            services::user_service::UserSummary,
            services::user_service::UserListItem,
            services::user_service::Pagination,
            services::user_service::UserPage,
            services::user_service::CaseStats,
            services::user_service::UserDetail,
            services::user_service::UserOverview,
            services::user_service::CreateUserRequest,
            services::user_service::UpdateUserRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "cases", description = "Case library"),
        (name = "attachments", description = "Case attachments"),
        (name = "config", description = "Classification taxonomy"),
        (name = "users", description = "User administration"),
        (name = "system", description = "Health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageService>,
    pub config: AppConfig,
    pub case_service: Arc<CaseService>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>, config: AppConfig) -> Self {
        let case_service = Arc::new(CaseService::new(
            db.clone(),
            storage.clone(),
            config.clone(),
        ));
        Self {
            db,
            storage,
            config,
            case_service,
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    use api::handlers::{attachments, auth, cases, config, downloads, health, users};

    let auth = from_fn_with_state(state.clone(), api::middleware::auth::auth_middleware);

    // Routes that need a valid token
    let protected = Router::new()
        .route("/api/cases", post(cases::create_case))
        .route(
            "/api/cases/:id",
            axum::routing::put(cases::update_case).delete(cases::delete_case),
        )
        .route("/api/cases/:id/attachments", post(attachments::add_attachments))
        .route(
            "/api/cases/:id/attachments/:attachment_id",
            delete(attachments::delete_attachment),
        )
        .route("/api/config", post(config::create_entry))
        .route("/api/config/admin/all", get(config::list_all))
        .route(
            "/api/config/:id",
            axum::routing::put(config::update_entry).delete(config::delete_entry),
        )
        .route(
            "/api/users",
            get(users::list_users).post(users::create_user),
        )
        .route("/api/users/stats/overview", get(users::stats_overview))
        .route(
            "/api/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(auth);

    let public = Router::new()
        .route("/", get(health::index))
        .route("/api/health", get(health::health_check))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/cases", get(cases::list_cases))
        .route("/api/cases/filter-options", get(cases::filter_options))
        .route("/api/cases/:id", get(cases::get_case))
        .route("/api/config", get(config::list_active))
        .route("/api/config/:id", get(config::list_by_type))
        .route("/attachments/:name", get(downloads::download_attachment));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public)
        .merge(protected)
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                let request_id = req
                    .headers()
                    .get(&api::middleware::request_id::REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|req: &Request<Body>, _span: &tracing::Span| {
                tracing::info!("📥 {} {}", req.method(), req.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    tracing::info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
        )
        // Outside the trace layer so the span sees the id.
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors_layer(&state.config))
        .layer(DefaultBodyLimit::max(state.config.body_limit()))
        .with_state(state)
}

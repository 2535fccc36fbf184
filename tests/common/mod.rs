#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, Bytes},
    http::{Request, StatusCode, header::HeaderMap},
};
use case_learning_center::config::AppConfig;
use case_learning_center::entities::users;
use case_learning_center::infrastructure::database::run_migrations;
use case_learning_center::models::Role;
use case_learning_center::services::storage::{LocalStorageService, StorageService};
use case_learning_center::utils::auth::{create_jwt, hash_password};
use case_learning_center::{AppState, create_app};
use chrono::Utc;
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub app: Router,
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub upload_dir: TempDir,
}

pub struct Account {
    pub id: i32,
    pub token: String,
}

/// A private in-memory database. One connection, so every query sees the
/// same memory.
pub async fn memory_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    Database::connect(opt).await.unwrap()
}

pub async fn setup() -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorageService::new(upload_dir.path()));
    setup_with_storage(upload_dir, storage).await
}

pub async fn setup_with_storage(upload_dir: TempDir, storage: Arc<dyn StorageService>) -> TestApp {
    let config = AppConfig::development(upload_dir.path());
    let db = memory_db().await;
    run_migrations(&db).await.unwrap();

    let state = AppState::new(db.clone(), storage, config.clone());

    TestApp {
        app: create_app(state),
        db,
        config,
        upload_dir,
    }
}

impl TestApp {
    pub async fn account(&self, username: &str, role: Role) -> Account {
        let user = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(hash_password("password").unwrap()),
            role: Set(role),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap();

        let token = create_jwt(
            user.id,
            &user.username,
            user.role,
            &self.config.jwt_secret,
            self.config.token_ttl_days,
        )
        .unwrap();

        Account { id: user.id, token }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body)
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let (status, _, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body: {}", String::from_utf8_lossy(&bytes))
            })
        };
        (status, value)
    }

    pub async fn multipart(
        &self,
        method: &str,
        uri: &str,
        token: &str,
        form: Form,
    ) -> (StatusCode, Value) {
        let (content_type, body) = form.finish();
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, _, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    pub fn stored_files(&self) -> Vec<String> {
        stored_files(self.upload_dir.path())
    }
}

pub fn stored_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// Valid case fields: five-character title, short body.
pub fn case_body(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "content": "c".repeat(50),
    })
}

const BOUNDARY: &str = "----case-learning-center-test-boundary";

#[derive(Default)]
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"attachments\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (
            format!("multipart/form-data; boundary={}", BOUNDARY),
            self.body,
        )
    }
}

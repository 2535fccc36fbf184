mod common;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum::http::StatusCode;
use case_learning_center::models::Role;
use case_learning_center::services::storage::{LocalStorageService, StorageService};
use common::{Form, setup_with_storage};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncRead;

/// Local storage whose `file_size` fails on one chosen call.
struct FlakyStorage {
    inner: LocalStorageService,
    stat_calls: AtomicUsize,
    fail_on: usize,
}

#[async_trait]
impl StorageService for FlakyStorage {
    async fn save_file(&self, key: &str, data: &[u8]) -> Result<()> {
        self.inner.save_file(key, data).await
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        self.inner.delete_file(key).await
    }

    async fn file_exists(&self, key: &str) -> Result<bool> {
        self.inner.file_exists(key).await
    }

    async fn file_size(&self, key: &str) -> Result<u64> {
        let call = self.stat_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(anyhow!("simulated stat failure for {}", key));
        }
        self.inner.file_size(key).await
    }

    async fn open_file(&self, key: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        self.inner.open_file(key).await
    }
}

#[tokio::test]
async fn test_failed_attachment_is_skipped_and_removed() {
    let upload_dir = tempfile::tempdir().unwrap();
    let storage = flaky_storage(&upload_dir, 2);
    let app = setup_with_storage(upload_dir, storage).await;
    let teacher = app.account("teacher1", Role::Teacher).await;

    let form = Form::new()
        .text("title", "Partial upload")
        .text("content", "content body")
        .file("one.txt", "text/plain", b"1")
        .file("two.txt", "text/plain", b"22")
        .file("three.txt", "text/plain", b"333");

    let (status, body) = app
        .multipart("POST", "/api/cases", &teacher.token, form)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let attachments = body["case"]["attachments"].as_array().unwrap();
    let names: Vec<_> = attachments
        .iter()
        .map(|a| a["original_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["one.txt", "three.txt"]);
    assert_eq!(app.stored_files().len(), 2);

    let id = body["case"]["id"].as_i64().unwrap();
    let (_, body) = app.json("GET", &format!("/api/cases/{id}"), None, None).await;
    assert_eq!(body["case"]["attachments"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_attachment_on_sub_resource() {
    let upload_dir = tempfile::tempdir().unwrap();
    let storage = flaky_storage(&upload_dir, 1);
    let app = setup_with_storage(upload_dir, storage).await;
    let teacher = app.account("teacher1", Role::Teacher).await;

    let (_, body) = app
        .json(
            "POST",
            "/api/cases",
            Some(&teacher.token),
            Some(common::case_body("No files yet")),
        )
        .await;
    let id = body["case"]["id"].as_i64().unwrap();

    let form = Form::new()
        .file("a.txt", "text/plain", b"a")
        .file("b.txt", "text/plain", b"b");
    let (status, body) = app
        .multipart(
            "POST",
            &format!("/api/cases/{id}/attachments"),
            &teacher.token,
            form,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let added = body["attachments"].as_array().unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0]["original_name"], "b.txt");
    assert_eq!(app.stored_files().len(), 1);
}

fn flaky_storage(upload_dir: &tempfile::TempDir, fail_on: usize) -> Arc<FlakyStorage> {
    Arc::new(FlakyStorage {
        inner: LocalStorageService::new(upload_dir.path()),
        stat_calls: AtomicUsize::new(0),
        fail_on,
    })
}

#[tokio::test]
async fn test_unrecorded_single_file_leaves_no_legacy_attachment() {
    let upload_dir = tempfile::tempdir().unwrap();
    let storage = flaky_storage(&upload_dir, 1);
    let app = setup_with_storage(upload_dir, storage).await;
    let teacher = app.account("teacher1", Role::Teacher).await;

    let form = Form::new()
        .text("title", "Single file")
        .text("content", "content body")
        .file("only.txt", "text/plain", b"only");

    let (status, body) = app
        .multipart("POST", "/api/cases", &teacher.token, form)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["case"]["attachments"].as_array().unwrap().is_empty());
    assert!(body["case"]["attachment_path"].is_null());
    assert!(body["case"]["attachment_filename"].is_null());
    assert!(app.stored_files().is_empty());

    let id = body["case"]["id"].as_i64().unwrap();
    let (_, body) = app.json("GET", &format!("/api/cases/{id}"), None, None).await;
    assert!(body["case"]["attachments"].as_array().unwrap().is_empty());
    assert!(body["case"]["attachment_path"].is_null());
}

#[tokio::test]
async fn test_legacy_pair_follows_first_recorded_file() {
    let upload_dir = tempfile::tempdir().unwrap();
    let storage = flaky_storage(&upload_dir, 1);
    let app = setup_with_storage(upload_dir, storage).await;
    let teacher = app.account("teacher1", Role::Teacher).await;

    let form = Form::new()
        .text("title", "Two files")
        .text("content", "content body")
        .file("first.txt", "text/plain", b"1")
        .file("second.txt", "text/plain", b"2");

    let (status, body) = app
        .multipart("POST", "/api/cases", &teacher.token, form)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let case = &body["case"];
    let attachments = case["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(case["attachment_filename"], "second.txt");
    assert_eq!(case["attachment_path"], attachments[0]["filename"]);
    assert_eq!(app.stored_files().len(), 1);
}

#[tokio::test]
async fn test_unrecorded_update_file_keeps_old_legacy_attachment() {
    let upload_dir = tempfile::tempdir().unwrap();
    // First stat belongs to the create, the second to the update.
    let storage = flaky_storage(&upload_dir, 2);
    let app = setup_with_storage(upload_dir, storage).await;
    let teacher = app.account("teacher1", Role::Teacher).await;

    let form = Form::new()
        .text("title", "Keep old file")
        .text("content", "content body")
        .file("old.txt", "text/plain", b"old");
    let (_, body) = app
        .multipart("POST", "/api/cases", &teacher.token, form)
        .await;
    let id = body["case"]["id"].as_i64().unwrap();
    let old_stored = body["case"]["attachment_path"].as_str().unwrap().to_string();

    let form = Form::new()
        .text("title", "Keep old file")
        .text("content", "edited body")
        .file("new.txt", "text/plain", b"new");
    let (status, body) = app
        .multipart("PUT", &format!("/api/cases/{id}"), &teacher.token, form)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let case = &body["case"];
    assert_eq!(case["content"], "edited body");
    assert_eq!(case["attachment_path"], old_stored.as_str());
    assert_eq!(case["attachment_filename"], "old.txt");
    let attachments = case["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0]["original_name"], "old.txt");
    assert_eq!(app.stored_files(), vec![old_stored]);
}

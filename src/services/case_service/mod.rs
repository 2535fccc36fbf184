//! Case lifecycle: create, read, full-replace update, delete and the
//! attachment sub-resource.
//!
//! Files follow an at-most-once write policy with no compensation. Bytes are
//! written to storage before any row references them. Each file is then
//! recorded independently: if its stat or row insert fails, its bytes are
//! removed and the request carries on with the remaining files. Nothing is
//! retried and there is no transaction around the case row and its
//! attachments, so the response lists exactly the attachments that were
//! persisted.

use crate::config::AppConfig;
use crate::services::storage::StorageService;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod attachments;
pub mod create;
pub mod delete;
pub mod filter_options;
pub mod read;
pub mod types;
pub mod update;

pub use types::{CaseFilter, CaseInput, CaseResponse, FilterOptions, StoredUpload, UploadedFile};

pub const CASE_NOT_FOUND: &str = "案例不存在";
pub const FORBIDDEN_MODIFY: &str = "权限不足，无法修改此案例";
pub const FORBIDDEN_DELETE: &str = "权限不足，无法删除此案例";

pub struct CaseService {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
    config: AppConfig,
}

impl CaseService {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>, config: AppConfig) -> Self {
        Self {
            db,
            storage,
            config,
        }
    }
}

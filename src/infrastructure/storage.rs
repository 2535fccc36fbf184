use crate::config::AppConfig;
use crate::services::storage::LocalStorageService;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &AppConfig) -> anyhow::Result<Arc<LocalStorageService>> {
    let root = &config.upload_path;

    info!("📂 Upload directory: {}", root.display());

    if !tokio::fs::try_exists(root).await? {
        info!("🪣 Upload directory not found, creating...");
        tokio::fs::create_dir_all(root).await?;
    }

    info!("✅ Upload directory is ready");

    Ok(Arc::new(LocalStorageService::new(root.clone())))
}

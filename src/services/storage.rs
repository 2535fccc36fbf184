use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Byte storage for attachments, addressed by stored filename.
#[async_trait]
pub trait StorageService: Send + Sync {
    async fn save_file(&self, key: &str, data: &[u8]) -> Result<()>;
    async fn delete_file(&self, key: &str) -> Result<()>;
    async fn file_exists(&self, key: &str) -> Result<bool>;
    async fn file_size(&self, key: &str) -> Result<u64>;
    async fn open_file(&self, key: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>>;

    /// Removes a stored file if it is present. Failures are logged and
    /// swallowed; callers never retry.
    async fn remove_if_exists(&self, key: &str) {
        match self.file_exists(key).await {
            Ok(true) => {
                if let Err(e) = self.delete_file(key).await {
                    tracing::warn!("⚠️  Failed to remove stored file {}: {}", key, e);
                }
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("⚠️  Could not check stored file {}: {}", key, e),
        }
    }
}

/// Keys are single, plain path components.
pub fn validate_key(key: &str) -> Result<()> {
    let mut components = Path::new(key).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !key.contains(['/', '\\']) => Ok(()),
        _ => bail!("invalid storage key: {:?}", key),
    }
}

pub struct LocalStorageService {
    root: PathBuf,
}

impl LocalStorageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn save_file(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn file_size(&self, key: &str) -> Result<u64> {
        let path = self.path_for(key)?;
        let meta = tokio::fs::metadata(&path).await?;
        if !meta.is_file() {
            return Err(anyhow!("{} is not a regular file", key));
        }
        Ok(meta.len())
    }

    async fn open_file(&self, key: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        let path = self.path_for(key)?;
        let file = tokio::fs::File::open(&path).await?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("1700000000000-12.pdf").is_ok());
        assert!(validate_key("../secret").is_err());
        assert!(validate_key("..").is_err());
        assert!(validate_key("a/b.txt").is_err());
        assert!(validate_key("a\\b.txt").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("").is_err());
    }

    #[tokio::test]
    async fn test_local_storage_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorageService::new(dir.path());

        storage.save_file("a.txt", b"hello").await.unwrap();
        assert!(storage.file_exists("a.txt").await.unwrap());
        assert_eq!(storage.file_size("a.txt").await.unwrap(), 5);

        let mut reader = storage.open_file("a.txt").await.unwrap();
        let mut buf = String::new();
        reader.read_to_string(&mut buf).await.unwrap();
        assert_eq!(buf, "hello");

        storage.delete_file("a.txt").await.unwrap();
        assert!(!storage.file_exists("a.txt").await.unwrap());
        assert!(storage.file_size("a.txt").await.is_err());
    }

    #[tokio::test]
    async fn test_remove_if_exists_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorageService::new(dir.path());
        storage.remove_if_exists("missing.txt").await;
        storage.remove_if_exists("../escape").await;
    }
}

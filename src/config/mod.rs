use std::env;
use std::path::PathBuf;

/// Extensions accepted for case attachments (lowercase, without the dot).
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    // Documents
    "pdf", "doc", "docx", "txt", "ppt", "pptx",
    // Markdown
    "md", "markdown",
    // Images
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "webp",
    // Web pages
    "html", "htm",
];

/// Application configuration, built once at startup and carried in `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP port (default: 9999)
    pub port: u16,

    /// SQLite connection string (default: "sqlite://./database/case.db?mode=rwc")
    pub database_url: String,

    /// Directory holding uploaded attachments (default: "./uploads")
    pub upload_path: PathBuf,

    /// HMAC secret for issued tokens
    pub jwt_secret: String,

    /// Token lifetime in days (default: 7)
    pub token_ttl_days: i64,

    /// Maximum size of a single attachment in bytes (default: 20 MB)
    pub max_file_size: usize,

    /// Maximum number of attachments per request (default: 10)
    pub max_files: usize,

    /// Accepted attachment extensions
    pub allowed_extensions: Vec<String>,

    /// Allowed CORS origins (comma separated); empty means any origin
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 9999,
            database_url: "sqlite://./database/case.db?mode=rwc".to_string(),
            upload_path: PathBuf::from("./uploads"),
            jwt_secret: "your-super-secret-jwt-key-change-this-in-production".to_string(),
            token_ttl_days: 7,
            max_file_size: 20 * 1024 * 1024, // 20 MB
            max_files: 10,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            database_url: env::var("DATABASE_URL")
                .or_else(|_| env::var("DB_PATH").map(|p| format!("sqlite://{}?mode=rwc", p)))
                .unwrap_or(default.database_url),

            upload_path: env::var("UPLOAD_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.upload_path),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),

            token_ttl_days: env::var("TOKEN_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.token_ttl_days),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            max_files: env::var("MAX_FILES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_files),

            allowed_extensions: default.allowed_extensions,

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Config for local development and tests, with an explicit upload directory
    pub fn development(upload_path: impl Into<PathBuf>) -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            upload_path: upload_path.into(),
            jwt_secret: "dev-secret".to_string(),
            ..Self::default()
        }
    }

    /// Request body limit: every allowed file at full size plus form overhead.
    pub fn body_limit(&self) -> usize {
        self.max_file_size * self.max_files + 10 * 1024 * 1024
    }

    pub fn is_extension_allowed(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.').to_lowercase();
        self.allowed_extensions.iter().any(|e| *e == extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.port, 9999);
        assert_eq!(config.max_file_size, 20 * 1024 * 1024);
        assert_eq!(config.max_files, 10);
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.allowed_extensions.len(), 17);
    }

    #[test]
    fn test_development_config() {
        let config = AppConfig::development("/tmp/uploads");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.upload_path, PathBuf::from("/tmp/uploads"));
    }

    #[test]
    fn test_extension_allowlist() {
        let config = AppConfig::default();
        assert!(config.is_extension_allowed("pdf"));
        assert!(config.is_extension_allowed(".PDF"));
        assert!(config.is_extension_allowed("markdown"));
        assert!(!config.is_extension_allowed("exe"));
        assert!(!config.is_extension_allowed(""));
    }

    #[test]
    fn test_body_limit_covers_all_files() {
        let config = AppConfig::default();
        assert!(config.body_limit() > config.max_file_size * config.max_files);
    }
}

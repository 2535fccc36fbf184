use chrono::Utc;
use rand::Rng;
use std::path::Path;
use validator::ValidationErrors;

pub const TITLE_MIN_CHARS: usize = 5;
pub const TITLE_MAX_CHARS: usize = 100;
pub const CONTENT_MAX_CHARS: usize = 50_000;
pub const SUMMARY_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Field-length rules shared by case create and update.
pub fn validate_case_fields(
    title: Option<&str>,
    content: Option<&str>,
    summary: Option<&str>,
) -> Result<(), ValidationError> {
    let title = title.map(str::trim).unwrap_or_default();
    let content = content.unwrap_or_default();

    if title.is_empty() || content.trim().is_empty() {
        return Err(ValidationError {
            code: "MISSING_FIELDS",
            message: "标题和内容不能为空".to_string(),
        });
    }

    let title_len = char_len(title);
    if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&title_len) {
        return Err(ValidationError {
            code: "TITLE_LENGTH",
            message: format!(
                "案例标题长度应为{}到{}个字",
                TITLE_MIN_CHARS, TITLE_MAX_CHARS
            ),
        });
    }

    if char_len(content) > CONTENT_MAX_CHARS {
        return Err(ValidationError {
            code: "CONTENT_TOO_LONG",
            message: format!("案例正文不能超过{}字", CONTENT_MAX_CHARS),
        });
    }

    if summary.is_some_and(|s| char_len(s) > SUMMARY_MAX_CHARS) {
        return Err(ValidationError {
            code: "SUMMARY_TOO_LONG",
            message: format!("案例摘要不能超过{}字", SUMMARY_MAX_CHARS),
        });
    }

    Ok(())
}

/// Lowercased extension of a client-supplied filename, without the dot.
pub fn file_extension(original_name: &str) -> Option<String> {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Storage name for an upload: `<unix millis>-<0..=999>.<ext>`.
///
/// Two uploads in the same millisecond can collide.
pub fn generate_stored_filename(original_name: &str) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let random: u16 = rand::thread_rng().gen_range(0..=999);
    match file_extension(original_name) {
        Some(ext) => format!("{}-{}.{}", timestamp, random, ext),
        None => format!("{}-{}", timestamp, random),
    }
}

/// First human-readable message out of a `validator` error set.
pub fn first_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}

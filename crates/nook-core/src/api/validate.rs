//! Client-side mirrors of the backend request validators.
//!
//! Rejecting locally saves a round-trip and yields the same messages the
//! backend would send back.

use std::sync::LazyLock;

use regex::Regex;

use super::{ApiError, ApiResult};
use crate::models::Folder;

/// Longest note body the backend accepts, in characters.
pub const MAX_NOTE_CONTENT_CHARS: usize = 50_000;
pub const MIN_PASSWORD_CHARS: usize = 6;
pub const MAX_DISPLAY_NAME_CHARS: usize = 30;
pub const DEFAULT_DISPLAY_NAME: &str = "User";

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    /// Login: any non-empty password
    Present,
    /// Registration: at least [`MIN_PASSWORD_CHARS`]
    MinLength,
}

/// Trim and lowercase an email address, rejecting malformed ones.
pub fn normalize_email(raw: &str) -> ApiResult<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::InvalidInput("Email is required".to_string()));
    }
    if !EMAIL_PATTERN.is_match(&email) {
        return Err(ApiError::InvalidInput("Invalid email format".to_string()));
    }
    Ok(email)
}

pub fn validate_password(password: &str, rule: PasswordRule) -> ApiResult<()> {
    match rule {
        PasswordRule::Present if password.is_empty() => {
            Err(ApiError::InvalidInput("Password is required".to_string()))
        }
        PasswordRule::MinLength if password.chars().count() < MIN_PASSWORD_CHARS => {
            Err(ApiError::InvalidInput(format!(
                "Password must be at least {MIN_PASSWORD_CHARS} characters long"
            )))
        }
        _ => Ok(()),
    }
}

/// Trimmed display name, or the default when none was given.
pub fn validate_display_name(raw: Option<&str>) -> ApiResult<String> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_DISPLAY_NAME.to_string());
    };
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidInput("Display name is required".to_string()));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(ApiError::InvalidInput("Display name too long".to_string()));
    }
    Ok(name.to_string())
}

/// Check a folder tree against the `/updateData` body rules.
pub fn validate_folders(folders: &[Folder]) -> ApiResult<()> {
    for folder in folders {
        for note in &folder.notes {
            if note.content.chars().count() > MAX_NOTE_CONTENT_CHARS {
                return Err(ApiError::InvalidInput(format!(
                    "Note {} content too long (max 50,000 characters)",
                    note.id
                )));
            }
        }
    }
    Ok(())
}

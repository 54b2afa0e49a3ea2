//! Wire types of the backend user API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::validate::{normalize_email, validate_display_name, validate_password, PasswordRule};
use super::ApiResult;
use crate::models::timestamp;
use crate::models::{Folder, Note};

/// Body of `POST /login`
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    /// Build a validated login request; the email is trimmed and lowercased.
    pub fn new(email: &str, password: &str) -> ApiResult<Self> {
        let email = normalize_email(email)?;
        validate_password(password, PasswordRule::Present)?;
        Ok(Self {
            email,
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /register`
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

impl RegisterRequest {
    /// Build a validated registration request.
    ///
    /// A missing display name falls back to `"User"`.
    pub fn new(email: &str, password: &str, display_name: Option<&str>) -> ApiResult<Self> {
        let email = normalize_email(email)?;
        validate_password(password, PasswordRule::MinLength)?;
        let display_name = validate_display_name(display_name)?;
        Ok(Self {
            email,
            password: password.to_string(),
            display_name,
        })
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Response of `POST /login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub token: String,
    #[serde(default)]
    pub user: Option<RemoteUser>,
}

/// Response of `POST /register`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub token: String,
    #[serde(default)]
    pub new_user: Option<RemoteUser>,
}

/// Body of `PATCH /updateData`: the whole physical folder tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDataRequest {
    pub user_id: String,
    pub folders: Vec<Folder>,
}

/// Response of `PATCH /updateData`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDataResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<RemoteUser>,
}

/// A user document as returned by the backend.
///
/// Unknown fields (password hash, sync bookkeeping) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub folders: Option<Vec<RemoteFolder>>,
}

/// A folder as stored by the backend; every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFolder {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "readable_notes")]
    pub notes: Option<Vec<Note>>,
}

/// Decode a folder's notes, skipping any the client cannot read.
fn readable_notes<'de, D>(deserializer: D) -> Result<Option<Vec<Note>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw.map(|notes| {
        notes
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Note>(value) {
                Ok(note) => Some(note),
                Err(error) => {
                    tracing::warn!("Skipping unreadable note from server: {error}");
                    None
                }
            })
            .collect()
    }))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn login_request_debug_redacts_password() {
        let request = LoginRequest::new("ada@example.com", "hunter22").unwrap();
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("hunter22"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn register_request_serializes_display_name_in_camel_case() {
        let request = RegisterRequest::new("ada@example.com", "hunter22", Some("Ada")).unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["displayName"], "Ada");
    }

    #[test]
    fn register_response_reads_new_user_with_server_folder_shape() {
        let payload = r#"{
            "message": "Registration successful",
            "token": "t",
            "newUser": {
                "id": "u1",
                "email": "ada@example.com",
                "password": "$2a$13$hash",
                "displayName": "Ada",
                "folders": [
                    { "name": "All notes", "id": "all notes", "createdAt": {"_seconds": 1714557600, "_nanoseconds": 0}, "notes": [] }
                ]
            }
        }"#;
        let response: RegisterResponse = serde_json::from_str(payload).unwrap();
        let user = response.new_user.unwrap();
        let folders = user.folders.unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].id.as_deref(), Some("all notes"));
        assert_eq!(folders[0].created_at.unwrap().timestamp(), 1_714_557_600);
        assert!(folders[0].icon.is_none());
    }

    #[test]
    fn login_response_tolerates_null_and_unreadable_notes() {
        let payload = r#"{
            "token": "t",
            "user": {
                "folders": [{
                    "name": "Work",
                    "notes": [
                        { "id": "n1", "title": null, "tags": null },
                        { "id": null, "content": "lost" },
                        { "id": "n2", "content": "kept", "isFavourite": null }
                    ]
                }]
            }
        }"#;
        let response: LoginResponse = serde_json::from_str(payload).unwrap();
        let folders = response.user.unwrap().folders.unwrap();
        let notes = folders[0].notes.as_ref().unwrap();

        let ids: Vec<_> = notes.iter().map(|note| note.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2"]);
        assert_eq!(notes[0].title, "");
        assert!(notes[0].tags.is_empty());
        assert_eq!(notes[1].content, "kept");
        assert!(!notes[1].is_favourite);
    }

    #[test]
    fn update_request_uses_user_id_key() {
        let request = UpdateDataRequest {
            user_id: "u1".to_string(),
            folders: vec![Folder::custom("Work")],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["folders"][0]["name"], "Work");
        assert!(value["folders"][0]["notes"].is_array());
    }
}

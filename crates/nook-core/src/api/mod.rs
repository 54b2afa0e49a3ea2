//! Client for the backend user API.
//!
//! The backend exposes four endpoints under a common base URL (by default
//! `http://localhost:8080/users`): `POST /login`, `POST /register`,
//! `PATCH /updateData` and `GET /:id`. Sync and session code depend on the
//! [`RemoteApi`] trait so tests can swap in a fake.

#[cfg(test)]
pub(crate) mod fake;
mod types;
pub mod validate;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

pub use types::{
    LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, RemoteFolder, RemoteUser,
    UpdateDataRequest, UpdateDataResponse,
};

use crate::util::{compact_text, is_http_url, normalize_text_option};

/// One rejected field from a `400` validation response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldError {
    pub msg: String,
    #[serde(default, alias = "param")]
    pub path: Option<String>,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{path}: {}", self.msg),
            None => f.write_str(&self.msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API configuration: {0}")]
    InvalidConfiguration(String),
    /// Rejected locally before any request was sent
    #[error("{0}")]
    InvalidInput(String),
    #[error("Validation failed: {}", join_fields(.0))]
    InvalidFields(Vec<FieldError>),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Unexpected response (HTTP {status}): {message}")]
    Status { status: u16, message: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ApiError {
    /// Map a non-success response onto the backend's error taxonomy.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed = ErrorBody::parse(status, body);
        match status {
            StatusCode::BAD_REQUEST if !parsed.fields.is_empty() => {
                Self::InvalidFields(parsed.fields)
            }
            StatusCode::BAD_REQUEST => Self::BadRequest(parsed.message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(parsed.message),
            StatusCode::NOT_FOUND => Self::NotFound(parsed.message),
            StatusCode::CONFLICT => Self::Conflict(parsed.message),
            status if status.is_server_error() => Self::Server(parsed.message),
            status => Self::Status {
                status: status.as_u16(),
                message: parsed.message,
            },
        }
    }

    /// Whether the credential was rejected by the server.
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Error payloads are either a bare JSON string, `{ errors: [..] }` from the
/// request validators, or `{ message }` / `{ error }`.
struct ErrorBody {
    message: String,
    fields: Vec<FieldError>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawErrorBody {
    Text(String),
    Object {
        #[serde(default)]
        errors: Vec<FieldError>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
}

impl ErrorBody {
    fn parse(status: StatusCode, body: &str) -> Self {
        let fallback = || {
            let trimmed = compact_text(body);
            if trimmed.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                trimmed
            }
        };

        match serde_json::from_str::<RawErrorBody>(body) {
            Ok(RawErrorBody::Text(text)) => Self {
                message: compact_text(&text),
                fields: Vec::new(),
            },
            Ok(RawErrorBody::Object {
                errors,
                message,
                error,
            }) => {
                let message = normalize_text_option(message.or(error))
                    .or_else(|| (!errors.is_empty()).then(|| join_fields(&errors)))
                    .unwrap_or_else(fallback);
                Self {
                    message,
                    fields: errors,
                }
            }
            Err(_) => Self {
                message: fallback(),
                fields: Vec::new(),
            },
        }
    }
}

/// Operations the sync engine and session need from the backend.
pub trait RemoteApi: Send + Sync + 'static {
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = ApiResult<LoginResponse>> + Send;

    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = ApiResult<RegisterResponse>> + Send;

    /// Replace the server's copy of the folder tree wholesale.
    fn update_data(
        &self,
        token: &str,
        request: &UpdateDataRequest,
    ) -> impl Future<Output = ApiResult<UpdateDataResponse>> + Send;

    fn get_user(
        &self,
        token: &str,
        user_id: &str,
    ) -> impl Future<Output = ApiResult<RemoteUser>> + Send;
}

/// `reqwest` implementation of [`RemoteApi`]
#[derive(Clone)]
pub struct HttpRemoteApi {
    base_url: String,
    client: Client,
}

impl HttpRemoteApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.into())?,
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn user_url(&self, user_id: &str) -> ApiResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| ApiError::InvalidConfiguration(error.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| {
                ApiError::InvalidConfiguration("base URL cannot carry a path".to_string())
            })?
            .pop_if_empty()
            .push(user_id);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = request.header(ACCEPT, "application/json").send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_response(status, &body));
        }
        Ok(response.json::<T>().await?)
    }
}

impl RemoteApi for HttpRemoteApi {
    async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        self.send(self.client.post(self.endpoint("login")).json(request))
            .await
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<RegisterResponse> {
        self.send(self.client.post(self.endpoint("register")).json(request))
            .await
    }

    async fn update_data(
        &self,
        token: &str,
        request: &UpdateDataRequest,
    ) -> ApiResult<UpdateDataResponse> {
        self.send(
            self.client
                .patch(self.endpoint("updateData"))
                .bearer_auth(token)
                .json(request),
        )
        .await
    }

    async fn get_user(&self, token: &str, user_id: &str) -> ApiResult<RemoteUser> {
        let url = self.user_url(user_id)?;
        self.send(self.client.get(url).bearer_auth(token)).await
    }
}

fn normalize_base_url(raw: String) -> ApiResult<String> {
    let url = normalize_text_option(Some(raw)).ok_or_else(|| {
        ApiError::InvalidConfiguration("API base URL must not be empty".to_string())
    })?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(ApiError::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

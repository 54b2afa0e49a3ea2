//! In-memory [`RemoteApi`] used by tests.

use std::collections::HashMap;
use std::sync::Mutex;

use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::StatusCode;

use super::{
    ApiError, ApiResult, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
    RemoteApi, RemoteFolder, RemoteUser, UpdateDataRequest, UpdateDataResponse,
};
use crate::util::lock;

/// Sign a token carrying the claims the backend puts in it.
pub(crate) fn issue_token(id: &str, email: &str, display_name: &str) -> String {
    let claims = serde_json::json!({
        "id": id,
        "email": email,
        "displayName": display_name,
        "iat": 1_714_557_600,
        "exp": 1_714_557_660,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"server-secret"),
    )
    .unwrap()
}

struct Account {
    password: String,
    user: RemoteUser,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    accounts: Mutex<HashMap<String, Account>>,
    pushes: Mutex<Vec<UpdateDataRequest>>,
    push_failure: Mutex<Option<StatusCode>>,
    calls: Mutex<usize>,
}

impl FakeApi {
    pub(crate) fn with_account(email: &str, password: &str, folders: Vec<RemoteFolder>) -> Self {
        let api = Self::default();
        api.add_account(email, password, folders);
        api
    }

    pub(crate) fn add_account(&self, email: &str, password: &str, folders: Vec<RemoteFolder>) {
        let id = format!("user-{}", lock(&self.accounts).len() + 1);
        lock(&self.accounts).insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: RemoteUser {
                    id: Some(id),
                    email: Some(email.to_string()),
                    display_name: Some("Ada".to_string()),
                    folders: Some(folders),
                },
            },
        );
    }

    pub(crate) fn pushes(&self) -> Vec<UpdateDataRequest> {
        lock(&self.pushes).clone()
    }

    /// Number of requests of any kind received.
    pub(crate) fn calls(&self) -> usize {
        *lock(&self.calls)
    }

    pub(crate) fn fail_pushes_with(&self, status: StatusCode) {
        *lock(&self.push_failure) = Some(status);
    }

    fn record_call(&self) {
        *lock(&self.calls) += 1;
    }

    fn token_for(user: &RemoteUser) -> String {
        issue_token(
            user.id.as_deref().unwrap_or_default(),
            user.email.as_deref().unwrap_or_default(),
            user.display_name.as_deref().unwrap_or("User"),
        )
    }
}

impl RemoteApi for FakeApi {
    async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        self.record_call();
        let accounts = lock(&self.accounts);
        let account = accounts
            .get(&request.email)
            .ok_or_else(|| ApiError::NotFound("No user found with this email".to_string()))?;
        if account.password != request.password {
            return Err(ApiError::Unauthorized(
                "Wrong password for specified email address".to_string(),
            ));
        }
        Ok(LoginResponse {
            message: Some("Login successful".to_string()),
            token: Self::token_for(&account.user),
            user: Some(account.user.clone()),
        })
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<RegisterResponse> {
        self.record_call();
        if lock(&self.accounts).contains_key(&request.email) {
            return Err(ApiError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }
        let starter = RemoteFolder {
            id: Some("all notes".to_string()),
            name: Some("All notes".to_string()),
            notes: Some(Vec::new()),
            ..RemoteFolder::default()
        };
        self.add_account(&request.email, &request.password, vec![starter]);
        let user = lock(&self.accounts)[&request.email].user.clone();
        Ok(RegisterResponse {
            message: Some("Registration successful".to_string()),
            token: Self::token_for(&user),
            new_user: Some(user),
        })
    }

    async fn update_data(
        &self,
        _token: &str,
        request: &UpdateDataRequest,
    ) -> ApiResult<UpdateDataResponse> {
        self.record_call();
        if let Some(status) = *lock(&self.push_failure) {
            return Err(ApiError::from_response(status, r#""push rejected""#));
        }
        lock(&self.pushes).push(request.clone());
        Ok(UpdateDataResponse {
            message: Some("User data updated successfully".to_string()),
            user: None,
        })
    }

    async fn get_user(&self, _token: &str, user_id: &str) -> ApiResult<RemoteUser> {
        self.record_call();
        lock(&self.accounts)
            .values()
            .find(|account| account.user.id.as_deref() == Some(user_id))
            .map(|account| account.user.clone())
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }
}

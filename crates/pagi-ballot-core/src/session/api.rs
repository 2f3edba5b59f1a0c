//! Auth API client: the remote collaborator behind login, register, verify, and profile.
//!
//! - `POST /api/auth/login {epicId, otp} -> {token, user} | {message}`
//! - `POST /api/auth/register {voterEpicId, ...} -> {} | {message}`
//! - `GET /api/auth/verify` (bearer) `-> user | 4xx`
//! - `PUT /api/auth/profile` (bearer, partial user) `-> {user} | {message}`

use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::AuthApiError;
use crate::session::user::{RegistrationRequest, UserPatch, UserProfile};

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const VERIFY_PATH: &str = "/api/auth/verify";
const PROFILE_PATH: &str = "/api/auth/profile";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub epic_id: String,
    pub otp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

/// Error body every endpoint may return.
#[derive(Debug, Deserialize)]
struct MessageBody {
    message: Option<String>,
}

/// Verify answers with the bare user; some deployments wrap it as `{user}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VerifyBody {
    Wrapped { user: UserProfile },
    Bare(UserProfile),
}

#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AuthApiError>;
    async fn register(&self, request: &RegistrationRequest) -> Result<(), AuthApiError>;
    async fn verify(&self, token: &str) -> Result<UserProfile, AuthApiError>;
    async fn update_profile(&self, token: &str, patch: &UserPatch) -> Result<UserProfile, AuthApiError>;
}

/// reqwest-backed client against a base URL.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(client, &config.api_base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Read the body; map non-success statuses to `Rejected` with the server's message.
    async fn read(res: reqwest::Response) -> Result<String, AuthApiError> {
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<MessageBody>(&text)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.trim().is_empty());
            return Err(AuthApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(text)
    }

    fn decode<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, AuthApiError> {
        serde_json::from_str(text).map_err(|e| AuthApiError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AuthApiError> {
        let res = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(request)
            .send()
            .await?;
        let text = Self::read(res).await?;
        Self::decode(&text)
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<(), AuthApiError> {
        let res = self
            .client
            .post(self.url(REGISTER_PATH))
            .json(request)
            .send()
            .await?;
        Self::read(res).await?;
        Ok(())
    }

    async fn verify(&self, token: &str) -> Result<UserProfile, AuthApiError> {
        let res = self
            .client
            .get(self.url(VERIFY_PATH))
            .bearer_auth(token)
            .send()
            .await?;
        let text = Self::read(res).await?;
        match Self::decode::<VerifyBody>(&text)? {
            VerifyBody::Wrapped { user } | VerifyBody::Bare(user) => Ok(user),
        }
    }

    async fn update_profile(&self, token: &str, patch: &UserPatch) -> Result<UserProfile, AuthApiError> {
        let res = self
            .client
            .put(self.url(PROFILE_PATH))
            .bearer_auth(token)
            .json(patch)
            .send()
            .await?;
        let text = Self::read(res).await?;
        let body: ProfileResponse = Self::decode(&text)?;
        Ok(body.user)
    }
}

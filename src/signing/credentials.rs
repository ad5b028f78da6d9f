//! Credential sources used to sign upload policies.
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

/// Temporary or long-lived signing credentials.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            expires_at: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// True when the credentials stay valid for at least `window` after `now`.
    pub fn is_valid_for(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - now >= window,
            None => true,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "** redacted **"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Errors raised while obtaining credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("credentials are incomplete")]
    Incomplete,
    #[error("identity service request failed")]
    Request(#[source] reqwest::Error),
    #[error("identity service returned status {0}")]
    Status(u16),
    #[error("malformed identity service response: {0}")]
    MalformedResponse(String),
}

/// Source of signing credentials.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Returns credentials that remain valid for at least `valid_for`.
    async fn credentials(&self, valid_for: Duration) -> Result<Credentials, CredentialsError>;
}

/// Fixed credentials taken from configuration.
#[derive(Clone, Debug)]
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentials {
    async fn credentials(&self, _valid_for: Duration) -> Result<Credentials, CredentialsError> {
        if self.credentials.access_key_id.is_empty() || self.credentials.secret_access_key.is_empty()
        {
            return Err(CredentialsError::Incomplete);
        }
        Ok(self.credentials.clone())
    }
}

const GET_ID_TARGET: &str = "AWSCognitoIdentityService.GetId";
const GET_CREDENTIALS_TARGET: &str = "AWSCognitoIdentityService.GetCredentialsForIdentity";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetIdResponse {
    identity_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetCredentialsResponse {
    credentials: IdentityCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IdentityCredentials {
    access_key_id: String,
    secret_key: String,
    session_token: String,
    /// Seconds since the epoch.
    expiration: f64,
}

#[derive(Debug, Default)]
struct IdentityState {
    identity_id: Option<String>,
    credentials: Option<Credentials>,
}

/// Unauthenticated identity-pool credentials, cached until they get close
/// to expiry.
#[derive(Debug)]
pub struct IdentityPoolCredentials {
    client: reqwest::Client,
    endpoint: String,
    pool_id: String,
    state: Mutex<IdentityState>,
}

impl IdentityPoolCredentials {
    pub fn new(client: reqwest::Client, region: &str, pool_id: impl Into<String>) -> Self {
        Self::with_endpoint(
            client,
            format!("https://cognito-identity.{region}.amazonaws.com/"),
            pool_id,
        )
    }

    pub fn with_endpoint(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        pool_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            pool_id: pool_id.into(),
            state: Mutex::new(IdentityState::default()),
        }
    }

    async fn call<T>(&self, target: &str, body: serde_json::Value) -> Result<T, CredentialsError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", target)
            .header(CONTENT_TYPE, AMZ_JSON)
            .body(body.to_string())
            .send()
            .await
            .map_err(CredentialsError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CredentialsError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(CredentialsError::Request)?;
        serde_json::from_slice(&bytes).map_err(|e| CredentialsError::MalformedResponse(e.to_string()))
    }

    async fn fetch_identity_id(&self) -> Result<String, CredentialsError> {
        let response: GetIdResponse = self
            .call(GET_ID_TARGET, json!({ "IdentityPoolId": self.pool_id }))
            .await?;
        Ok(response.identity_id)
    }

    async fn fetch_credentials(&self, identity_id: &str) -> Result<Credentials, CredentialsError> {
        let response: GetCredentialsResponse = self
            .call(GET_CREDENTIALS_TARGET, json!({ "IdentityId": identity_id }))
            .await?;
        let raw = response.credentials;
        let expires_at = DateTime::from_timestamp(raw.expiration.trunc() as i64, 0).ok_or_else(
            || CredentialsError::MalformedResponse(format!("invalid expiration {}", raw.expiration)),
        )?;

        Ok(Credentials::new(raw.access_key_id, raw.secret_key)
            .with_session_token(raw.session_token)
            .with_expiry(expires_at))
    }
}

#[async_trait]
impl CredentialsProvider for IdentityPoolCredentials {
    async fn credentials(&self, valid_for: Duration) -> Result<Credentials, CredentialsError> {
        let mut state = self.state.lock().await;

        if let Some(cached) = &state.credentials {
            if cached.is_valid_for(Utc::now(), valid_for) {
                return Ok(cached.clone());
            }
        }

        let identity_id = match state.identity_id.clone() {
            Some(id) => id,
            None => {
                let id = self.fetch_identity_id().await?;
                log::debug!("Obtained identity {id}");
                state.identity_id = Some(id.clone());
                id
            }
        };

        let credentials = self.fetch_credentials(&identity_id).await?;
        if !credentials.is_valid_for(Utc::now(), valid_for) {
            log::warn!(
                "Identity credentials expire at {:?}, before issued authorizations",
                credentials.expires_at()
            );
        }
        state.credentials = Some(credentials.clone());
        Ok(credentials)
    }
}

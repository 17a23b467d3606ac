//! Credential validation against the DeepSeek API.
//!
//! A key is considered valid when the cheapest authenticated call, listing
//! models, succeeds. The call is made once; there is no retry loop. Failures
//! are reduced to three categories the setup form can report.

use async_openai::error::ApiError;
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{config::IntegrationConfig, host::CredentialData};

/// API key as handed to network code.
#[derive(Clone, Debug)]
pub struct ApiCredential {
    pub api_key: SecretString,
}

impl From<CredentialData> for ApiCredential {
    fn from(data: CredentialData) -> Self {
        Self {
            api_key: SecretString::from(data.api_key),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CredentialError {
    #[error("Cannot connect: {0}")]
    CannotConnect(String),

    #[error("Invalid authentication: {0}")]
    InvalidAuth(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

#[mockall::automock]
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(&self, credential: &ApiCredential) -> Result<(), CredentialError>;
}

/// Error body of the OpenAI-compatible API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// Validates keys with a single `GET {api_base}/models`.
#[derive(Debug, Clone)]
pub struct DeepSeekValidator {
    api_base: String,
    timeout: Duration,
}

impl DeepSeekValidator {
    pub fn new(config: &IntegrationConfig) -> Self {
        Self {
            api_base: config.api_base.clone(),
            timeout: config.validation_timeout,
        }
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.api_base.trim_end_matches('/'))
    }

    fn http_client(&self) -> Result<reqwest::Client, CredentialError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| CredentialError::Unknown(format!("Failed to build HTTP client: {}", e)))
    }
}

#[async_trait]
impl CredentialValidator for DeepSeekValidator {
    #[instrument(level = "debug", skip(self, credential), fields(api_base = %self.api_base))]
    async fn validate(&self, credential: &ApiCredential) -> Result<(), CredentialError> {
        let response = self
            .http_client()?
            .get(self.models_url())
            .bearer_auth(credential.api_key.expose_secret())
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;
        classify_response(status, &body)
    }
}

const AUTH_ERROR_MARKERS: [&str; 3] = ["authentication_error", "invalid_api_key", "invalid_auth"];

/// Failures before a complete response was read.
pub fn classify_transport_error(error: reqwest::Error) -> CredentialError {
    if error.is_connect() || error.is_timeout() || error.is_request() {
        CredentialError::CannotConnect(error.to_string())
    } else {
        CredentialError::Unknown(error.to_string())
    }
}

/// Sorts a complete list-models response into accepted or one of the
/// reportable categories. The status decides first; the body only refines
/// non-auth failures.
pub fn classify_response(status: StatusCode, body: &str) -> Result<(), CredentialError> {
    if status.is_success() {
        let count = serde_json::from_str::<ModelList>(body)
            .map(|list| list.data.len())
            .ok();
        debug!(?count, "credential accepted");
        return Ok(());
    }

    let api_error = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|body| body.error);

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        let message = api_error
            .map(|e| e.message)
            .unwrap_or_else(|| format!("HTTP {}", status));
        return Err(CredentialError::InvalidAuth(message));
    }

    match api_error {
        Some(api_error) => {
            let is_auth = [api_error.r#type.as_deref(), api_error.code.as_deref()]
                .into_iter()
                .flatten()
                .any(|marker| AUTH_ERROR_MARKERS.contains(&marker));
            if is_auth {
                Err(CredentialError::InvalidAuth(api_error.message))
            } else {
                Err(CredentialError::Unknown(api_error.message))
            }
        }
        None => Err(CredentialError::Unknown(format!("HTTP {}: {}", status, body))),
    }
}

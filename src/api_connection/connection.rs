use async_trait::async_trait;
use dotenv::dotenv;
use reqwest::Client;
use std::env;
use std::error::Error;
use std::fmt;

use super::endpoints::{
    GenerateContentRequest, GenerateContentResponse, DEFAULT_GEMINI_MODEL, GEMINI_API_BASE_URL,
};
use super::ModelClient;
use crate::image_input::PreparedImage;

#[derive(Debug)]
pub enum ApiConnectionError {
    MissingApiKey(String),
    NetworkError(reqwest::Error),
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
    EmptyResponse,
}

impl fmt::Display for ApiConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiConnectionError::MissingApiKey(key_name) => {
                write!(f, "API key not found in environment: {}", key_name)
            }
            ApiConnectionError::NetworkError(err) => write!(f, "Network error: {}", err),
            ApiConnectionError::ApiError { status, error_body } => {
                write!(f, "API error {}: {}", status, error_body)
            }
            ApiConnectionError::EmptyResponse => {
                write!(f, "Model returned an empty response")
            }
        }
    }
}

impl Error for ApiConnectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiConnectionError::NetworkError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiConnectionError {
    fn from(err: reqwest::Error) -> Self {
        ApiConnectionError::NetworkError(err)
    }
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Reads the API key from the named environment variable (loading a
    /// `.env` file when present). Model defaults to the flash tier unless
    /// `GEMINI_MODEL` overrides it.
    pub fn from_env(api_key_env_var: &str) -> Result<Self, ApiConnectionError> {
        dotenv().ok();
        let api_key = env::var(api_key_env_var)
            .map_err(|_| ApiConnectionError::MissingApiKey(api_key_env_var.to_string()))?;
        let model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        Ok(Self::new(api_key, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        image: Option<&PreparedImage>,
    ) -> Result<String, ApiConnectionError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_BASE_URL, self.model, self.api_key
        );
        let request = GenerateContentRequest::single_turn(prompt, image);

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(ApiConnectionError::ApiError { status, error_body });
        }

        let parsed = response.json::<GenerateContentResponse>().await?;
        parsed.text().ok_or(ApiConnectionError::EmptyResponse)
    }
}

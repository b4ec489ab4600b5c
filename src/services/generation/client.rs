use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::GenerationSettings;
use crate::services::generation::wire::{GenerateContentRequest, GenerateContentResponse};
use crate::services::generation::GenerationError;

/// Anything that can answer a `generateContent` call for a given model.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Gemini REST client. One request per call, no retries.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(settings: &GenerationSettings) -> Result<Self, GenerationError> {
        Self::with_http_client(settings, Client::builder().build()?)
    }

    /// Same as [`GeminiClient::new`] but gives up on any call that takes longer than `timeout`.
    pub fn with_timeout(
        settings: &GenerationSettings,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        Self::with_http_client(settings, Client::builder().timeout(timeout).build()?)
    }

    fn with_http_client(
        settings: &GenerationSettings,
        client: Client,
    ) -> Result<Self, GenerationError> {
        if settings.api_key.trim().is_empty() {
            return Err(GenerationError::InvalidInput(
                "Gemini API key is empty".to_string(),
            ));
        }

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationError> {
        log::debug!("generateContent -> {}", model);

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::warn!("{} generateContent failed with status {}", model, status);
            return Err(service_error(status.as_u16(), &body));
        }

        response.json::<GenerateContentResponse>().await.map_err(|e| {
            GenerationError::MalformedResponse(format!("Failed to parse response: {}", e))
        })
    }
}

/// Turn a non-success body into a `GenerationError`, keeping the service's message.
pub(crate) fn service_error(status: u16, body: &str) -> GenerationError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| env.error.message)
        .unwrap_or_else(|_| body.to_string());

    GenerationError::Service { status, message }
}

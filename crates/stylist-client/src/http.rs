//! reqwest implementation of [`StylistBackend`].

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};

use stylist_core::config::BackendConfig;
use stylist_core::error::StylistError;
use stylist_core::types::{AudioClip, CaptureFormat, HealthStatus};

use crate::wire::{ChatRequestBody, ChatResponseBody, TranscribeResponseBody};
use crate::StylistBackend;

const HEALTH_ROUTE: &str = "/health";
const CHAT_ROUTE: &str = "/api/chat";
const TRANSCRIBE_ROUTE: &str = "/api/transcribe";

/// Talks to the stylist backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    /// Build a client whose every request is bounded by `request_timeout_secs`.
    pub fn new(config: BackendConfig) -> Result<Self, StylistError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| StylistError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

/// Unreachable backends and timeouts are connectivity problems; anything
/// else that goes wrong in transit is attributed to the request itself.
fn transport_error(err: reqwest::Error, wrap: fn(String) -> StylistError) -> StylistError {
    if err.is_connect() || err.is_timeout() {
        StylistError::Connectivity(err.to_string())
    } else {
        wrap(err.to_string())
    }
}

fn status_error(status: StatusCode, wrap: fn(String) -> StylistError) -> StylistError {
    wrap(format!("API error: {}", status.as_u16()))
}

impl StylistBackend for HttpBackend {
    async fn health(&self) -> Result<HealthStatus, StylistError> {
        let url = self.config.endpoint(HEALTH_ROUTE);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StylistError::Connectivity(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, StylistError::Connectivity));
        }

        let health: HealthStatus = response
            .json()
            .await
            .map_err(|e| StylistError::Connectivity(format!("malformed health payload: {}", e)))?;
        tracing::debug!(
            status = %health.status,
            dataset_size = health.dataset_size,
            demo_mode = health.demo_mode,
            "Health check answered"
        );
        Ok(health)
    }

    async fn chat(&self, request: ChatRequestBody) -> Result<ChatResponseBody, StylistError> {
        let url = self.config.endpoint(CHAT_ROUTE);
        tracing::debug!(
            url = %url,
            history_len = request.conversation_history.len(),
            has_image = request.image_base64.is_some(),
            "Sending chat request"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, StylistError::ChatRequest))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, StylistError::ChatRequest));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, StylistError::ChatRequest))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StylistError::ChatRequest(format!("malformed chat response: {}", e)))
    }

    async fn transcribe(&self, audio: AudioClip) -> Result<String, StylistError> {
        let url = self.config.endpoint(TRANSCRIBE_ROUTE);
        let file_name = CaptureFormat::from_mime_type(&audio.mime_type)
            .unwrap_or(CaptureFormat::Webm)
            .file_name();
        tracing::debug!(url = %url, bytes = audio.len(), mime_type = %audio.mime_type, "Uploading recording");

        let part = Part::bytes(audio.data)
            .file_name(file_name)
            .mime_str(&audio.mime_type)
            .map_err(|e| StylistError::Transcription(format!("invalid mime type: {}", e)))?;
        let form = Form::new().part("audio", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StylistError::Transcription(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, StylistError::Transcription));
        }

        let body: TranscribeResponseBody = response.json().await.map_err(|e| {
            StylistError::Transcription(format!("malformed transcription response: {}", e))
        })?;
        Ok(body.transcript)
    }
}

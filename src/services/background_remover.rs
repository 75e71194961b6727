// src/services/background_remover.rs
use crate::config::{ProviderConfig, ProviderKind};
use crate::errors::IntakeError;
use crate::services::image_processor::ImageProcessor;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A service that strips the background from the image stored at `source`
/// and hands back the result as a base64-encoded image.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove_background(&self, source: &Path) -> Result<String, IntakeError>;
    fn name(&self) -> &str;
}

pub fn from_config(config: &ProviderConfig) -> Result<Arc<dyn BackgroundRemover>, IntakeError> {
    match config.kind {
        ProviderKind::RemoveBg => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                IntakeError::Provider("remove.bg API key not configured".to_string())
            })?;
            Ok(Arc::new(RemoveBgClient::new(api_key, config.api_url.clone())))
        }
        ProviderKind::Mock => Ok(Arc::new(MockBackgroundRemover::new(
            Duration::from_millis(config.mock_delay_ms),
        ))),
    }
}

pub struct RemoveBgClient {
    api_key: String,
    api_url: String,
    client: Client,
}

impl RemoveBgClient {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            api_key,
            api_url,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl BackgroundRemover for RemoveBgClient {
    async fn remove_background(&self, source: &Path) -> Result<String, IntakeError> {
        let image_data = tokio::fs::read(source).await.map_err(|e| {
            IntakeError::Storage(format!("Failed to read {}: {}", source.display(), e))
        })?;

        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();

        let form = Form::new()
            .part("image_file", Part::bytes(image_data).file_name(file_name))
            .text("size", "regular")
            .text("type", "auto");

        let response = self
            .client
            .post(&self.api_url)
            .header("X-Api-Key", &self.api_key)
            .header("Accept", "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| IntakeError::Provider(format!("remove.bg request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(IntakeError::Provider(format!(
                "remove.bg error ({}): {}",
                status,
                describe_error(&error_text)
            )));
        }

        let result: Value = response.json().await.map_err(|e| {
            IntakeError::Provider(format!("Failed to parse remove.bg response: {}", e))
        })?;

        extract_payload(&result)
    }

    fn name(&self) -> &str {
        "remove.bg"
    }
}

fn extract_payload(result: &Value) -> Result<String, IntakeError> {
    result["data"]["result_b64"]
        .as_str()
        .filter(|b64| !b64.is_empty())
        .map(str::to_string)
        .ok_or(IntakeError::EmptyPayload)
}

fn describe_error(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["errors"][0]["title"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Offline stand-in: waits for the simulated delay, then returns the source
/// image re-encoded as PNG with its background untouched.
pub struct MockBackgroundRemover {
    delay: Duration,
    image_processor: ImageProcessor,
}

impl MockBackgroundRemover {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            image_processor: ImageProcessor::new(),
        }
    }
}

#[async_trait]
impl BackgroundRemover for MockBackgroundRemover {
    async fn remove_background(&self, source: &Path) -> Result<String, IntakeError> {
        tokio::time::sleep(self.delay).await;

        let image_data = tokio::fs::read(source).await.map_err(|e| {
            IntakeError::Storage(format!("Failed to read {}: {}", source.display(), e))
        })?;
        let png = self
            .image_processor
            .to_png(&image_data)
            .map_err(|e| IntakeError::Provider(format!("Mock provider failed: {}", e)))?;

        Ok(general_purpose::STANDARD.encode(png))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

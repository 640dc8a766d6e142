use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde_json::Value;

use crate::settings::EngineSettings;
use crate::types::{SaveAck, SaveError};

/// Body of the save endpoint: the as-extracted payload, the human-corrected
/// payload, and optionally the invoice image as a data URL.
#[derive(Debug, Clone, Serialize)]
pub struct SaveRecordBody {
    #[serde(rename = "originalData")]
    pub original_data: Value,
    #[serde(rename = "editedData")]
    pub edited_data: Value,
    #[serde(rename = "imageData", skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

/// Persists one corrected record.
#[async_trait::async_trait]
pub trait RecordSaver: Send + Sync {
    async fn save(&self, record: SaveRecordBody) -> Result<SaveAck, SaveError>;
}

#[derive(Debug, Clone)]
pub struct HttpRecordSaver {
    settings: EngineSettings,
}

impl HttpRecordSaver {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, SaveError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|err| SaveError::Network(err.to_string()))
    }
}

#[async_trait::async_trait]
impl RecordSaver for HttpRecordSaver {
    async fn save(&self, record: SaveRecordBody) -> Result<SaveAck, SaveError> {
        let client = self.build_client()?;
        // The save route wants a Bearer token; queue and status take the
        // raw token.
        let response = client
            .post(&self.settings.save_endpoint)
            .header(
                AUTHORIZATION,
                format!("Bearer {}", self.settings.auth_token),
            )
            .json(&record)
            .timeout(self.settings.dispatch_timeout)
            .send()
            .await
            .map_err(map_save_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SaveError::Rejected {
                status: status.as_u16(),
                detail: extract_detail(&detail),
            });
        }

        Ok(response.json().await.unwrap_or_default())
    }
}

/// Error bodies are sometimes JSON with a `detail` or `message` field and
/// sometimes plain text.
fn extract_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "message"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no detail".to_string()
    } else {
        trimmed.to_string()
    }
}

/// The image as the save endpoint expects it: a base64 data URL.
pub fn image_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

fn map_save_error(err: reqwest::Error) -> SaveError {
    if err.is_timeout() {
        return SaveError::Timeout;
    }
    SaveError::Network(err.to_string())
}

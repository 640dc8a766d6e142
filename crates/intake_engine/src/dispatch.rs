use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};

use intake_logging::intake_warn;

use crate::settings::EngineSettings;
use crate::types::{DispatchError, QueueAck};

/// The remote OCR queue, seen from the client side.
#[async_trait::async_trait]
pub trait OcrQueue: Send + Sync {
    /// Enqueue one file; returns the remote job id.
    async fn enqueue(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<String, DispatchError>;

    /// Ask the remote side to begin processing a queued job.
    async fn start(&self, job_id: &str) -> Result<(), DispatchError>;
}

#[derive(Debug, Clone)]
pub struct HttpOcrQueue {
    settings: EngineSettings,
}

impl HttpOcrQueue {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, DispatchError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|err| DispatchError::Network(err.to_string()))
    }

    async fn try_enqueue(
        &self,
        client: &reqwest::Client,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<String, DispatchError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|err| DispatchError::Network(err.to_string()))?;
        let form = Form::new().part("file", part);

        let response = client
            .post(&self.settings.queue_endpoint)
            .header(AUTHORIZATION, self.settings.auth_token.as_str())
            .multipart(form)
            .timeout(self.settings.dispatch_timeout)
            .send()
            .await
            .map_err(map_dispatch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::HttpStatus(status.as_u16()));
        }

        let ack: QueueAck = response
            .json()
            .await
            .map_err(|err| DispatchError::Parse(err.to_string()))?;
        ack.file_id.ok_or(DispatchError::Protocol)
    }
}

#[async_trait::async_trait]
impl OcrQueue for HttpOcrQueue {
    async fn enqueue(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<String, DispatchError> {
        let client = self.build_client()?;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self
                .try_enqueue(&client, file_name, mime, bytes.clone())
                .await
            {
                Ok(job_id) => return Ok(job_id),
                // A 2xx body without the id is a contract violation;
                // retrying cannot change it.
                Err(DispatchError::Protocol) => return Err(DispatchError::Protocol),
                Err(err) if attempt > self.settings.dispatch_retries => return Err(err),
                Err(err) => {
                    intake_warn!(
                        "enqueue attempt {attempt} for {file_name} failed: {err}; retrying"
                    );
                    tokio::time::sleep(self.settings.retry_backoff * attempt).await;
                }
            }
        }
    }

    async fn start(&self, job_id: &str) -> Result<(), DispatchError> {
        let client = self.build_client()?;
        let url = format!(
            "{}/{}",
            self.settings.process_endpoint.trim_end_matches('/'),
            job_id
        );
        let response = client
            .post(url)
            .header(AUTHORIZATION, self.settings.auth_token.as_str())
            .timeout(self.settings.dispatch_timeout)
            .send()
            .await
            .map_err(map_dispatch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::HttpStatus(status.as_u16()));
        }
        Ok(())
    }
}

fn map_dispatch_error(err: reqwest::Error) -> DispatchError {
    if err.is_timeout() {
        return DispatchError::Timeout;
    }
    if err.is_decode() {
        return DispatchError::Parse(err.to_string());
    }
    DispatchError::Network(err.to_string())
}

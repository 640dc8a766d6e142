use reqwest::header::AUTHORIZATION;

use crate::settings::EngineSettings;
use crate::types::{JobStatusDto, PollError, StatusReport};

/// The remote status feed for all known jobs.
#[async_trait::async_trait]
pub trait StatusFeed: Send + Sync {
    async fn fetch(&self) -> Result<Vec<JobStatusDto>, PollError>;
}

#[derive(Debug, Clone)]
pub struct HttpStatusFeed {
    settings: EngineSettings,
}

impl HttpStatusFeed {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, PollError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|err| PollError::Network(err.to_string()))
    }
}

#[async_trait::async_trait]
impl StatusFeed for HttpStatusFeed {
    async fn fetch(&self) -> Result<Vec<JobStatusDto>, PollError> {
        let client = self.build_client()?;
        let response = client
            .get(&self.settings.status_endpoint)
            .header(AUTHORIZATION, self.settings.auth_token.as_str())
            .timeout(self.settings.poll_timeout)
            .send()
            .await
            .map_err(map_poll_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::HttpStatus(status.as_u16()));
        }

        let report: StatusReport = response.json().await.map_err(map_poll_error)?;
        Ok(report.statuses)
    }
}

fn map_poll_error(err: reqwest::Error) -> PollError {
    if err.is_timeout() {
        return PollError::Timeout;
    }
    if err.is_decode() {
        return PollError::Parse(err.to_string());
    }
    PollError::Network(err.to_string())
}

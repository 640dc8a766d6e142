use std::time::Duration;

/// Everything the engine needs to talk to the remote OCR service. The core
/// treats these as opaque constants supplied at startup.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub queue_endpoint: String,
    pub process_endpoint: String,
    pub status_endpoint: String,
    pub save_endpoint: String,
    pub auth_token: String,
    pub connect_timeout: Duration,
    /// Budget for one dispatch or save request.
    pub dispatch_timeout: Duration,
    /// Budget for one status poll; a blown budget is just a skipped tick.
    pub poll_timeout: Duration,
    /// Additional attempts after a failed enqueue.
    pub dispatch_retries: u32,
    /// Linear backoff unit between enqueue attempts.
    pub retry_backoff: Duration,
    /// Cadence of the shell's poll tick.
    pub poll_interval: Duration,
    /// Serve canned results instead of calling the remote service.
    pub use_mock_data: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let base = "http://localhost:1512";
        Self {
            queue_endpoint: format!("{base}/api/ocr/queue"),
            process_endpoint: format!("{base}/api/ocr/process"),
            status_endpoint: format!("{base}/api/ocr/status"),
            save_endpoint: format!("{base}/api/ocr/save"),
            auth_token: String::new(),
            connect_timeout: Duration::from_secs(10),
            dispatch_timeout: Duration::from_secs(30),
            poll_timeout: Duration::from_secs(10),
            dispatch_retries: 2,
            retry_backoff: Duration::from_secs(1),
            poll_interval: Duration::from_secs(2),
            use_mock_data: false,
        }
    }
}

impl EngineSettings {
    /// Settings from `INTAKE_*` environment variables. Endpoints derive
    /// from `INTAKE_API_BASE_URL` unless individually overridden.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let base = env_or("INTAKE_API_BASE_URL", "http://localhost:1512");
        let base = base.trim_end_matches('/').to_string();
        Self {
            queue_endpoint: env_or("INTAKE_QUEUE_ENDPOINT", &format!("{base}/api/ocr/queue")),
            process_endpoint: env_or("INTAKE_PROCESS_ENDPOINT", &format!("{base}/api/ocr/process")),
            status_endpoint: env_or("INTAKE_STATUS_ENDPOINT", &format!("{base}/api/ocr/status")),
            save_endpoint: env_or("INTAKE_SAVE_ENDPOINT", &format!("{base}/api/ocr/save")),
            auth_token: std::env::var("INTAKE_API_TOKEN").unwrap_or_default(),
            use_mock_data: matches!(
                std::env::var("INTAKE_USE_MOCK_DATA").as_deref(),
                Ok("1") | Ok("true")
            ),
            ..defaults
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

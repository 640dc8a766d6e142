use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Acknowledgement from the queue endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueAck {
    #[serde(rename = "fileId")]
    pub file_id: Option<String>,
}

/// Body of the status endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub statuses: Vec<JobStatusDto>,
}

/// One job row as the remote status feed reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusDto {
    pub id: String,
    pub status: RemoteStatus,
    pub progress: Option<u8>,
    pub result: Option<ResultDto>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Queued,
    Processing,
    Completed,
    Error,
    /// Any state the service grows later; treated as not-reported.
    #[serde(other)]
    Unknown,
}

/// The result block attached to terminal rows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultDto {
    #[serde(rename = "ocrData")]
    pub ocr_data: Option<Value>,
    pub filename: Option<String>,
    #[serde(rename = "processedAt")]
    pub processed_at: Option<String>,
    pub message: Option<String>,
}

/// Acknowledgement from the save endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveAck {
    pub id: Option<Value>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("queue endpoint returned http {0}")]
    HttpStatus(u16),
    #[error("queue response missing fileId")]
    Protocol,
    #[error("unparseable queue response: {0}")]
    Parse(String),
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("status endpoint returned http {0}")]
    HttpStatus(u16),
    #[error("malformed status body: {0}")]
    Parse(String),
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save endpoint rejected the record (http {status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
}

/// Events the engine reports back to the shell.
#[derive(Debug)]
pub enum EngineEvent {
    DispatchDone {
        file_id: u64,
        result: Result<String, DispatchError>,
    },
    PollDone {
        result: Result<Vec<JobStatusDto>, PollError>,
    },
    RemovalDue {
        job_id: String,
    },
    SaveDone {
        result: Result<SaveAck, SaveError>,
    },
}

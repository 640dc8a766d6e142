use std::sync::Arc;

use crate::payload::OcrPayload;
use crate::state::{FileId, JobId, JobStatus, PendingSnapshot};

/// A file handed to the store by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub name: String,
    pub mime: String,
    pub bytes: Arc<Vec<u8>>,
}

/// One job row from the remote status feed.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatusUpdate {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: Option<u8>,
    pub result: Option<JobResultUpdate>,
}

/// The result block attached to a terminal status row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobResultUpdate {
    pub ocr_data: Option<serde_json::Value>,
    pub filename: Option<String>,
    pub processed_at: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User added files to the store.
    FilesAdded(Vec<NewFile>),
    /// User switched the current file.
    FileSelected { index: usize },
    /// User removed one file.
    FileDeleted { index: usize },
    /// User cleared the whole store.
    ClearAllFiles,
    /// User asked for the uploaded files to be processed.
    ProcessClicked,
    /// The engine enqueued a file and got a job id back.
    DispatchSucceeded { file_id: FileId, job_id: JobId },
    /// The engine gave up on a file after its retries.
    DispatchFailed { file_id: FileId, message: String },
    /// Fixed-cadence tick driving the watchdog and the status poll.
    PollTick,
    /// A status poll came back.
    PollCompleted { statuses: Vec<JobStatusUpdate> },
    /// A status poll failed; treated as a skipped tick.
    PollFailed,
    /// A terminal entry's display grace period elapsed.
    RemovalDue { job_id: JobId },
    /// User edited the active result.
    EditApplied { payload: OcrPayload },
    /// User asked to save the active result.
    SaveRequested,
    /// The save endpoint accepted the record.
    SaveCompleted { record_id: Option<String> },
    /// The save endpoint rejected the record.
    SaveFailed { message: String },
    /// User opened an entry from the pending-results list.
    PendingResultOpened { id: String },
    /// Restore unviewed results persisted by a previous session.
    RestorePendingResults(Vec<PendingSnapshot>),
    /// Fallback for placeholder wiring.
    NoOp,
}

use std::sync::Arc;
use std::time::Duration;

use crate::payload::OcrPayload;
use crate::state::{FileId, JobId};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Enqueue one file with the remote OCR service.
    DispatchFile {
        file_id: FileId,
        file_name: String,
        mime: String,
        bytes: Arc<Vec<u8>>,
    },
    /// Fetch the status of all known jobs.
    PollStatus,
    /// Remove the queue entry after its display grace period.
    ScheduleRemoval { job_id: JobId, delay: Duration },
    /// Persist the corrected record through the save endpoint.
    SaveRecord(SaveJob),
    /// Show a transient, toast-style notice.
    Notify { level: NoticeLevel, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Everything the save endpoint needs for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveJob {
    pub original: OcrPayload,
    pub edited: OcrPayload,
    pub file_name: Option<String>,
    pub mime: Option<String>,
    pub image: Option<Arc<Vec<u8>>>,
}

use crate::payload::OcrPayload;
use crate::state::{FileId, JobId, JobStatus};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub files: Vec<FileRowView>,
    pub selected_index: Option<usize>,
    pub queue: Vec<QueueRowView>,
    pub pending: Vec<PendingRowView>,
    /// The result shown for the current file, already normalized.
    pub active: Option<OcrPayload>,
    /// Consecutive failed poll ticks; operator signal, never a notice.
    pub poll_failures: u32,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRowView {
    pub file_id: FileId,
    pub name: String,
    pub size: usize,
    pub selected: bool,
    pub has_result: bool,
    pub failed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRowView {
    pub job_id: JobId,
    pub file_name: String,
    pub status: JobStatus,
    pub progress: u8,
    pub updated_from_server: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRowView {
    pub id: String,
    pub filename: String,
    pub from_previous_session: bool,
}

//! Intake core: pure state machine for the OCR job queue, status merge and
//! result reconciliation.
mod effect;
mod msg;
mod payload;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, NoticeLevel, SaveJob};
pub use msg::{JobResultUpdate, JobStatusUpdate, Msg, NewFile};
pub use payload::OcrPayload;
pub use state::{
    AppState, FileEntry, FileId, JobId, JobStatus, PendingResult, PendingSnapshot,
    DEFAULT_WATCHDOG_TICKS,
};
pub use update::{update, COMPLETED_GRACE, ERROR_GRACE};
pub use view_model::{AppViewModel, FileRowView, PendingRowView, QueueRowView};

//! Intake engine: effect execution against the remote OCR service.
mod dispatch;
mod engine;
mod export;
mod mock;
mod save;
mod settings;
mod status;
mod types;

pub use dispatch::{HttpOcrQueue, OcrQueue};
pub use engine::EngineHandle;
pub use export::{
    content_digest, ensure_output_dir, export_payload, AtomicFileWriter, ExportError,
};
pub use mock::{canned_invoice_payload, MockOcrService};
pub use save::{image_data_url, HttpRecordSaver, RecordSaver, SaveRecordBody};
pub use settings::EngineSettings;
pub use status::{HttpStatusFeed, StatusFeed};
pub use types::{
    DispatchError, EngineEvent, JobStatusDto, PollError, QueueAck, RemoteStatus, ResultDto,
    SaveAck, SaveError, StatusReport,
};

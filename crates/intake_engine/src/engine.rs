use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use intake_logging::{intake_error, intake_warn};

use crate::dispatch::{HttpOcrQueue, OcrQueue};
use crate::mock::MockOcrService;
use crate::save::{HttpRecordSaver, RecordSaver, SaveRecordBody};
use crate::settings::EngineSettings;
use crate::status::{HttpStatusFeed, StatusFeed};
use crate::types::EngineEvent;

enum EngineCommand {
    Dispatch {
        file_id: u64,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
    Poll,
    ScheduleRemoval {
        job_id: String,
        delay: Duration,
    },
    Save(SaveRecordBody),
}

/// Owns the async runtime and the remote-service clients. Commands go in
/// through a channel; events come back out for the shell to drain.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        let (queue, feed, saver): (
            Arc<dyn OcrQueue>,
            Arc<dyn StatusFeed>,
            Arc<dyn RecordSaver>,
        ) = if settings.use_mock_data {
            let mock = Arc::new(MockOcrService::new());
            (mock.clone(), mock.clone(), mock)
        } else {
            (
                Arc::new(HttpOcrQueue::new(settings.clone())),
                Arc::new(HttpStatusFeed::new(settings.clone())),
                Arc::new(HttpRecordSaver::new(settings)),
            )
        };

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    intake_error!("failed to start engine runtime: {err}");
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                let queue = queue.clone();
                let feed = feed.clone();
                let saver = saver.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(
                        queue.as_ref(),
                        feed.as_ref(),
                        saver.as_ref(),
                        command,
                        event_tx,
                    )
                    .await;
                });
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn dispatch(&self, file_id: u64, file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) {
        let _ = self.cmd_tx.send(EngineCommand::Dispatch {
            file_id,
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        });
    }

    pub fn poll(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Poll);
    }

    pub fn schedule_removal(&self, job_id: impl Into<String>, delay: Duration) {
        let _ = self.cmd_tx.send(EngineCommand::ScheduleRemoval {
            job_id: job_id.into(),
            delay,
        });
    }

    pub fn save(&self, record: SaveRecordBody) {
        let _ = self.cmd_tx.send(EngineCommand::Save(record));
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }
}

async fn handle_command(
    queue: &dyn OcrQueue,
    feed: &dyn StatusFeed,
    saver: &dyn RecordSaver,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Dispatch {
            file_id,
            file_name,
            mime,
            bytes,
        } => {
            let result = queue.enqueue(&file_name, &mime, bytes).await;
            if let Ok(job_id) = &result {
                // The poll loop is the source of truth for job state, so a
                // failed start only gets a log line; the entry stays Queued.
                if let Err(err) = queue.start(job_id).await {
                    intake_warn!("start-processing for job {job_id} failed: {err}");
                }
            }
            let _ = event_tx.send(EngineEvent::DispatchDone { file_id, result });
        }
        EngineCommand::Poll => {
            let result = feed.fetch().await;
            let _ = event_tx.send(EngineEvent::PollDone { result });
        }
        EngineCommand::ScheduleRemoval { job_id, delay } => {
            tokio::time::sleep(delay).await;
            let _ = event_tx.send(EngineEvent::RemovalDue { job_id });
        }
        EngineCommand::Save(record) => {
            let result = saver.save(record).await;
            let _ = event_tx.send(EngineEvent::SaveDone { result });
        }
    }
}

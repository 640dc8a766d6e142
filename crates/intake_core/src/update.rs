use std::collections::BTreeMap;
use std::time::Duration;

use crate::state::{MergeOutcome, OpenOutcome, ReconcileOutcome};
use crate::{AppState, Effect, JobStatus, JobStatusUpdate, Msg, NoticeLevel};

/// How long a completed entry stays visible before removal.
pub const COMPLETED_GRACE: Duration = Duration::from_secs(3);
/// How long an errored entry stays visible before removal.
pub const ERROR_GRACE: Duration = Duration::from_secs(5);

/// Pure update function: applies a message to state and returns any effects.
///
/// Every mutation happens inside one call, so a poll merge can never
/// interleave with a user-triggered delete.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FilesAdded(new_files) => {
            if new_files.is_empty() {
                return (state, Vec::new());
            }
            let count = state.add_files(new_files);
            vec![notify(
                NoticeLevel::Success,
                format!("{count} file(s) uploaded"),
            )]
        }
        Msg::FileSelected { index } => {
            state.select_file(index);
            Vec::new()
        }
        Msg::FileDeleted { index } => match state.delete_file(index) {
            Some(removed) => vec![notify(
                NoticeLevel::Success,
                format!("Deleted {}", removed.name),
            )],
            None => Vec::new(),
        },
        Msg::ClearAllFiles => {
            state.clear_files();
            vec![notify(NoticeLevel::Success, "All files cleared".to_string())]
        }
        Msg::ProcessClicked => {
            if state.file_count() == 0 {
                vec![notify(
                    NoticeLevel::Error,
                    "Upload a file first".to_string(),
                )]
            } else {
                let candidates = state.dispatch_candidates();
                let mut effects = Vec::with_capacity(candidates.len());
                for file in candidates {
                    state.note_dispatching(file.id);
                    effects.push(Effect::DispatchFile {
                        file_id: file.id,
                        file_name: file.name,
                        mime: file.mime,
                        bytes: file.bytes,
                    });
                }
                effects
            }
        }
        Msg::DispatchSucceeded { file_id, job_id } => {
            state.note_dispatch_done(file_id);
            match state.file_name(file_id) {
                Some(name) => state.upsert_queue_entry(job_id, file_id, name),
                // The file was deleted while its dispatch was in flight; the
                // job stays unattributable and the queue never learns of it.
                None => log::warn!("job {job_id} arrived for deleted file {file_id}; ignored"),
            }
            Vec::new()
        }
        Msg::DispatchFailed { file_id, message } => {
            state.note_dispatch_done(file_id);
            state.mark_failed(file_id);
            let name = state
                .file_name(file_id)
                .unwrap_or_else(|| "a deleted file".to_string());
            vec![notify(
                NoticeLevel::Error,
                format!("Failed to queue {name}: {message}"),
            )]
        }
        Msg::PollTick => {
            let mut effects = Vec::new();
            for expired in state.watchdog_tick() {
                effects.push(notify(
                    NoticeLevel::Error,
                    format!("{} timed out waiting for OCR", expired.file_name),
                ));
                effects.push(Effect::ScheduleRemoval {
                    job_id: expired.job_id,
                    delay: ERROR_GRACE,
                });
            }
            if state.begin_poll() {
                effects.push(Effect::PollStatus);
            }
            effects
        }
        Msg::PollCompleted { statuses } => poll_completed(&mut state, statuses),
        Msg::PollFailed => {
            state.poll_failed();
            Vec::new()
        }
        Msg::RemovalDue { job_id } => {
            state.remove_entry(&job_id);
            Vec::new()
        }
        Msg::EditApplied { payload } => {
            state.apply_edit(payload);
            Vec::new()
        }
        Msg::SaveRequested => match state.save_request() {
            Some(job) => vec![Effect::SaveRecord(job)],
            None => vec![notify(
                NoticeLevel::Error,
                "No OCR results to save".to_string(),
            )],
        },
        Msg::SaveCompleted { record_id } => {
            let message = match record_id {
                Some(id) => format!("Data saved (record {id})"),
                None => "Data saved".to_string(),
            };
            vec![notify(NoticeLevel::Success, message)]
        }
        Msg::SaveFailed { message } => vec![notify(
            NoticeLevel::Error,
            format!("Failed to save: {message}"),
        )],
        Msg::PendingResultOpened { id } => {
            match state.open_pending(&id) {
                OpenOutcome::Selected | OpenOutcome::Activated => {}
                OpenOutcome::Missing => {
                    log::debug!("pending result {id} no longer exists");
                }
            }
            Vec::new()
        }
        Msg::RestorePendingResults(snapshots) => {
            state.restore_pending(snapshots);
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Merge a status response and run terminal-state work for every entry
/// that just finished. Per-job failures never spill over to siblings.
fn poll_completed(state: &mut AppState, statuses: Vec<JobStatusUpdate>) -> Vec<Effect> {
    state.poll_succeeded();
    let mut effects = Vec::new();

    for status in &statuses {
        if let MergeOutcome::Dropped = state.apply_status(status) {
            log::warn!(
                "status for job {} has no live correlation; dropped",
                status.job_id
            );
        }
    }

    let by_id: BTreeMap<&str, &JobStatusUpdate> = statuses
        .iter()
        .map(|status| (status.job_id.as_str(), status))
        .collect();

    for terminal in state.take_newly_terminal() {
        let result = by_id
            .get(terminal.job_id.as_str())
            .and_then(|status| status.result.clone());
        match terminal.status {
            JobStatus::Completed => {
                let result = result.unwrap_or_default();
                match state.reconcile(
                    &terminal.job_id,
                    result.ocr_data,
                    result.filename,
                    result.processed_at,
                ) {
                    ReconcileOutcome::Activated { file_name } => effects.push(notify(
                        NoticeLevel::Success,
                        format!("OCR completed for {file_name}"),
                    )),
                    ReconcileOutcome::FiledPending { file_name } => effects.push(notify(
                        NoticeLevel::Success,
                        format!("OCR completed for {file_name}; available in the results list"),
                    )),
                    ReconcileOutcome::Duplicate | ReconcileOutcome::Unattributable => {}
                }
                effects.push(Effect::ScheduleRemoval {
                    job_id: terminal.job_id,
                    delay: COMPLETED_GRACE,
                });
            }
            JobStatus::Error => {
                state.mark_correlation_processed(&terminal.job_id);
                state.mark_failed_by_job(&terminal.job_id);
                let message = result
                    .and_then(|r| r.message)
                    .unwrap_or_else(|| "OCR processing failed".to_string());
                effects.push(notify(
                    NoticeLevel::Error,
                    format!("{}: {message}", terminal.file_name),
                ));
                effects.push(Effect::ScheduleRemoval {
                    job_id: terminal.job_id,
                    delay: ERROR_GRACE,
                });
            }
            JobStatus::Queued | JobStatus::Processing => {}
        }
    }

    effects
}

fn notify(level: NoticeLevel, message: String) -> Effect {
    Effect::Notify { level, message }
}

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;

use intake_core::{
    update, AppState, AppViewModel, Effect, JobResultUpdate, JobStatus, JobStatusUpdate, Msg,
    NewFile, NoticeLevel,
};
use intake_engine::{
    content_digest, export_payload, image_data_url, AtomicFileWriter, EngineEvent, EngineHandle,
    EngineSettings, JobStatusDto, RemoteStatus, SaveRecordBody,
};
use intake_logging::{intake_debug, intake_info, intake_trace, intake_warn, set_poll_tick};

use crate::persistence;
use crate::Cli;

pub(crate) fn run(cli: Cli, settings: EngineSettings) -> Result<()> {
    let poll_interval = settings.poll_interval;
    let engine = EngineHandle::new(settings);
    let writer = AtomicFileWriter::new(cli.out.clone());

    let mut state = AppState::new();

    let restored = persistence::load_pending(&cli.out);
    if !restored.is_empty() {
        intake_info!(
            "restored {} unviewed result(s) from a previous session",
            restored.len()
        );
        state = dispatch(state, Msg::RestorePendingResults(restored), &engine);
    }

    let mut new_files = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("invoice")
            .to_string();
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        intake_info!(
            "loaded {name} ({} bytes, sha256 {})",
            bytes.len(),
            &content_digest(&bytes)[..12]
        );
        new_files.push(NewFile {
            name,
            mime,
            bytes: Arc::new(bytes),
        });
    }
    state = dispatch(state, Msg::FilesAdded(new_files), &engine);
    state = dispatch(state, Msg::ProcessClicked, &engine);

    // Fixed-cadence tick driving the watchdog and the status poll.
    let (tick_tx, tick_rx) = mpsc::channel();
    thread::spawn(move || loop {
        thread::sleep(poll_interval);
        if tick_tx.send(()).is_err() {
            break;
        }
    });

    let started = Utc::now();
    let deadline = chrono::Duration::seconds(cli.timeout_secs as i64);
    let mut tick: u64 = 0;

    loop {
        while let Some(event) = engine.try_recv() {
            state = dispatch(state, map_event(event), &engine);
        }
        if session_done(&state.view()) {
            break;
        }
        if Utc::now() - started > deadline {
            intake_warn!("session timed out after {}s", cli.timeout_secs);
            break;
        }
        match tick_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(()) => {
                tick += 1;
                set_poll_tick(tick);
                intake_trace!("poll tick {tick}");
                state = dispatch(state, Msg::PollTick, &engine);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    for (name, payload) in state.completed_results() {
        match export_payload(&writer, &name, &payload.to_value()) {
            Ok(path) => intake_info!("exported {name} -> {}", path.display()),
            Err(err) => intake_warn!("export for {name} failed: {err}"),
        }
    }

    if cli.save {
        state = save_all(state, &engine);
    }

    persistence::save_pending(&cli.out, &state.pending_snapshot());

    let view = state.view();
    intake_info!(
        "session finished: {} file(s), {} result(s), {} failure(s)",
        view.files.len(),
        view.files.iter().filter(|f| f.has_result).count(),
        view.files.iter().filter(|f| f.failed).count()
    );
    Ok(())
}

/// Select each file in turn and push its record through the save endpoint.
fn save_all(mut state: AppState, engine: &EngineHandle) -> AppState {
    let total = state.view().files.len();
    let mut expected = 0;
    for index in 0..total {
        state = dispatch(state, Msg::FileSelected { index }, engine);
        if state.view().active.is_some() {
            state = dispatch(state, Msg::SaveRequested, engine);
            expected += 1;
        }
    }

    let deadline = Utc::now() + chrono::Duration::seconds(30);
    let mut seen = 0;
    while seen < expected && Utc::now() < deadline {
        match engine.try_recv() {
            Some(event) => {
                if matches!(event, EngineEvent::SaveDone { .. }) {
                    seen += 1;
                }
                state = dispatch(state, map_event(event), engine);
            }
            None => thread::sleep(Duration::from_millis(50)),
        }
    }
    if seen < expected {
        intake_warn!("{} save acknowledgement(s) still outstanding", expected - seen);
    }
    state
}

/// Run one message through the core, execute its effects and re-render.
fn dispatch(state: AppState, msg: Msg, engine: &EngineHandle) -> AppState {
    let (mut state, effects) = update(state, msg);
    for effect in effects {
        run_effect(effect, engine);
    }
    if state.consume_dirty() {
        render(&state.view());
    }
    state
}

fn run_effect(effect: Effect, engine: &EngineHandle) {
    match effect {
        Effect::DispatchFile {
            file_id,
            file_name,
            mime,
            bytes,
        } => {
            intake_info!("queueing {file_name} for OCR");
            engine.dispatch(file_id, file_name, mime, bytes.as_ref().clone());
        }
        Effect::PollStatus => engine.poll(),
        Effect::ScheduleRemoval { job_id, delay } => engine.schedule_removal(job_id, delay),
        Effect::SaveRecord(job) => {
            let image_data = match (&job.mime, &job.image) {
                (Some(mime), Some(bytes)) => Some(image_data_url(mime, bytes)),
                _ => None,
            };
            engine.save(SaveRecordBody {
                original_data: job.original.to_value(),
                edited_data: job.edited.to_value(),
                image_data,
            });
        }
        Effect::Notify { level, message } => match level {
            NoticeLevel::Error => intake_warn!("{message}"),
            NoticeLevel::Info | NoticeLevel::Success => intake_info!("{message}"),
        },
    }
}

fn render(view: &AppViewModel) {
    for row in &view.queue {
        intake_debug!(
            "[{}] {} {:?} {}%{}",
            row.job_id,
            row.file_name,
            row.status,
            row.progress,
            if row.updated_from_server { "" } else { " (local)" }
        );
    }
    if view.poll_failures > 0 {
        intake_debug!("consecutive poll failures: {}", view.poll_failures);
    }
}

/// The session is over once every file either has a result or failed and
/// the visible queue has drained.
fn session_done(view: &AppViewModel) -> bool {
    !view.files.is_empty()
        && view.queue.is_empty()
        && view.files.iter().all(|f| f.has_result || f.failed)
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::DispatchDone { file_id, result } => match result {
            Ok(job_id) => Msg::DispatchSucceeded { file_id, job_id },
            Err(err) => Msg::DispatchFailed {
                file_id,
                message: err.to_string(),
            },
        },
        EngineEvent::PollDone { result } => match result {
            Ok(statuses) => Msg::PollCompleted {
                statuses: statuses.into_iter().filter_map(map_status).collect(),
            },
            Err(err) => {
                intake_warn!("status poll skipped: {err}");
                Msg::PollFailed
            }
        },
        EngineEvent::RemovalDue { job_id } => Msg::RemovalDue { job_id },
        EngineEvent::SaveDone { result } => match result {
            Ok(ack) => Msg::SaveCompleted {
                record_id: ack.id.map(|id| match id {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                }),
            },
            Err(err) => Msg::SaveFailed {
                message: err.to_string(),
            },
        },
    }
}

fn map_status(dto: JobStatusDto) -> Option<JobStatusUpdate> {
    let status = match dto.status {
        RemoteStatus::Queued => JobStatus::Queued,
        RemoteStatus::Processing => JobStatus::Processing,
        RemoteStatus::Completed => JobStatus::Completed,
        RemoteStatus::Error => JobStatus::Error,
        // States we do not know yet read as "not reported".
        RemoteStatus::Unknown => return None,
    };
    Some(JobStatusUpdate {
        job_id: dto.id,
        status,
        progress: dto.progress,
        result: dto.result.map(|r| JobResultUpdate {
            ocr_data: r.ocr_data,
            filename: r.filename,
            processed_at: r.processed_at,
            message: r.message,
        }),
    })
}

use std::sync::Arc;

use serde_json::json;

use intake_core::{
    update, AppState, Effect, FileId, JobResultUpdate, JobStatus, JobStatusUpdate, Msg, NewFile,
    NoticeLevel, OcrPayload,
};

fn init_logging() {
    intake_logging::initialize_for_tests();
}

fn add_files(state: AppState, names: &[&str]) -> AppState {
    let files = names
        .iter()
        .map(|name| NewFile {
            name: name.to_string(),
            mime: "image/jpeg".to_string(),
            bytes: Arc::new(vec![1, 2, 3]),
        })
        .collect();
    let (state, _) = update(state, Msg::FilesAdded(files));
    state
}

fn enqueue_all(state: AppState) -> (AppState, Vec<(FileId, String)>) {
    let (mut state, effects) = update(state, Msg::ProcessClicked);
    let mut jobs = Vec::new();
    let file_ids: Vec<FileId> = effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::DispatchFile { file_id, .. } => Some(*file_id),
            _ => None,
        })
        .collect();
    for (i, file_id) in file_ids.into_iter().enumerate() {
        let job_id = format!("job-{}", i + 1);
        let (next, _) = update(
            state,
            Msg::DispatchSucceeded {
                file_id,
                job_id: job_id.clone(),
            },
        );
        state = next;
        jobs.push((file_id, job_id));
    }
    (state, jobs)
}

fn completed_with(job_id: &str, filename: &str, ocr_data: serde_json::Value) -> JobStatusUpdate {
    JobStatusUpdate {
        job_id: job_id.to_string(),
        status: JobStatus::Completed,
        progress: Some(100),
        result: Some(JobResultUpdate {
            ocr_data: Some(ocr_data),
            filename: Some(filename.to_string()),
            processed_at: Some("2025-03-15T10:30:00Z".to_string()),
            message: None,
        }),
    }
}

fn success_notices(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Notify {
                level: NoticeLevel::Success,
                message,
            } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn normalize_accepts_the_flat_output_shape() {
    let payload = OcrPayload::normalize(json!({
        "output": {
            "nama_supplier": { "value": "PT Sukses", "is_confident": true },
            "items": [ { "qty": { "value": 3, "is_confident": true } } ]
        }
    }));
    assert_eq!(payload.item_count(), 1);
    assert!(payload.output().contains_key("nama_supplier"));
}

#[test]
fn normalize_collapses_the_double_nested_shape() {
    let payload = OcrPayload::normalize(json!({
        "output": { "output": { "items": [ { "qty": { "value": 1 } }, { "qty": { "value": 2 } } ] } }
    }));
    assert_eq!(payload.item_count(), 2);
}

#[test]
fn normalize_supplies_missing_items() {
    let payload = OcrPayload::normalize(json!({
        "output": { "nomor_referensi": { "value": "SSP318905", "is_confident": true } }
    }));
    assert_eq!(payload.item_count(), 0);
    assert!(payload.output().contains_key("nomor_referensi"));
}

#[test]
fn normalize_lifts_flat_bodies_into_output() {
    let payload = OcrPayload::normalize(json!({
        "nama_supplier": { "value": "CV Mitra", "is_confident": false },
        "items": [ { "qty": { "value": 7 } } ]
    }));
    assert_eq!(payload.item_count(), 1);
    assert!(payload.output().contains_key("nama_supplier"));
}

#[test]
fn normalize_picks_the_output_element_from_arrays() {
    let payload = OcrPayload::normalize(json!([
        { "jatuh_tempo_epoch": "1741132800" },
        { "output": { "items": [ { "qty": { "value": 4 } } ] } }
    ]));
    assert_eq!(payload.item_count(), 1);
}

#[test]
fn normalize_never_fails_on_junk() {
    for junk in [
        json!(null),
        json!("garbage"),
        json!(42),
        json!([]),
        json!({ "output": "not an object" }),
    ] {
        let payload = OcrPayload::normalize(junk);
        assert_eq!(payload.item_count(), 0);
    }
}

#[test]
fn a_result_for_the_selected_file_becomes_active_immediately() {
    init_logging();
    let state = add_files(AppState::new(), &["a.jpg", "b.jpg"]);
    let (state, jobs) = enqueue_all(state);

    let (state, effects) = update(
        state,
        Msg::PollCompleted {
            statuses: vec![completed_with(
                &jobs[0].1,
                "a.jpg",
                json!({ "output": { "items": [ { "qty": { "value": 1 } } ] } }),
            )],
        },
    );

    let view = state.view();
    assert_eq!(view.active.expect("active result").item_count(), 1);
    assert!(view.pending.is_empty());
    assert!(success_notices(&effects)
        .iter()
        .any(|m| m.contains("a.jpg") && !m.contains("results list")));
}

#[test]
fn a_result_for_another_file_goes_to_the_pending_list() {
    init_logging();
    let state = add_files(AppState::new(), &["a.jpg", "b.jpg"]);
    let (state, jobs) = enqueue_all(state);

    let (state, effects) = update(
        state,
        Msg::PollCompleted {
            statuses: vec![completed_with(
                &jobs[1].1,
                "b.jpg",
                json!({ "output": { "items": [] } }),
            )],
        },
    );

    let view = state.view();
    assert!(view.active.is_none());
    assert_eq!(view.pending.len(), 1);
    assert_eq!(view.pending[0].filename, "b.jpg");
    assert!(!view.pending[0].from_previous_session);
    assert!(success_notices(&effects)
        .iter()
        .any(|m| m.contains("results list")));
}

#[test]
fn reconciliation_is_idempotent_for_the_pending_list() {
    init_logging();
    let state = add_files(AppState::new(), &["a.jpg", "b.jpg"]);
    let (state, jobs) = enqueue_all(state);
    let row = completed_with(&jobs[1].1, "b.jpg", json!({ "output": { "items": [] } }));

    let (state, _) = update(
        state,
        Msg::PollCompleted {
            statuses: vec![row.clone()],
        },
    );
    assert_eq!(state.view().pending.len(), 1);

    // A retry re-arms the entry, so the same result reconciles a second
    // time; the (file, filename) pair still dedupes the pending list.
    let (state, _) = update(
        state,
        Msg::DispatchSucceeded {
            file_id: jobs[1].0,
            job_id: jobs[1].1.clone(),
        },
    );
    let (state, effects) = update(
        state,
        Msg::PollCompleted {
            statuses: vec![row],
        },
    );
    assert_eq!(state.view().pending.len(), 1);
    assert!(success_notices(&effects).is_empty());
}

#[test]
fn a_malformed_payload_reconciles_to_empty_items() {
    init_logging();
    let state = add_files(AppState::new(), &["a.jpg"]);
    let (state, jobs) = enqueue_all(state);

    let (state, _) = update(
        state,
        Msg::PollCompleted {
            statuses: vec![completed_with(&jobs[0].1, "a.jpg", json!("not even close"))],
        },
    );
    let active = state.view().active.expect("renderable result");
    assert_eq!(active.item_count(), 0);
}

#[test]
fn a_completed_row_without_a_result_block_still_reconciles() {
    init_logging();
    let state = add_files(AppState::new(), &["a.jpg"]);
    let (state, jobs) = enqueue_all(state);

    let (state, _) = update(
        state,
        Msg::PollCompleted {
            statuses: vec![JobStatusUpdate {
                job_id: jobs[0].1.clone(),
                status: JobStatus::Completed,
                progress: None,
                result: None,
            }],
        },
    );
    let active = state.view().active.expect("renderable result");
    assert_eq!(active.item_count(), 0);
}

#[test]
fn opening_a_pending_result_selects_its_file() {
    init_logging();
    let state = add_files(AppState::new(), &["a.jpg", "b.jpg"]);
    let (state, jobs) = enqueue_all(state);
    let (state, _) = update(
        state,
        Msg::PollCompleted {
            statuses: vec![completed_with(
                &jobs[1].1,
                "b.jpg",
                json!({ "output": { "items": [ { "qty": { "value": 9 } } ] } }),
            )],
        },
    );

    let id = state.view().pending[0].id.clone();
    let (state, _) = update(state, Msg::PendingResultOpened { id });

    let view = state.view();
    assert!(view.pending.is_empty());
    assert_eq!(view.selected_index, Some(1));
    assert_eq!(view.active.expect("activated result").item_count(), 1);
}

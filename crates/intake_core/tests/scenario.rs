use std::sync::Arc;

use serde_json::json;

use intake_core::{
    update, AppState, Effect, JobResultUpdate, JobStatus, JobStatusUpdate, Msg, NewFile,
    NoticeLevel, OcrPayload, COMPLETED_GRACE,
};

fn init_logging() {
    intake_logging::initialize_for_tests();
}

/// The full happy path: two uploads, one completes while the other is
/// still processing, grace-period cleanup, then save.
#[test]
fn two_files_complete_out_of_band_and_save() {
    init_logging();

    let files = vec![
        NewFile {
            name: "f1.jpg".to_string(),
            mime: "image/jpeg".to_string(),
            bytes: Arc::new(vec![0xff, 0xd8, 0x01]),
        },
        NewFile {
            name: "f2.jpg".to_string(),
            mime: "image/jpeg".to_string(),
            bytes: Arc::new(vec![0xff, 0xd8, 0x02]),
        },
    ];
    let (state, _) = update(AppState::new(), Msg::FilesAdded(files));

    let (state, effects) = update(state, Msg::ProcessClicked);
    let dispatches: Vec<_> = effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::DispatchFile { file_id, .. } => Some(*file_id),
            _ => None,
        })
        .collect();
    assert_eq!(dispatches.len(), 2);

    let (state, _) = update(
        state,
        Msg::DispatchSucceeded {
            file_id: dispatches[0],
            job_id: "a".to_string(),
        },
    );
    let (state, _) = update(
        state,
        Msg::DispatchSucceeded {
            file_id: dispatches[1],
            job_id: "b".to_string(),
        },
    );

    // First poll tick goes out.
    let (state, effects) = update(state, Msg::PollTick);
    assert_eq!(effects, vec![Effect::PollStatus]);

    // Remote finishes "a" first; "b" is mid-flight. Completion order is
    // not dispatch order and must not need to be.
    let (state, effects) = update(
        state,
        Msg::PollCompleted {
            statuses: vec![
                JobStatusUpdate {
                    job_id: "a".to_string(),
                    status: JobStatus::Completed,
                    progress: Some(100),
                    result: Some(JobResultUpdate {
                        ocr_data: Some(json!({
                            "output": { "items": [
                                { "kode_barang_invoice": { "value": "X", "is_confident": true } }
                            ] }
                        })),
                        filename: Some("f1.jpg".to_string()),
                        processed_at: Some("2025-03-15T10:30:00Z".to_string()),
                        message: None,
                    }),
                },
                JobStatusUpdate {
                    job_id: "b".to_string(),
                    status: JobStatus::Processing,
                    progress: Some(40),
                    result: None,
                },
            ],
        },
    );

    // f1 is the selected file, so its result is active right away.
    let view = state.view();
    let active = view.active.clone().expect("result for f1");
    assert_eq!(active.item_count(), 1);
    assert_eq!(
        active.items()[0]["kode_barang_invoice"]["value"],
        json!("X")
    );

    // "b" shows live progress; "a" is done and scheduled for removal.
    let b = view.queue.iter().find(|e| e.job_id == "b").unwrap();
    assert_eq!(b.status, JobStatus::Processing);
    assert_eq!(b.progress, 40);
    let a = view.queue.iter().find(|e| e.job_id == "a").unwrap();
    assert_eq!(a.status, JobStatus::Completed);
    assert!(effects.contains(&Effect::ScheduleRemoval {
        job_id: "a".to_string(),
        delay: COMPLETED_GRACE,
    }));

    // Grace period elapses; only "b" remains visible.
    let (state, _) = update(
        state,
        Msg::RemovalDue {
            job_id: "a".to_string(),
        },
    );
    assert_eq!(state.view().queue.len(), 1);

    // The operator corrects a field and saves.
    let edited = OcrPayload::normalize(json!({
        "output": { "items": [
            { "kode_barang_invoice": { "value": "X-fixed", "is_confident": true } }
        ] }
    }));
    let (state, _) = update(
        state,
        Msg::EditApplied {
            payload: edited.clone(),
        },
    );
    let (state, effects) = update(state, Msg::SaveRequested);
    let job = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::SaveRecord(job) => Some(job.clone()),
            _ => None,
        })
        .expect("save effect");
    assert_eq!(job.edited, edited);
    assert_ne!(job.original, job.edited);
    assert_eq!(job.file_name.as_deref(), Some("f1.jpg"));
    assert!(job.image.is_some());

    let (_state, effects) = update(
        state,
        Msg::SaveCompleted {
            record_id: Some("17".to_string()),
        },
    );
    assert!(effects.iter().any(|effect| matches!(
        effect,
        Effect::Notify { level: NoticeLevel::Success, message } if message.contains("17")
    )));
}

#[test]
fn saving_with_no_active_result_is_an_error_notice() {
    init_logging();
    let (_state, effects) = update(AppState::new(), Msg::SaveRequested);
    assert!(effects.iter().any(|effect| matches!(
        effect,
        Effect::Notify { level: NoticeLevel::Error, message } if message.contains("No OCR results")
    )));
}

#[test]
fn edits_follow_the_selected_file_into_its_cache_entry() {
    init_logging();
    let files = vec![NewFile {
        name: "f1.jpg".to_string(),
        mime: "image/jpeg".to_string(),
        bytes: Arc::new(vec![1]),
    }];
    let (state, _) = update(AppState::new(), Msg::FilesAdded(files));

    let edited = OcrPayload::normalize(json!({
        "output": { "items": [ { "qty": { "value": 12 } } ] }
    }));
    let (state, _) = update(
        state,
        Msg::EditApplied {
            payload: edited.clone(),
        },
    );

    // The edit landed in the cache for the selected file.
    let results = state.completed_results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1, edited);
}

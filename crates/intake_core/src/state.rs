use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::msg::{JobStatusUpdate, NewFile};
use crate::payload::OcrPayload;
use crate::view_model::{AppViewModel, FileRowView, PendingRowView, QueueRowView};

/// Stable identity assigned to a file when it is added. Queue entries,
/// correlations and cached results key on this id, so deleting one file
/// never invalidates another file's rows.
pub type FileId = u64;

/// Opaque job identifier assigned by the remote OCR queue.
pub type JobId = String;

/// Poll ticks a job may stay non-terminal before the watchdog fails it.
/// 150 ticks at the 2 s poll cadence is five minutes.
pub const DEFAULT_WATCHDOG_TICKS: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    /// Terminal states expect no further transitions from the remote.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// One uploaded file. The bytes are shared so cloning state (and carrying
/// the blob through a dispatch effect) stays cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: FileId,
    pub name: String,
    pub mime: String,
    pub bytes: Arc<Vec<u8>>,
}

/// One in-flight or recently finished OCR job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub job_id: JobId,
    pub file_id: FileId,
    pub file_name: String,
    pub status: JobStatus,
    pub progress: u8,
    pub updated_from_server: bool,
    /// Set once the terminal transition has been reconciled/notified, so
    /// later poll ticks cannot repeat that work before the removal timer
    /// fires.
    pub handled: bool,
    pub ticks_observed: u32,
}

/// Maps a remote job id back to the file it was dispatched for. The status
/// feed reports job ids only, so this is the only way to attribute results.
#[derive(Debug, Clone, PartialEq)]
pub struct JobCorrelation {
    pub file_id: FileId,
    pub file_name: String,
    pub processed: bool,
    pub payload: Option<OcrPayload>,
}

/// A completed result for a file that was not selected when it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingResult {
    pub id: String,
    /// None for results restored from a previous session; those activate
    /// directly instead of selecting a file.
    pub file_id: Option<FileId>,
    pub filename: String,
    pub payload: OcrPayload,
    pub processed_at: Option<String>,
}

/// A completed-but-unviewed result as persisted between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSnapshot {
    pub filename: String,
    pub payload: OcrPayload,
    pub processed_at: Option<String>,
}

/// Outcome of merging one status row into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeOutcome {
    /// An existing entry was overwritten.
    Updated,
    /// No entry existed, but a live correlation recovered the file identity.
    Reinserted,
    /// No entry and no usable correlation; the row cannot be attributed.
    Dropped,
}

/// Outcome of reconciling a completed job's payload.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ReconcileOutcome {
    /// The job's file is selected; the payload became the active result.
    Activated { file_name: String },
    /// Filed into the pending list for later viewing.
    FiledPending { file_name: String },
    /// A pending entry for the same file and filename already exists.
    Duplicate,
    /// No correlation; the result was dropped.
    Unattributable,
}

/// A queue entry that just reached a terminal state and has not been
/// handled yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TerminalJob {
    pub job_id: JobId,
    pub status: JobStatus,
    pub file_name: String,
}

/// Outcome of opening an entry from the pending-results list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OpenOutcome {
    /// The file is still present; it was selected.
    Selected,
    /// The entry came from a previous session; its payload was activated
    /// without changing the selection.
    Activated,
    Missing,
}

/// All session state. One value per session; two states in the same
/// process cannot interfere.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    files: Vec<FileEntry>,
    selected: Option<usize>,
    next_file_id: FileId,
    queue: Vec<QueueEntry>,
    correlations: BTreeMap<JobId, JobCorrelation>,
    results: BTreeMap<FileId, OcrPayload>,
    active: Option<OcrPayload>,
    pending: Vec<PendingResult>,
    next_pending_seq: u64,
    dispatching: BTreeSet<FileId>,
    failed: BTreeSet<FileId>,
    poll_in_flight: bool,
    poll_failures: u32,
    watchdog_ticks: u32,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            selected: None,
            next_file_id: 0,
            queue: Vec::new(),
            correlations: BTreeMap::new(),
            results: BTreeMap::new(),
            active: None,
            pending: Vec::new(),
            next_pending_seq: 0,
            dispatching: BTreeSet::new(),
            failed: BTreeSet::new(),
            poll_in_flight: false,
            poll_failures: 0,
            watchdog_ticks: DEFAULT_WATCHDOG_TICKS,
            dirty: false,
        }
    }

    /// A state with a custom watchdog ceiling, in poll ticks.
    pub fn with_watchdog_ticks(ticks: u32) -> Self {
        Self {
            watchdog_ticks: ticks,
            ..Self::new()
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            files: self
                .files
                .iter()
                .enumerate()
                .map(|(idx, file)| FileRowView {
                    file_id: file.id,
                    name: file.name.clone(),
                    size: file.bytes.len(),
                    selected: self.selected == Some(idx),
                    has_result: self.results.contains_key(&file.id),
                    failed: self.failed.contains(&file.id),
                })
                .collect(),
            selected_index: self.selected,
            queue: self
                .queue
                .iter()
                .map(|entry| QueueRowView {
                    job_id: entry.job_id.clone(),
                    file_name: entry.file_name.clone(),
                    status: entry.status,
                    progress: entry.progress,
                    updated_from_server: entry.updated_from_server,
                })
                .collect(),
            pending: self
                .pending
                .iter()
                .map(|p| PendingRowView {
                    id: p.id.clone(),
                    filename: p.filename.clone(),
                    from_previous_session: p.file_id.is_none(),
                })
                .collect(),
            active: self.active.clone(),
            poll_failures: self.poll_failures,
            dirty: self.dirty,
        }
    }

    /// Returns whether a re-render is due, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        let was = self.dirty;
        self.dirty = false;
        was
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Files in store order paired with their cached results, for export.
    pub fn completed_results(&self) -> Vec<(String, OcrPayload)> {
        self.files
            .iter()
            .filter_map(|file| {
                self.results
                    .get(&file.id)
                    .map(|payload| (file.name.clone(), payload.clone()))
            })
            .collect()
    }

    /// The unviewed results worth persisting across sessions.
    pub fn pending_snapshot(&self) -> Vec<PendingSnapshot> {
        self.pending
            .iter()
            .map(|p| PendingSnapshot {
                filename: p.filename.clone(),
                payload: p.payload.clone(),
                processed_at: p.processed_at.clone(),
            })
            .collect()
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    // ---- file store ----

    pub(crate) fn add_files(&mut self, new_files: Vec<NewFile>) -> usize {
        let count = new_files.len();
        for file in new_files {
            self.next_file_id += 1;
            self.files.push(FileEntry {
                id: self.next_file_id,
                name: file.name,
                mime: file.mime,
                bytes: file.bytes,
            });
        }
        if self.selected.is_none() && !self.files.is_empty() {
            self.selected = Some(0);
        }
        if count > 0 {
            self.mark_dirty();
        }
        count
    }

    pub(crate) fn select_file(&mut self, index: usize) -> bool {
        if index >= self.files.len() {
            return false;
        }
        self.selected = Some(index);
        self.active = self.results.get(&self.files[index].id).cloned();
        self.mark_dirty();
        true
    }

    /// Remove a file and every row keyed to it. Jobs for the file are
    /// actively evicted rather than left to report into nothing.
    pub(crate) fn delete_file(&mut self, index: usize) -> Option<FileEntry> {
        if index >= self.files.len() {
            return None;
        }
        let removed = self.files.remove(index);
        let fid = removed.id;
        self.queue.retain(|entry| entry.file_id != fid);
        self.correlations.retain(|_, corr| corr.file_id != fid);
        self.results.remove(&fid);
        self.pending.retain(|p| p.file_id != Some(fid));
        self.dispatching.remove(&fid);
        self.failed.remove(&fid);

        if self.files.is_empty() {
            self.selected = None;
            self.active = None;
        } else if let Some(sel) = self.selected {
            let new_sel = if index <= sel { sel.saturating_sub(1) } else { sel };
            let new_sel = new_sel.min(self.files.len() - 1);
            self.selected = Some(new_sel);
            self.active = self.results.get(&self.files[new_sel].id).cloned();
        }
        self.mark_dirty();
        Some(removed)
    }

    pub(crate) fn clear_files(&mut self) {
        self.files.clear();
        self.selected = None;
        self.queue.clear();
        self.correlations.clear();
        self.results.clear();
        self.active = None;
        self.pending.clear();
        self.dispatching.clear();
        self.failed.clear();
        self.mark_dirty();
    }

    pub(crate) fn selected_file(&self) -> Option<&FileEntry> {
        self.selected.and_then(|idx| self.files.get(idx))
    }

    pub(crate) fn file_name(&self, file_id: FileId) -> Option<String> {
        self.files
            .iter()
            .find(|file| file.id == file_id)
            .map(|file| file.name.clone())
    }

    fn position_of(&self, file_id: FileId) -> Option<usize> {
        self.files.iter().position(|file| file.id == file_id)
    }

    // ---- dispatch bookkeeping ----

    /// Files eligible for dispatch: nothing already in flight for them.
    /// Files that failed or already have a result are eligible again — a
    /// second Process click is a deliberate retry.
    pub(crate) fn dispatch_candidates(&self) -> Vec<FileEntry> {
        self.files
            .iter()
            .filter(|file| {
                !self.dispatching.contains(&file.id)
                    && !self
                        .queue
                        .iter()
                        .any(|entry| entry.file_id == file.id && !entry.status.is_terminal())
            })
            .cloned()
            .collect()
    }

    pub(crate) fn note_dispatching(&mut self, file_id: FileId) {
        self.dispatching.insert(file_id);
        self.failed.remove(&file_id);
        self.mark_dirty();
    }

    pub(crate) fn note_dispatch_done(&mut self, file_id: FileId) {
        self.dispatching.remove(&file_id);
    }

    pub(crate) fn mark_failed(&mut self, file_id: FileId) {
        self.failed.insert(file_id);
        self.mark_dirty();
    }

    pub(crate) fn mark_failed_by_job(&mut self, job_id: &str) {
        if let Some(corr) = self.correlations.get(job_id) {
            self.failed.insert(corr.file_id);
            self.mark_dirty();
        }
    }

    /// Append or update the queue entry for a job and (re)write its
    /// correlation. At most one entry per job id, whatever the caller does.
    pub(crate) fn upsert_queue_entry(&mut self, job_id: JobId, file_id: FileId, file_name: String) {
        if let Some(entry) = self.queue.iter_mut().find(|entry| entry.job_id == job_id) {
            entry.file_id = file_id;
            entry.file_name = file_name.clone();
            entry.status = JobStatus::Queued;
            entry.progress = 0;
            entry.handled = false;
            entry.ticks_observed = 0;
        } else {
            self.queue.push(QueueEntry {
                job_id: job_id.clone(),
                file_id,
                file_name: file_name.clone(),
                status: JobStatus::Queued,
                progress: 0,
                updated_from_server: false,
                handled: false,
                ticks_observed: 0,
            });
        }
        self.correlations.insert(
            job_id,
            JobCorrelation {
                file_id,
                file_name,
                processed: false,
                payload: None,
            },
        );
        self.mark_dirty();
    }

    // ---- polling ----

    /// Gate for a poll tick: no-op on an empty queue, and ticks never
    /// overlap a poll that is still in flight.
    pub(crate) fn begin_poll(&mut self) -> bool {
        if self.queue.is_empty() || self.poll_in_flight {
            return false;
        }
        self.poll_in_flight = true;
        true
    }

    pub(crate) fn poll_succeeded(&mut self) {
        self.poll_in_flight = false;
        self.poll_failures = 0;
    }

    pub(crate) fn poll_failed(&mut self) {
        self.poll_in_flight = false;
        self.poll_failures += 1;
        self.mark_dirty();
    }

    /// Age all non-terminal entries by one poll tick and fail the ones past
    /// the watchdog ceiling. Expired entries are marked handled here; the
    /// caller owes them a notice and a removal timer.
    pub(crate) fn watchdog_tick(&mut self) -> Vec<TerminalJob> {
        let limit = self.watchdog_ticks;
        let mut expired = Vec::new();
        for entry in &mut self.queue {
            if entry.status.is_terminal() || entry.handled {
                continue;
            }
            entry.ticks_observed += 1;
            if entry.ticks_observed > limit {
                entry.status = JobStatus::Error;
                entry.handled = true;
                expired.push(TerminalJob {
                    job_id: entry.job_id.clone(),
                    status: JobStatus::Error,
                    file_name: entry.file_name.clone(),
                });
            }
        }
        for job in &expired {
            if let Some(corr) = self.correlations.get_mut(job.job_id.as_str()) {
                corr.processed = true;
                self.failed.insert(corr.file_id);
            }
        }
        if !expired.is_empty() {
            self.mark_dirty();
        }
        expired
    }

    /// Merge one status row. Entries whose id is absent from a response are
    /// left alone by construction (the caller only feeds rows that arrived).
    pub(crate) fn apply_status(&mut self, update: &JobStatusUpdate) -> MergeOutcome {
        if let Some(entry) = self
            .queue
            .iter_mut()
            .find(|entry| entry.job_id == update.job_id)
        {
            // Handled entries are frozen: they only wait for their removal
            // timer, and a late status row must not revive them.
            if entry.handled {
                return MergeOutcome::Updated;
            }
            entry.status = update.status;
            if let Some(progress) = update.progress {
                entry.progress = progress.min(100);
            } else if update.status == JobStatus::Completed {
                entry.progress = 100;
            }
            entry.updated_from_server = true;
            self.mark_dirty();
            return MergeOutcome::Updated;
        }

        match self.correlations.get(update.job_id.as_str()) {
            // A trimmed entry can come back as long as its terminal work has
            // not been handled; a processed correlation must stay buried or
            // the remote feed would resurrect it every tick.
            Some(corr) if !corr.processed => {
                let default_progress = if update.status == JobStatus::Completed {
                    100
                } else {
                    0
                };
                self.queue.push(QueueEntry {
                    job_id: update.job_id.clone(),
                    file_id: corr.file_id,
                    file_name: corr.file_name.clone(),
                    status: update.status,
                    progress: update.progress.map_or(default_progress, |p| p.min(100)),
                    updated_from_server: true,
                    handled: false,
                    ticks_observed: 0,
                });
                self.mark_dirty();
                MergeOutcome::Reinserted
            }
            _ => MergeOutcome::Dropped,
        }
    }

    /// Collect entries that just reached a terminal state, marking them
    /// handled so the terminal work happens exactly once.
    pub(crate) fn take_newly_terminal(&mut self) -> Vec<TerminalJob> {
        let mut out = Vec::new();
        for entry in &mut self.queue {
            if entry.status.is_terminal() && !entry.handled {
                entry.handled = true;
                out.push(TerminalJob {
                    job_id: entry.job_id.clone(),
                    status: entry.status,
                    file_name: entry.file_name.clone(),
                });
            }
        }
        out
    }

    pub(crate) fn mark_correlation_processed(&mut self, job_id: &str) {
        if let Some(corr) = self.correlations.get_mut(job_id) {
            corr.processed = true;
        }
    }

    pub(crate) fn remove_entry(&mut self, job_id: &str) {
        let before = self.queue.len();
        self.queue.retain(|entry| entry.job_id != job_id);
        if self.queue.len() != before {
            self.mark_dirty();
        }
    }

    // ---- reconciliation ----

    /// Attach a completed job's payload to its file. The single translation
    /// point for remote payload shapes.
    pub(crate) fn reconcile(
        &mut self,
        job_id: &str,
        raw: Option<serde_json::Value>,
        filename: Option<String>,
        processed_at: Option<String>,
    ) -> ReconcileOutcome {
        let Some(corr) = self.correlations.get_mut(job_id) else {
            log::warn!("dropping OCR result for job {job_id}: no correlation record");
            return ReconcileOutcome::Unattributable;
        };

        let normalized = OcrPayload::normalize(raw.unwrap_or(serde_json::Value::Null));
        corr.processed = true;
        corr.payload = Some(normalized.clone());
        let file_id = corr.file_id;
        let filename = filename.unwrap_or_else(|| corr.file_name.clone());

        self.results.insert(file_id, normalized.clone());
        self.failed.remove(&file_id);
        self.mark_dirty();

        if self.selected_file().map(|file| file.id) == Some(file_id) {
            self.active = Some(normalized);
            return ReconcileOutcome::Activated { file_name: filename };
        }

        let duplicate = self
            .pending
            .iter()
            .any(|p| p.file_id == Some(file_id) && p.filename == filename);
        if duplicate {
            return ReconcileOutcome::Duplicate;
        }

        self.next_pending_seq += 1;
        self.pending.push(PendingResult {
            id: format!("{}-{}", job_id, self.next_pending_seq),
            file_id: Some(file_id),
            filename: filename.clone(),
            payload: normalized,
            processed_at,
        });
        ReconcileOutcome::FiledPending { file_name: filename }
    }

    // ---- pending results ----

    pub(crate) fn open_pending(&mut self, id: &str) -> OpenOutcome {
        let Some(pos) = self.pending.iter().position(|p| p.id == id) else {
            return OpenOutcome::Missing;
        };
        let entry = self.pending.remove(pos);
        self.mark_dirty();
        match entry.file_id.and_then(|fid| self.position_of(fid)) {
            Some(index) => {
                self.select_file(index);
                OpenOutcome::Selected
            }
            None => {
                self.active = Some(entry.payload);
                OpenOutcome::Activated
            }
        }
    }

    /// Re-add unviewed results from a previous session, deduplicated by
    /// filename. Restored entries carry no file id.
    pub(crate) fn restore_pending(&mut self, snapshots: Vec<PendingSnapshot>) -> usize {
        let mut added = 0;
        for snap in snapshots {
            let exists = self
                .pending
                .iter()
                .any(|p| p.file_id.is_none() && p.filename == snap.filename);
            if exists {
                continue;
            }
            self.next_pending_seq += 1;
            self.pending.push(PendingResult {
                id: format!("restored-{}", self.next_pending_seq),
                file_id: None,
                filename: snap.filename,
                payload: snap.payload,
                processed_at: snap.processed_at,
            });
            added += 1;
        }
        if added > 0 {
            self.mark_dirty();
        }
        added
    }

    // ---- editing and saving ----

    pub(crate) fn apply_edit(&mut self, payload: OcrPayload) {
        if let Some(file_id) = self.selected_file().map(|file| file.id) {
            self.results.insert(file_id, payload.clone());
        }
        self.active = Some(payload);
        self.mark_dirty();
    }

    /// Build the save job for the active result, pairing the corrected
    /// payload with the as-reconciled original and the selected file's
    /// image bytes.
    pub(crate) fn save_request(&self) -> Option<crate::effect::SaveJob> {
        let edited = self.active.clone()?;
        match self.selected_file() {
            Some(file) => {
                let original = self
                    .correlations
                    .values()
                    .find(|corr| corr.file_id == file.id)
                    .and_then(|corr| corr.payload.clone())
                    .unwrap_or_else(|| edited.clone());
                Some(crate::effect::SaveJob {
                    original,
                    edited,
                    file_name: Some(file.name.clone()),
                    mime: Some(file.mime.clone()),
                    image: Some(file.bytes.clone()),
                })
            }
            None => Some(crate::effect::SaveJob {
                original: edited.clone(),
                edited,
                file_name: None,
                mime: None,
                image: None,
            }),
        }
    }
}

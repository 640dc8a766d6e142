use std::fs;
use std::path::Path;

use intake_core::PendingSnapshot;
use intake_engine::{ensure_output_dir, AtomicFileWriter};
use intake_logging::{intake_error, intake_info, intake_warn};
use serde::{Deserialize, Serialize};

const STATE_FILENAME: &str = ".intake_results.ron";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedState {
    written_at: String,
    pending: Vec<PendingSnapshot>,
}

/// Unviewed results left behind by the previous session, if any.
pub(crate) fn load_pending(output_dir: &Path) -> Vec<PendingSnapshot> {
    let path = output_dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Vec::new();
        }
        Err(err) => {
            intake_warn!("Failed to read persisted results from {:?}: {}", path, err);
            return Vec::new();
        }
    };

    let state: PersistedState = match ron::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            intake_warn!("Failed to parse persisted results from {:?}: {}", path, err);
            return Vec::new();
        }
    };

    intake_info!(
        "Loaded persisted results from {:?} (written {})",
        path,
        state.written_at
    );
    state.pending
}

/// Persist unviewed results so the next session can offer them again.
/// An empty list removes any stale snapshot instead.
pub(crate) fn save_pending(output_dir: &Path, pending: &[PendingSnapshot]) {
    let path = output_dir.join(STATE_FILENAME);
    if pending.is_empty() {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
        return;
    }

    if let Err(err) = ensure_output_dir(output_dir) {
        intake_error!("Failed to ensure output dir {:?}: {}", output_dir, err);
        return;
    }

    let state = PersistedState {
        written_at: chrono::Utc::now().to_rfc3339(),
        pending: pending.to_vec(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&state, pretty) {
        Ok(content) => content,
        Err(err) => {
            intake_error!("Failed to serialize session snapshot: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(output_dir.to_path_buf());
    match writer.write(STATE_FILENAME, &content) {
        Ok(path) => intake_info!(
            "Persisted {} unviewed result(s) to {:?}",
            pending.len(),
            path
        ),
        Err(err) => intake_error!("Failed to persist session snapshot: {}", err),
    }
}

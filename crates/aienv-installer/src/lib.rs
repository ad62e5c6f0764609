mod artifact;
mod backup;
mod fs_utils;
mod lock;
mod prompt;
mod scan;
mod session;
mod types;
mod update;

pub use artifact::{
    extract_and_install, extract_archive, install_staged, replace_entry, stage_update,
    StagedUpdate,
};
pub use backup::{cleanup_backup, create_backup, restore_backup};
pub use lock::{UpdateLock, LOCK_WRITE_GRACE};
pub use prompt::{parse_confirmation, parse_selection};
pub use scan::{find_candidate, latest_candidate, scan_for_updates, sort_candidates};
pub use session::{render_candidate_lines, run_update_session, update_info_lines};
pub use types::{
    BackupReport, InstallReport, ReplacedEntry, RollbackStatus, UpdateCandidate, UpdateOutcome,
    UpdateStage,
};
pub use update::{apply_update, apply_update_with_hooks};

#[cfg(test)]
mod tests;

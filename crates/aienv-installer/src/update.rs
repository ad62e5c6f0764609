use std::path::Path;

use aienv_core::{InstallLayout, ProcessControl, SystemProcessControl};
use anyhow::Result;

use crate::artifact::{extract_archive, install_staged, replace_entry, stage_update};
use crate::backup::{cleanup_backup, create_backup, restore_backup};
use crate::fs_utils::remove_path_if_exists;
use crate::lock::UpdateLock;
use crate::types::{BackupReport, RollbackStatus, UpdateCandidate, UpdateOutcome, UpdateStage};

/// Backs up, extracts and installs `candidate`, rolling back on install failure.
pub fn apply_update(layout: &InstallLayout, candidate: &UpdateCandidate) -> UpdateOutcome {
    apply_update_with_hooks(
        layout,
        candidate,
        &SystemProcessControl,
        |archive, dst| extract_archive(archive, dst, candidate.kind),
        replace_entry,
    )
}

pub fn apply_update_with_hooks<C, Extract, Replace>(
    layout: &InstallLayout,
    candidate: &UpdateCandidate,
    control: &C,
    extract: Extract,
    replace: Replace,
) -> UpdateOutcome
where
    C: ProcessControl,
    Extract: FnMut(&Path, &Path) -> Result<()>,
    Replace: FnMut(&Path, &Path) -> Result<()>,
{
    let _lock = match UpdateLock::acquire(layout, control) {
        Ok(lock) => lock,
        Err(err) => return failed(UpdateStage::Lock, &err, RollbackStatus::NotNeeded),
    };

    let backup = match create_backup(layout) {
        Ok(backup) => backup,
        Err(err) => return failed(UpdateStage::Backup, &err, RollbackStatus::NotNeeded),
    };

    let staged = match stage_update(layout, candidate, extract) {
        Ok(staged) => staged,
        Err(err) => {
            cleanup_backup(layout);
            return failed(UpdateStage::Extract, &err, RollbackStatus::NotNeeded);
        }
    };

    match install_staged(layout, &staged, replace) {
        Ok(report) => {
            if report.launcher_replaced {
                tracing::info!("launcher script was replaced; changes take effect on next restart");
            }
            cleanup_backup(layout);
            tracing::info!(archive = %candidate.name, "update installed");
            UpdateOutcome::Installed {
                candidate: candidate.name.clone(),
                report,
            }
        }
        Err(err) => {
            let rollback = roll_back(layout, &backup);
            failed(UpdateStage::Install, &err, rollback)
        }
    }
}

fn roll_back(layout: &InstallLayout, backup: &BackupReport) -> RollbackStatus {
    let restored = restore_backup(layout).and_then(|restored| {
        for rel in &backup.absent {
            remove_path_if_exists(&layout.root().join(rel))?;
        }
        Ok(restored)
    });

    match restored {
        Ok(restored) => {
            tracing::info!(entries = restored.len(), "installation restored from backup");
            RollbackStatus::Restored(restored)
        }
        Err(err) => {
            tracing::error!(
                error = %format!("{err:#}"),
                backup = %layout.backup_dir().display(),
                "rollback failed; backup left in place"
            );
            RollbackStatus::Failed(format!("{err:#}"))
        }
    }
}

fn failed(stage: UpdateStage, err: &anyhow::Error, rollback: RollbackStatus) -> UpdateOutcome {
    let message = format!("{err:#}");
    tracing::error!(stage = %stage, error = %message, "update failed");
    UpdateOutcome::Failed {
        stage,
        message,
        rollback,
    }
}

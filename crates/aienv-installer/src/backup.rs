use std::fs;

use aienv_core::{InstallLayout, CRITICAL_PATHS};
use anyhow::{anyhow, Context, Result};

use crate::fs_utils::{copy_path, remove_path_if_exists, sorted_entry_names};
use crate::types::BackupReport;

/// Replaces any previous backup with a fresh copy of the critical paths.
pub fn create_backup(layout: &InstallLayout) -> Result<BackupReport> {
    let backup_dir = layout.backup_dir();
    remove_path_if_exists(&backup_dir)
        .with_context(|| format!("failed to clear previous backup: {}", backup_dir.display()))?;
    fs::create_dir_all(&backup_dir)
        .with_context(|| format!("failed to create {}", backup_dir.display()))?;

    let mut report = BackupReport::default();
    for rel in CRITICAL_PATHS {
        let source = layout.root().join(rel);
        if fs::symlink_metadata(&source).is_err() {
            tracing::debug!(path = rel, "critical path absent, skipping backup");
            report.absent.push(rel.to_string());
            continue;
        }

        copy_path(&source, &backup_dir.join(rel))
            .with_context(|| format!("failed to back up {rel}"))?;
        report.copied.push(rel.to_string());
    }

    tracing::info!(copied = report.copied.len(), dir = %backup_dir.display(), "backup created");
    Ok(report)
}

/// Copies every top-level backup entry back over the live installation.
///
/// Directories are replaced wholesale. Returns the restored entry names.
pub fn restore_backup(layout: &InstallLayout) -> Result<Vec<String>> {
    let backup_dir = layout.backup_dir();
    if !backup_dir.is_dir() {
        return Err(anyhow!(
            "no backup available to restore from: {}",
            backup_dir.display()
        ));
    }

    let mut restored = Vec::new();
    for name in sorted_entry_names(&backup_dir)? {
        let dest = layout.root().join(&name);
        remove_path_if_exists(&dest)?;
        copy_path(&backup_dir.join(&name), &dest)
            .with_context(|| format!("failed to restore {name} from backup"))?;
        tracing::info!(entry = %name, "restored from backup");
        restored.push(name);
    }
    Ok(restored)
}

/// Deletes the backup folder. Failures are logged and otherwise ignored.
pub fn cleanup_backup(layout: &InstallLayout) -> bool {
    let backup_dir = layout.backup_dir();
    match remove_path_if_exists(&backup_dir) {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(error = %format!("{err:#}"), "ignoring backup cleanup failure");
            false
        }
    }
}

use std::fmt;
use std::path::PathBuf;

use aienv_core::ArchiveType;

/// An archive found in the drop directory at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCandidate {
    pub path: PathBuf,
    pub name: String,
    pub version: Option<String>,
    pub size: u64,
    pub kind: ArchiveType,
}

impl UpdateCandidate {
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupReport {
    pub copied: Vec<String>,
    /// Critical paths that did not exist in the live tree when the backup was taken.
    pub absent: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacedEntry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub replaced: Vec<ReplacedEntry>,
    pub launcher_replaced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    Lock,
    Backup,
    Extract,
    Install,
}

impl UpdateStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Backup => "backup",
            Self::Extract => "extract",
            Self::Install => "install",
        }
    }
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackStatus {
    /// The live tree was never modified.
    NotNeeded,
    Restored(Vec<String>),
    /// Restoration failed; the backup folder was left in place.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    NoUpdates,
    Cancelled,
    Installed {
        candidate: String,
        report: InstallReport,
    },
    Failed {
        stage: UpdateStage,
        message: String,
        rollback: RollbackStatus,
    },
}

impl UpdateOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

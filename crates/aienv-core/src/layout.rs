use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const DISTRIBUTION_ROOT: &str = "AI_Environment";
pub const DROP_DIR_NAME: &str = "new_versions";
pub const BACKUP_DIR_NAME: &str = "backup";
pub const LAUNCHER_SCRIPT: &str = "run_ai_env.bat";

/// Entries under the distribution root that are never copied over the live tree.
pub const RESERVED_INSTALL_NAMES: [&str; 2] = [DROP_DIR_NAME, BACKUP_DIR_NAME];

/// Paths, relative to the install root, that are snapshotted before an update.
pub const CRITICAL_PATHS: [&str; 8] = [
    "src",
    "config",
    "version_config.json",
    LAUNCHER_SCRIPT,
    "setup_python_env.bat",
    "check_versions.bat",
    "README.md",
    "PACKAGE_INFO.txt",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
    distribution_root: String,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            distribution_root: DISTRIBUTION_ROOT.to_string(),
        }
    }

    pub fn with_distribution_root(mut self, name: impl Into<String>) -> Self {
        self.distribution_root = name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn distribution_root(&self) -> &str {
        &self.distribution_root
    }

    pub fn drop_dir(&self) -> PathBuf {
        self.root.join(DROP_DIR_NAME)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join(BACKUP_DIR_NAME)
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("Projects")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join("background_processes.json")
    }

    pub fn version_manifest_path(&self) -> PathBuf {
        self.root.join("version_config.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("aienv.toml")
    }

    pub fn update_lock_path(&self) -> PathBuf {
        self.root.join("update.lock")
    }

    pub fn launcher_script_path(&self) -> PathBuf {
        self.root.join(LAUNCHER_SCRIPT)
    }

    pub fn critical_paths(&self) -> Vec<PathBuf> {
        CRITICAL_PATHS.iter().map(|rel| self.root.join(rel)).collect()
    }

    pub fn is_reserved_name(name: &str) -> bool {
        RESERVED_INSTALL_NAMES
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [self.root.clone(), self.drop_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn resolve_install_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root.to_path_buf());
    }

    std::env::current_dir().context("failed to resolve current directory as install root")
}

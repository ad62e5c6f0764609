mod archive;
mod config;
mod layout;
mod process;
mod version;

pub use archive::ArchiveType;
pub use config::{AppPreset, EnvironmentConfig, InstallerConfig};
pub use layout::{
    resolve_install_root, InstallLayout, BACKUP_DIR_NAME, CRITICAL_PATHS, DISTRIBUTION_ROOT,
    DROP_DIR_NAME, LAUNCHER_SCRIPT, RESERVED_INSTALL_NAMES,
};
pub use process::{validate_pid, ProcessControl, SystemProcessControl, Termination};
pub use version::{extract_version_token, read_installed_version};

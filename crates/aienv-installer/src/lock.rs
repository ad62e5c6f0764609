use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use aienv_core::{InstallLayout, ProcessControl};
use anyhow::{anyhow, Context, Result};

/// How long a lock without a readable owner PID counts as freshly claimed.
pub const LOCK_WRITE_GRACE: Duration = Duration::from_secs(30);

/// Marker file claimed for the duration of an update so that two installers
/// never share one backup folder. Released on drop.
#[derive(Debug)]
pub struct UpdateLock {
    path: PathBuf,
}

impl UpdateLock {
    /// Claims the lock. A marker left behind by a PID that is no longer running
    /// is treated as stale and reclaimed once. A marker without a readable PID
    /// is only stale once it is older than [`LOCK_WRITE_GRACE`].
    pub fn acquire<C: ProcessControl>(layout: &InstallLayout, control: &C) -> Result<Self> {
        let path = layout.update_lock_path();
        match try_claim(&path) {
            Ok(lock) => return Ok(lock),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to claim update lock: {}", path.display()));
            }
        }

        let owner = read_owner(&path);
        match owner {
            Some(pid) if pid != std::process::id() && control.is_running(pid) => {
                return Err(anyhow!(
                    "another update is already in progress (pid={pid} lock={})",
                    path.display()
                ));
            }
            None if written_within(&path, LOCK_WRITE_GRACE) => {
                return Err(anyhow!(
                    "another update is claiming the lock (lock={})",
                    path.display()
                ));
            }
            _ => {}
        }

        tracing::warn!(owner = ?owner, path = %path.display(), "reclaiming stale update lock");
        fs::remove_file(&path)
            .with_context(|| format!("failed to remove stale update lock: {}", path.display()))?;
        try_claim(&path)
            .with_context(|| format!("failed to claim update lock: {}", path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UpdateLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %err, "failed to release update lock");
        }
    }
}

fn try_claim(path: &Path) -> io::Result<UpdateLock> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(format!("{}\n", std::process::id()).as_bytes())?;
    file.flush()?;
    Ok(UpdateLock {
        path: path.to_path_buf(),
    })
}

fn read_owner(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn written_within(path: &Path, window: Duration) -> bool {
    let Ok(modified) = fs::metadata(path).and_then(|metadata| metadata.modified()) else {
        return false;
    };
    match SystemTime::now().duration_since(modified) {
        Ok(age) => age < window,
        // Clock skew: a timestamp in the future is as fresh as it gets.
        Err(_) => true,
    }
}

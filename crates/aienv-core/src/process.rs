use std::process::Command;

use anyhow::{anyhow, Context, Result};
use sysinfo::{Pid, System};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Terminated,
    /// The PID no longer exists; the process exited on its own.
    NotFound,
}

/// OS-level process operations used by the registry and the update lock.
pub trait ProcessControl {
    fn terminate(&self, pid: u32) -> Result<Termination>;
    fn is_running(&self, pid: u32) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessControl;

impl ProcessControl for SystemProcessControl {
    fn terminate(&self, pid: u32) -> Result<Termination> {
        let mut command = build_terminate_command(pid)?;
        let output = command
            .output()
            .with_context(|| format!("failed to run {command:?}: command failed to start"))?;
        if output.status.success() {
            return Ok(Termination::Terminated);
        }

        if !self.is_running(pid) {
            return Ok(Termination::NotFound);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        Err(anyhow!(
            "failed to terminate pid {pid}: status={} stdout='{}' stderr='{}'",
            output.status,
            stdout.trim(),
            stderr.trim()
        ))
    }

    fn is_running(&self, pid: u32) -> bool {
        let mut system = System::new();
        system.refresh_process(Pid::from_u32(pid))
    }
}

/// Rejects PIDs that `kill` would read as a process group or as "every process":
/// `0` and anything above `i32::MAX`.
pub fn validate_pid(pid: u32) -> Result<()> {
    if pid == 0 || pid > i32::MAX as u32 {
        return Err(anyhow!("invalid pid {pid}: must be between 1 and {}", i32::MAX));
    }
    Ok(())
}

pub(crate) fn build_terminate_command(pid: u32) -> Result<Command> {
    validate_pid(pid)?;
    if cfg!(windows) {
        let mut command = Command::new("taskkill");
        command.args(["/F", "/PID", &pid.to_string()]);
        Ok(command)
    } else {
        let mut command = Command::new("kill");
        command.args(["-KILL", &pid.to_string()]);
        Ok(command)
    }
}

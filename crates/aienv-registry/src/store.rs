use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use aienv_core::{validate_pid, InstallLayout, ProcessControl, Termination};
use anyhow::{Context, Result};
use chrono::Local;
use serde_json::{Map, Value};

use crate::types::{ProcessStatus, StopAllReport, StopOutcome, StopStatus, TrackedProcess};

/// JSON-backed bookkeeping of processes launched by this tool.
///
/// The file is read lazily on first access and rewritten in full after every
/// mutation. A missing or corrupt file behaves as an empty registry.
#[derive(Debug, Clone)]
pub struct ProcessRegistry {
    path: PathBuf,
    entries: BTreeMap<String, TrackedProcess>,
    loaded: bool,
}

impl ProcessRegistry {
    pub fn open(layout: &InstallLayout) -> Self {
        Self::at_path(layout.registry_path())
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
            loaded: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the registry file, replacing the in-memory view.
    pub fn load(&mut self) -> &BTreeMap<String, TrackedProcess> {
        self.entries = read_registry_file(&self.path);
        self.loaded = true;
        &self.entries
    }

    pub fn save(&self) -> Result<()> {
        write_registry_file(&self.path, &self.entries)
    }

    pub fn track(
        &mut self,
        process_id: &str,
        name: &str,
        pid: u32,
        command: &str,
        url: Option<&str>,
    ) -> Result<TrackedProcess> {
        validate_pid(pid).with_context(|| format!("refusing to track {process_id}"))?;
        self.ensure_loaded();
        let process = TrackedProcess {
            process_id: process_id.to_string(),
            name: name.to_string(),
            pid,
            command: command.to_string(),
            url: url.map(ToOwned::to_owned),
            start_time: Local::now(),
        };
        if self
            .entries
            .insert(process_id.to_string(), process.clone())
            .is_some()
        {
            tracing::debug!(process_id, "replacing existing registry entry");
        }
        self.save()?;
        tracing::info!(process_id, pid, "tracking process");
        Ok(process)
    }

    pub fn list(&mut self) -> &BTreeMap<String, TrackedProcess> {
        self.ensure_loaded();
        &self.entries
    }

    pub fn get(&mut self, process_id: &str) -> Option<&TrackedProcess> {
        self.ensure_loaded();
        self.entries.get(process_id)
    }

    pub fn is_empty(&mut self) -> bool {
        self.list().is_empty()
    }

    /// Force-terminates one tracked process and forgets it.
    ///
    /// The entry is dropped whether or not termination succeeded. Only a failure
    /// to persist the registry is returned as an error.
    pub fn stop<C: ProcessControl>(&mut self, control: &C, process_id: &str) -> Result<StopOutcome> {
        self.ensure_loaded();
        let Some(process) = self.entries.remove(process_id) else {
            return Ok(StopOutcome {
                process_id: process_id.to_string(),
                name: None,
                pid: None,
                status: StopStatus::NotTracked,
            });
        };

        let outcome = terminate_tracked(control, &process);
        self.save().with_context(|| {
            format!(
                "stop outcome not persisted: {}",
                summarize_outcomes(std::slice::from_ref(&outcome))
            )
        })?;
        Ok(outcome)
    }

    /// Stops every tracked process, continuing past individual failures, and
    /// always leaves an empty registry on disk.
    pub fn stop_all<C: ProcessControl>(&mut self, control: &C) -> Result<StopAllReport> {
        self.ensure_loaded();
        let entries = std::mem::take(&mut self.entries);
        let outcomes = entries
            .values()
            .map(|process| terminate_tracked(control, process))
            .collect::<Vec<_>>();
        self.save().with_context(|| {
            format!(
                "stop outcomes not persisted: {}",
                summarize_outcomes(&outcomes)
            )
        })?;
        Ok(StopAllReport { outcomes })
    }

    pub fn status<C: ProcessControl>(&mut self, control: &C) -> Vec<ProcessStatus> {
        self.ensure_loaded();
        self.entries
            .values()
            .map(|process| ProcessStatus {
                running: control.is_running(process.pid),
                process: process.clone(),
            })
            .collect()
    }

    /// Forgets entries whose PID is no longer running; the registry file is only
    /// rewritten when something was removed.
    pub fn prune_dead<C: ProcessControl>(&mut self, control: &C) -> Result<Vec<TrackedProcess>> {
        self.ensure_loaded();
        let dead_ids = self
            .entries
            .values()
            .filter(|process| !control.is_running(process.pid))
            .map(|process| process.process_id.clone())
            .collect::<Vec<_>>();

        let mut pruned = Vec::with_capacity(dead_ids.len());
        for process_id in dead_ids {
            if let Some(process) = self.entries.remove(&process_id) {
                tracing::debug!(process_id = %process.process_id, pid = process.pid, "pruning dead process");
                pruned.push(process);
            }
        }

        if !pruned.is_empty() {
            self.save()?;
        }
        Ok(pruned)
    }

    fn ensure_loaded(&mut self) {
        if !self.loaded {
            self.load();
        }
    }
}

fn terminate_tracked<C: ProcessControl>(control: &C, process: &TrackedProcess) -> StopOutcome {
    let status = match control.terminate(process.pid) {
        Ok(Termination::Terminated) => {
            tracing::info!(process_id = %process.process_id, pid = process.pid, "stopped process");
            StopStatus::Stopped
        }
        Ok(Termination::NotFound) => {
            tracing::info!(process_id = %process.process_id, pid = process.pid, "process already stopped");
            StopStatus::AlreadyExited
        }
        Err(err) => {
            tracing::warn!(process_id = %process.process_id, pid = process.pid, error = %err, "failed to stop process");
            StopStatus::Failed(format!("{err:#}"))
        }
    };

    StopOutcome {
        process_id: process.process_id.clone(),
        name: Some(process.name.clone()),
        pid: Some(process.pid),
        status,
    }
}

/// `id=status` pairs, so a persistence error still tells the caller what was killed.
fn summarize_outcomes(outcomes: &[StopOutcome]) -> String {
    outcomes
        .iter()
        .map(|outcome| {
            let status = match &outcome.status {
                StopStatus::Stopped => "stopped".to_string(),
                StopStatus::AlreadyExited => "already-exited".to_string(),
                StopStatus::NotTracked => "not-tracked".to_string(),
                StopStatus::Failed(reason) => format!("failed({reason})"),
            };
            format!("{}={status}", outcome.process_id)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn read_registry_file(path: &Path) -> BTreeMap<String, TrackedProcess> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable process registry, treating as empty");
            return BTreeMap::new();
        }
    };

    let object: Map<String, Value> = match serde_json::from_str(&raw) {
        Ok(object) => object,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "corrupt process registry, treating as empty");
            return BTreeMap::new();
        }
    };

    let mut entries = BTreeMap::new();
    for (process_id, value) in object {
        match serde_json::from_value::<TrackedProcess>(value) {
            Ok(mut process) => {
                process.process_id = process_id.clone();
                entries.insert(process_id, process);
            }
            Err(err) => {
                tracing::debug!(process_id = %process_id, error = %err, "dropping malformed registry entry");
            }
        }
    }
    entries
}

fn write_registry_file(path: &Path, entries: &BTreeMap<String, TrackedProcess>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let payload = serde_json::to_string_pretty(entries)
        .with_context(|| format!("failed serializing process registry: {}", path.display()))?;

    let mut staged = path.as_os_str().to_owned();
    staged.push(".tmp");
    let staged = PathBuf::from(staged);
    fs::write(&staged, payload.as_bytes())
        .with_context(|| format!("failed to write process registry: {}", staged.display()))?;
    fs::rename(&staged, path).with_context(|| {
        format!(
            "failed to replace process registry {} with {}",
            path.display(),
            staged.display()
        )
    })
}

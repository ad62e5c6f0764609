use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// One process started by this tool, keyed by a caller-chosen id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedProcess {
    #[serde(skip)]
    pub process_id: String,
    pub name: String,
    pub pid: u32,
    pub command: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(deserialize_with = "deserialize_start_time")]
    pub start_time: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopStatus {
    Stopped,
    AlreadyExited,
    NotTracked,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOutcome {
    pub process_id: String,
    pub name: Option<String>,
    pub pid: Option<u32>,
    pub status: StopStatus,
}

impl StopOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self.status, StopStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopAllReport {
    pub outcomes: Vec<StopOutcome>,
}

impl StopAllReport {
    pub fn failures(&self) -> impl Iterator<Item = &StopOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStatus {
    pub process: TrackedProcess,
    pub running: bool,
}

// Older registry files carry naive local timestamps without an offset.
fn deserialize_start_time<'de, D>(deserializer: D) -> Result<DateTime<Local>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Local));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid start_time: {raw}")))
}

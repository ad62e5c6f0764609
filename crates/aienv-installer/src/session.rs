use std::io::{BufRead, Write};

use aienv_core::{read_installed_version, InstallLayout};
use anyhow::{Context, Result};
use semver::Version;

use crate::prompt::{parse_confirmation, parse_selection};
use crate::scan::scan_for_updates;
use crate::types::{UpdateCandidate, UpdateOutcome};

/// Runs the scan, select and confirm steps against `input`/`output`, then hands
/// the chosen candidate to `apply`.
///
/// End of input at either prompt cancels. `apply` is never called unless the
/// operator picked a candidate and explicitly confirmed it.
pub fn run_update_session<R, W, F>(
    layout: &InstallLayout,
    input: &mut R,
    output: &mut W,
    apply: F,
) -> Result<UpdateOutcome>
where
    R: BufRead,
    W: Write,
    F: FnOnce(&UpdateCandidate) -> UpdateOutcome,
{
    let candidates = scan_for_updates(layout)?;
    if candidates.is_empty() {
        writeln!(
            output,
            "No update archives found in {}",
            layout.drop_dir().display()
        )?;
        return Ok(UpdateOutcome::NoUpdates);
    }

    let installed = read_installed_version(&layout.version_manifest_path());
    writeln!(output, "Available updates:")?;
    for line in render_candidate_lines(&candidates, installed.as_ref()) {
        writeln!(output, "{line}")?;
    }
    writeln!(output, "  0. Cancel")?;

    write!(output, "Select update to install (0-{}): ", candidates.len())?;
    output.flush()?;
    let Some(answer) = read_answer(input)? else {
        writeln!(output)?;
        return Ok(UpdateOutcome::Cancelled);
    };
    let Some(index) = parse_selection(&answer, candidates.len()) else {
        writeln!(output, "Update cancelled")?;
        return Ok(UpdateOutcome::Cancelled);
    };

    let candidate = &candidates[index];
    writeln!(output, "Selected: {}", candidate.name)?;
    writeln!(
        output,
        "This replaces the installation under {} (a backup is taken first).",
        layout.root().display()
    )?;
    write!(output, "Continue with installation? (y/N): ")?;
    output.flush()?;

    let confirmed = read_answer(input)?
        .as_deref()
        .is_some_and(parse_confirmation);
    if !confirmed {
        writeln!(output, "Update cancelled")?;
        return Ok(UpdateOutcome::Cancelled);
    }

    tracing::info!(archive = %candidate.name, "update confirmed");
    Ok(apply(candidate))
}

/// One numbered menu line per candidate; versions above `installed` are flagged.
pub fn render_candidate_lines(
    candidates: &[UpdateCandidate],
    installed: Option<&Version>,
) -> Vec<String> {
    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let version = candidate
                .version
                .as_deref()
                .map(|version| format!("v{version}"))
                .unwrap_or_else(|| "unknown version".to_string());
            let mut line = format!(
                "  {}. {} ({version}, {:.1} MB)",
                index + 1,
                candidate.name,
                candidate.size_mb()
            );
            if is_newer(candidate, installed) {
                line.push_str(" [newer]");
            }
            line
        })
        .collect()
}

/// Read-only summary of the update facility for `update info`.
pub fn update_info_lines(layout: &InstallLayout) -> Vec<String> {
    let mut lines = vec![
        format!("Drop folder: {}", layout.drop_dir().display()),
        format!(
            "Expected archive layout: <archive>/{}/...",
            layout.distribution_root()
        ),
    ];

    match read_installed_version(&layout.version_manifest_path()) {
        Some(version) => lines.push(format!("Installed version: {version}")),
        None => lines.push("Installed version: unknown".to_string()),
    }

    lines.push("Safety: critical files are backed up before installation".to_string());
    lines.push("Safety: a failed installation is rolled back from the backup".to_string());
    lines.push("Safety: only one update may run at a time".to_string());

    match scan_for_updates(layout) {
        Ok(candidates) if candidates.is_empty() => {
            lines.push("Available updates: none".to_string());
        }
        Ok(candidates) => {
            lines.push(format!("Available updates: {}", candidates.len()));
            let installed = read_installed_version(&layout.version_manifest_path());
            lines.extend(render_candidate_lines(&candidates, installed.as_ref()));
        }
        Err(err) => lines.push(format!("Available updates: unavailable ({err:#})")),
    }
    lines
}

fn is_newer(candidate: &UpdateCandidate, installed: Option<&Version>) -> bool {
    let (Some(token), Some(installed)) = (candidate.version.as_deref(), installed) else {
        return false;
    };
    Version::parse(token).is_ok_and(|version| &version > installed)
}

fn read_answer<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("failed to read operator input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

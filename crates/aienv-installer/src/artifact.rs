use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use aienv_core::{ArchiveType, InstallLayout, LAUNCHER_SCRIPT};
use anyhow::{anyhow, Context, Result};
use tempfile::TempDir;

use crate::fs_utils::{copy_path, remove_path_if_exists, sorted_entry_names};
use crate::types::{InstallReport, ReplacedEntry, UpdateCandidate};

/// An archive unpacked into a private temp directory. The directory is removed on drop.
#[derive(Debug)]
pub struct StagedUpdate {
    _temp: TempDir,
    dist_root: PathBuf,
}

impl StagedUpdate {
    pub fn dist_root(&self) -> &Path {
        &self.dist_root
    }
}

pub fn extract_and_install(
    layout: &InstallLayout,
    candidate: &UpdateCandidate,
) -> Result<InstallReport> {
    let staged = stage_update(layout, candidate, |archive, dst| {
        extract_archive(archive, dst, candidate.kind)
    })?;
    install_staged(layout, &staged, replace_entry)
}

/// Extracts `candidate` through `extract` and locates the distribution root.
///
/// Nothing in the live installation is touched here.
pub fn stage_update<Extract>(
    layout: &InstallLayout,
    candidate: &UpdateCandidate,
    mut extract: Extract,
) -> Result<StagedUpdate>
where
    Extract: FnMut(&Path, &Path) -> Result<()>,
{
    let temp = tempfile::Builder::new()
        .prefix("aienv-update-")
        .tempdir()
        .context("failed to create temporary extraction directory")?;

    extract(&candidate.path, temp.path())
        .with_context(|| format!("failed to extract {}", candidate.name))?;

    let dist_root = temp.path().join(layout.distribution_root());
    if !dist_root.is_dir() {
        return Err(anyhow!(
            "invalid update archive {}: {} folder not found",
            candidate.name,
            layout.distribution_root()
        ));
    }

    for extra in sorted_entry_names(temp.path())?
        .into_iter()
        .filter(|name| name != layout.distribution_root())
    {
        tracing::warn!(entry = %extra, archive = %candidate.name, "ignoring entry outside distribution root");
    }

    Ok(StagedUpdate {
        _temp: temp,
        dist_root,
    })
}

/// Copies every entry under the distribution root over the live installation,
/// skipping the drop and backup folders.
pub fn install_staged<Replace>(
    layout: &InstallLayout,
    staged: &StagedUpdate,
    mut replace: Replace,
) -> Result<InstallReport>
where
    Replace: FnMut(&Path, &Path) -> Result<()>,
{
    let mut report = InstallReport::default();
    for name in sorted_entry_names(staged.dist_root())? {
        if InstallLayout::is_reserved_name(&name) {
            tracing::debug!(entry = %name, "skipping reserved entry");
            continue;
        }

        let src = staged.dist_root().join(&name);
        let dest = layout.root().join(&name);
        let is_dir = src.is_dir();
        replace(&src, &dest).with_context(|| format!("failed to install {name}"))?;
        tracing::info!(entry = %name, is_dir, "updated");

        if !is_dir && name.eq_ignore_ascii_case(LAUNCHER_SCRIPT) {
            report.launcher_replaced = true;
        }
        report.replaced.push(ReplacedEntry { name, is_dir });
    }
    Ok(report)
}

/// Removes `dest` (file or whole tree) and copies `src` into its place.
pub fn replace_entry(src: &Path, dest: &Path) -> Result<()> {
    remove_path_if_exists(dest)?;
    copy_path(src, dest)
}

pub fn extract_archive(archive_path: &Path, dst: &Path, kind: ArchiveType) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;
    match kind {
        ArchiveType::Zip => extract_zip(archive_path, dst),
        ArchiveType::TarGz => run_command(
            &mut build_tar_extract_command(archive_path, dst),
            "failed to extract tar archive",
        ),
    }
}

fn extract_zip(archive_path: &Path, dst: &Path) -> Result<()> {
    if cfg!(windows) {
        let mut command = build_expand_archive_command(archive_path, dst);
        match run_command(&mut command, "failed to extract zip archive with powershell") {
            Ok(()) => return Ok(()),
            Err(err) => tracing::debug!(error = %format!("{err:#}"), "powershell extraction failed"),
        }
    }

    let mut unzip_command = Command::new("unzip");
    unzip_command.arg("-q").arg(archive_path).arg("-d").arg(dst);
    match run_command(&mut unzip_command, "failed to extract zip archive with unzip") {
        Ok(()) => return Ok(()),
        Err(err) => tracing::debug!(error = %format!("{err:#}"), "unzip extraction failed"),
    }

    run_command(
        &mut build_tar_extract_command(archive_path, dst),
        "failed to extract zip archive with tar fallback",
    )
}

pub(crate) fn build_expand_archive_command(archive_path: &Path, dst: &Path) -> Command {
    let mut command = Command::new("powershell");
    command.arg("-NoProfile").arg("-Command").arg(format!(
        "Expand-Archive -LiteralPath '{}' -DestinationPath '{}' -Force",
        escape_ps_single_quote(archive_path),
        escape_ps_single_quote(dst)
    ));
    command
}

pub(crate) fn build_tar_extract_command(archive_path: &Path, dst: &Path) -> Command {
    let mut command = Command::new("tar");
    command.arg("-xf").arg(archive_path).arg("-C").arg(dst);
    command
}

fn run_command(command: &mut Command, context_message: &str) -> Result<()> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}

fn escape_ps_single_quote(path: &Path) -> String {
    path.display().to_string().replace('\'', "''")
}

use std::fs;
use std::io;

use aienv_core::{extract_version_token, ArchiveType, InstallLayout};
use anyhow::{Context, Result};
use semver::Version;

use crate::types::UpdateCandidate;

/// Lists update archives in the drop directory.
///
/// A missing drop directory means "no updates" rather than an error.
pub fn scan_for_updates(layout: &InstallLayout) -> Result<Vec<UpdateCandidate>> {
    let dir = layout.drop_dir();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read drop directory: {}", dir.display()));
        }
    };

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let metadata = entry
            .metadata()
            .with_context(|| format!("failed to stat {}", entry.path().display()))?;
        if !metadata.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(kind) = ArchiveType::infer_from_file_name(&name) else {
            continue;
        };

        candidates.push(UpdateCandidate {
            path: entry.path(),
            version: extract_version_token(&name),
            name,
            size: metadata.len(),
            kind,
        });
    }

    sort_candidates(&mut candidates);
    tracing::debug!(count = candidates.len(), dir = %dir.display(), "scanned drop directory");
    Ok(candidates)
}

/// Orders by `(version or "", name)` as plain strings, so unversioned archives come first.
pub fn sort_candidates(candidates: &mut [UpdateCandidate]) {
    candidates.sort_by(|a, b| {
        let a_key = (a.version.as_deref().unwrap_or(""), a.name.as_str());
        let b_key = (b.version.as_deref().unwrap_or(""), b.name.as_str());
        a_key.cmp(&b_key)
    });
}

pub fn find_candidate<'a>(
    candidates: &'a [UpdateCandidate],
    name: &str,
) -> Option<&'a UpdateCandidate> {
    candidates
        .iter()
        .find(|candidate| candidate.name.eq_ignore_ascii_case(name.trim()))
}

/// The candidate with the highest semantic version.
///
/// Listing order compares versions as strings, so it cannot answer "newest".
/// Candidates without a parsable version are never chosen.
pub fn latest_candidate(candidates: &[UpdateCandidate]) -> Option<&UpdateCandidate> {
    candidates
        .iter()
        .filter_map(|candidate| {
            let version = Version::parse(candidate.version.as_deref()?).ok()?;
            Some((version, candidate))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, candidate)| candidate)
}

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use semver::Version;
use serde_json::Value;

static VERSION_MATCHERS: OnceLock<Vec<Regex>> = OnceLock::new();

pub(crate) fn version_matchers() -> &'static [Regex] {
    VERSION_MATCHERS.get_or_init(|| {
        [
            r"(?i)v(\d+\.\d+\.\d+)",
            r"(?i)_v(\d+\.\d+\.\d+)",
            r"(\d+\.\d+\.\d+)",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("version matcher must compile"))
        .collect()
    })
}

/// Pulls a `X.Y.Z` token out of an archive file name.
///
/// Matchers are tried in order and the first hit wins, so `AI_Environment_v3.0.21.zip`
/// yields `3.0.21` through the `v`-prefixed matcher before the bare one is consulted.
pub fn extract_version_token(file_name: &str) -> Option<String> {
    version_matchers().iter().find_map(|matcher| {
        matcher
            .captures(file_name)
            .and_then(|captures| captures.get(1))
            .map(|token| token.as_str().to_string())
    })
}

/// Highest semantic version recorded in the version manifest, if any.
///
/// Considers `metadata.version` and every `expected_versions.<category>.<file>.version`.
/// A missing or malformed manifest is treated as "unknown".
pub fn read_installed_version(manifest_path: &Path) -> Option<Version> {
    let raw = fs::read_to_string(manifest_path).ok()?;
    let manifest: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(
                path = %manifest_path.display(),
                error = %err,
                "version manifest is not valid JSON"
            );
            return None;
        }
    };

    let mut candidates = Vec::new();
    if let Some(version) = manifest.pointer("/metadata/version").and_then(Value::as_str) {
        candidates.push(version);
    }
    if let Some(categories) = manifest
        .get("expected_versions")
        .and_then(Value::as_object)
    {
        for files in categories.values().filter_map(Value::as_object) {
            for file_info in files.values() {
                if let Some(version) = file_info.get("version").and_then(Value::as_str) {
                    candidates.push(version);
                }
            }
        }
    }

    candidates
        .into_iter()
        .filter_map(|raw| Version::parse(raw.trim()).ok())
        .max()
}

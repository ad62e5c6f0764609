use std::collections::HashSet;
use std::fs;
use std::io;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::layout::InstallLayout;

/// Optional `aienv.toml` at the install root.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub installer: InstallerConfig,
    #[serde(default)]
    pub apps: Vec<AppPreset>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallerConfig {
    pub distribution_root: Option<String>,
}

/// A launchable application. `{root}` inside `program` or `args` expands to the install root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppPreset {
    pub id: String,
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub url: Option<String>,
}

impl EnvironmentConfig {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(input).context("failed to parse aienv config")?;

        if let Some(name) = &config.installer.distribution_root {
            validate_distribution_root(name)?;
        }

        let mut seen_ids = HashSet::new();
        for app in &config.apps {
            validate_app_id(&app.id)?;
            if !seen_ids.insert(app.id.as_str()) {
                return Err(anyhow!("duplicate app declaration '{}'", app.id));
            }
            if app.program.trim().is_empty() {
                return Err(anyhow!("app '{}' must declare a program", app.id));
            }
        }

        Ok(config)
    }

    /// Reads `aienv.toml` from the install root; a missing file yields the defaults.
    pub fn load(layout: &InstallLayout) -> anyhow::Result<Self> {
        let path = layout.config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read config file: {}", path.display()));
            }
        };

        Self::from_toml_str(&raw)
            .with_context(|| format!("failed parsing config file: {}", path.display()))
    }

    pub fn apply_to_layout(&self, layout: InstallLayout) -> InstallLayout {
        match &self.installer.distribution_root {
            Some(name) => layout.with_distribution_root(name.trim()),
            None => layout,
        }
    }
}

fn validate_distribution_root(name: &str) -> anyhow::Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("installer.distribution_root must not be empty"));
    }
    if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
        return Err(anyhow!(
            "installer.distribution_root must be a single folder name: {name}"
        ));
    }
    Ok(())
}

fn validate_app_id(id: &str) -> anyhow::Result<()> {
    if id.trim().is_empty() {
        return Err(anyhow!("app id must not be empty"));
    }
    if id
        .chars()
        .any(|ch| !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'))
    {
        return Err(anyhow!("app id contains invalid character(s): {id}"));
    }
    Ok(())
}

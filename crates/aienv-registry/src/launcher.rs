use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use aienv_core::{AppPreset, EnvironmentConfig, InstallLayout};
use anyhow::{anyhow, Context, Result};

use crate::store::ProcessRegistry;
use crate::types::TrackedProcess;

/// Pause before opening a browser so the freshly spawned server can bind its port.
pub const BROWSER_OPEN_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub process_id: String,
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub url: Option<String>,
}

impl LaunchPlan {
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_if_needed)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn build_command(&self, working_dir: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
            command.creation_flags(CREATE_NEW_CONSOLE);
        }

        command
    }
}

pub fn builtin_presets() -> Vec<AppPreset> {
    let vscode_program = if cfg!(windows) { "code.cmd" } else { "code" };
    let mut presets = vec![
        preset(
            "ollama",
            "Ollama Server",
            "{root}/Ollama/ollama.exe",
            &["serve"],
            Some("http://127.0.0.1:11434"),
        ),
        preset(
            "jupyter",
            "Jupyter Lab",
            "jupyter",
            &["lab", "--no-browser", "--notebook-dir={root}/Projects"],
            Some("http://localhost:8888"),
        ),
        preset(
            "streamlit",
            "Streamlit Demo",
            "streamlit",
            &[
                "run",
                "{root}/Projects/streamlit_demo.py",
                "--server.headless=true",
            ],
            Some("http://localhost:8501"),
        ),
        preset(
            "tensorboard",
            "TensorBoard",
            "tensorboard",
            &["--logdir={root}/Projects/logs", "--port=6006"],
            Some("http://localhost:6006"),
        ),
        preset(
            "mlflow",
            "MLflow UI",
            "mlflow",
            &[
                "ui",
                "--backend-store-uri",
                "file:///{root}/Projects/mlruns",
                "--port=5000",
            ],
            Some("http://localhost:5000"),
        ),
        preset("vscode", "VS Code", vscode_program, &["{root}/Projects"], None),
    ];

    let explorer_program = if cfg!(windows) {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    presets.push(preset(
        "explorer",
        "File Explorer",
        explorer_program,
        &["{root}"],
        None,
    ));

    // Interactive consoles need a window of their own; `start` gives them one.
    if cfg!(windows) {
        presets.push(preset(
            "python",
            "Python REPL",
            "cmd",
            &["/C", "start", "Python REPL - AI Environment", "cmd", "/K", "python"],
            None,
        ));
        presets.push(preset(
            "conda",
            "Conda Prompt",
            "cmd",
            &[
                "/C",
                "start",
                "Conda Prompt - AI2025",
                "cmd",
                "/K",
                "{root}/Miniconda/Scripts/conda.exe",
                "activate",
                "AI2025",
            ],
            None,
        ));
    }
    presets
}

/// Built-in presets with `[[apps]]` from the config layered on top; a config
/// entry replaces a built-in with the same id.
pub fn resolve_presets(config: &EnvironmentConfig) -> Vec<AppPreset> {
    let mut presets = builtin_presets();
    for app in &config.apps {
        match presets.iter_mut().find(|existing| existing.id == app.id) {
            Some(existing) => *existing = app.clone(),
            None => presets.push(app.clone()),
        }
    }
    presets
}

pub fn find_preset<'a>(presets: &'a [AppPreset], id: &str) -> Option<&'a AppPreset> {
    presets
        .iter()
        .find(|preset| preset.id.eq_ignore_ascii_case(id))
}

pub fn plan_launch(layout: &InstallLayout, preset: &AppPreset) -> LaunchPlan {
    let root = layout.root().display().to_string();
    let expand = |value: &str| value.replace("{root}", &root);

    LaunchPlan {
        process_id: preset.id.clone(),
        name: preset.name.clone(),
        program: expand(&preset.program),
        args: preset.args.iter().map(|arg| expand(arg)).collect(),
        url: preset.url.clone(),
    }
}

pub fn launch(
    registry: &mut ProcessRegistry,
    layout: &InstallLayout,
    preset: &AppPreset,
) -> Result<TrackedProcess> {
    launch_with_spawner(registry, layout, preset, |command| {
        let child = command.spawn().with_context(|| {
            format!(
                "failed to start {}",
                command.get_program().to_string_lossy()
            )
        })?;
        Ok(child.id())
    })
}

/// Spawns the preset through `spawn` (which returns the child PID) and records it.
pub fn launch_with_spawner<Spawn>(
    registry: &mut ProcessRegistry,
    layout: &InstallLayout,
    preset: &AppPreset,
    mut spawn: Spawn,
) -> Result<TrackedProcess>
where
    Spawn: FnMut(&mut Command) -> Result<u32>,
{
    let projects_dir = layout.projects_dir();
    fs::create_dir_all(&projects_dir)
        .with_context(|| format!("failed to create {}", projects_dir.display()))?;

    let plan = plan_launch(layout, preset);
    let mut command = plan.build_command(layout.root());
    let pid = spawn(&mut command).map_err(|err| {
        anyhow!(
            "failed to launch {} ({}): {err:#}",
            plan.name,
            plan.display_command()
        )
    })?;
    tracing::info!(app = %plan.process_id, pid, "launched application");

    registry.track(
        &plan.process_id,
        &plan.name,
        pid,
        &plan.display_command(),
        plan.url.as_deref(),
    )
}

pub fn open_in_browser(url: &str) -> Result<()> {
    let mut command = build_open_url_command(url);
    let status = command
        .status()
        .with_context(|| format!("failed to open browser for {url}"))?;
    if !status.success() {
        return Err(anyhow!("browser launcher exited with {status} for {url}"));
    }
    Ok(())
}

pub(crate) fn build_open_url_command(url: &str) -> Command {
    if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", "", url]);
        command
    } else if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(url);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(url);
        command
    }
}

fn preset(id: &str, name: &str, program: &str, args: &[&str], url: Option<&str>) -> AppPreset {
    AppPreset {
        id: id.to_string(),
        name: name.to_string(),
        program: program.to_string(),
        args: args.iter().map(|arg| arg.to_string()).collect(),
        url: url.map(ToOwned::to_owned),
    }
}

fn quote_if_needed(value: &str) -> String {
    if value.contains(char::is_whitespace) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::time::Duration;

use aienv_core::AppPreset;
use aienv_installer::{RollbackStatus, UpdateOutcome};
use aienv_registry::{ProcessStatus, StopOutcome, StopStatus, TrackedProcess};
use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

pub(crate) struct TerminalSpinner {
    progress_bar: Option<ProgressBar>,
}

impl TerminalRenderer {
    pub(crate) fn current(plain: bool) -> Self {
        Self {
            style: current_output_style(plain),
        }
    }

    pub(crate) fn style(self) -> OutputStyle {
        self.style
    }

    pub(crate) fn print_status(self, status: &str, message: &str) {
        println!("{}", render_status_line(self.style, status, message));
    }

    pub(crate) fn print_section(self, title: &str) {
        if self.style == OutputStyle::Plain {
            return;
        }
        println!("{}", colorize(section_style(), &format!("== {title} ==")));
    }

    pub(crate) fn print_lines(self, lines: &[String]) {
        for line in lines {
            println!("{line}");
        }
    }

    pub(crate) fn start_spinner(self, label: &str) -> TerminalSpinner {
        if self.style == OutputStyle::Plain {
            return TerminalSpinner { progress_bar: None };
        }

        let progress_bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg} {elapsed}") {
            progress_bar.set_style(style.tick_chars("<^>v "));
        }
        progress_bar.set_message(label.to_string());
        progress_bar.enable_steady_tick(Duration::from_millis(80));
        TerminalSpinner {
            progress_bar: Some(progress_bar),
        }
    }
}

impl TerminalSpinner {
    pub(crate) fn finish(mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }
}

pub(crate) fn current_output_style(plain: bool) -> OutputStyle {
    resolve_output_style(
        plain,
        std::io::stdout().is_terminal(),
        std::env::var_os("NO_COLOR").is_some(),
    )
}

pub(crate) fn resolve_output_style(
    plain: bool,
    stdout_is_terminal: bool,
    no_color: bool,
) -> OutputStyle {
    if plain || no_color || !stdout_is_terminal {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "err" => "[ERR]",
        _ => "[..]",
    }
}

pub(crate) fn format_process_lines(processes: &BTreeMap<String, TrackedProcess>) -> Vec<String> {
    let mut lines = Vec::new();
    for (process_id, process) in processes {
        let mut line = format!(
            "{process_id}: {} (pid {}) started {}",
            process.name,
            process.pid,
            process.start_time.format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(url) = &process.url {
            line.push_str(&format!(" url={url}"));
        }
        lines.push(line);
        lines.push(format!("    command: {}", process.command));
    }
    lines
}

pub(crate) fn format_status_lines(statuses: &[ProcessStatus], style: OutputStyle) -> Vec<String> {
    statuses
        .iter()
        .map(|status| {
            let process = &status.process;
            let (badge, state) = if status.running {
                ("ok", "running")
            } else {
                ("warn", "not running")
            };
            render_status_line(
                style,
                badge,
                &format!(
                    "{}: {} (pid {}) {state}",
                    process.process_id, process.name, process.pid
                ),
            )
        })
        .collect()
}

pub(crate) fn format_stop_outcome_line(outcome: &StopOutcome, style: OutputStyle) -> String {
    let subject = match (&outcome.name, outcome.pid) {
        (Some(name), Some(pid)) => format!("{} ({name}, pid {pid})", outcome.process_id),
        _ => outcome.process_id.clone(),
    };
    match &outcome.status {
        StopStatus::Stopped => render_status_line(style, "ok", &format!("stopped {subject}")),
        StopStatus::AlreadyExited => {
            render_status_line(style, "ok", &format!("{subject} had already exited"))
        }
        StopStatus::NotTracked => render_status_line(
            style,
            "warn",
            &format!("no tracked process with id '{}'", outcome.process_id),
        ),
        StopStatus::Failed(reason) => render_status_line(
            style,
            "err",
            &format!("failed to stop {subject}: {reason}"),
        ),
    }
}

pub(crate) fn format_preset_lines(presets: &[AppPreset]) -> Vec<String> {
    presets
        .iter()
        .map(|preset| match &preset.url {
            Some(url) => format!("{:<12} {} ({url})", preset.id, preset.name),
            None => format!("{:<12} {}", preset.id, preset.name),
        })
        .collect()
}

pub(crate) fn format_update_outcome_lines(outcome: &UpdateOutcome, style: OutputStyle) -> Vec<String> {
    match outcome {
        UpdateOutcome::NoUpdates => {
            vec![render_status_line(style, "warn", "no update archives found")]
        }
        UpdateOutcome::Cancelled => vec![render_status_line(style, "warn", "update cancelled")],
        UpdateOutcome::Installed { candidate, report } => {
            let mut lines = vec![render_status_line(
                style,
                "ok",
                &format!("installed {candidate}"),
            )];
            for entry in &report.replaced {
                let suffix = if entry.is_dir { "/" } else { "" };
                lines.push(format!("  updated {}{suffix}", entry.name));
            }
            if report.launcher_replaced {
                lines.push(render_status_line(
                    style,
                    "warn",
                    "launcher script updated; restart the environment for changes to take effect",
                ));
            }
            lines
        }
        UpdateOutcome::Failed {
            stage,
            message,
            rollback,
        } => {
            let mut lines = vec![render_status_line(
                style,
                "err",
                &format!("update failed during {stage}: {message}"),
            )];
            lines.push(match rollback {
                RollbackStatus::NotNeeded => {
                    render_status_line(style, "info", "installation was not modified")
                }
                RollbackStatus::Restored(entries) => render_status_line(
                    style,
                    "ok",
                    &format!("installation restored from backup ({} entries)", entries.len()),
                ),
                RollbackStatus::Failed(reason) => render_status_line(
                    style,
                    "err",
                    &format!("rollback failed: {reason}; backup folder left in place"),
                ),
            });
            lines
        }
    }
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

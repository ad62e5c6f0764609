use std::io::{self, BufRead, Write};
use std::path::Path;
use std::thread;

use aienv_core::{
    read_installed_version, resolve_install_root, EnvironmentConfig, InstallLayout,
    SystemProcessControl,
};
use aienv_installer::{
    apply_update, find_candidate, latest_candidate, parse_confirmation, render_candidate_lines,
    run_update_session, scan_for_updates, update_info_lines, UpdateCandidate, UpdateOutcome,
};
use aienv_registry::{
    find_preset, launch, open_in_browser, resolve_presets, ProcessRegistry, BROWSER_OPEN_DELAY,
};
use anyhow::{anyhow, bail, Context, Result};

use crate::completion::write_completions_script;
use crate::render::{
    format_preset_lines, format_process_lines, format_status_lines, format_stop_outcome_line,
    format_update_outcome_lines, TerminalRenderer,
};
use crate::{Cli, Commands, PsCommands, UpdateCommands};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let Cli {
        root,
        plain,
        command,
        ..
    } = cli;
    let renderer = TerminalRenderer::current(plain);

    match command {
        Commands::Ps { command } => {
            let (layout, _) = load_environment(root.as_deref())?;
            run_ps_command(renderer, &layout, command)
        }
        Commands::Launch { app, open } => {
            let (layout, config) = load_environment(root.as_deref())?;
            run_launch_command(renderer, &layout, &config, &app, open)
        }
        Commands::Apps => {
            let (_, config) = load_environment(root.as_deref())?;
            renderer.print_lines(&format_preset_lines(&resolve_presets(&config)));
            Ok(())
        }
        Commands::Update { command } => {
            let (layout, _) = load_environment(root.as_deref())?;
            run_update_command(renderer, &layout, command)
        }
        Commands::Completions { shell } => {
            let mut stdout = io::stdout().lock();
            write_completions_script(shell, &mut stdout)
        }
    }
}

fn load_environment(root: Option<&Path>) -> Result<(InstallLayout, EnvironmentConfig)> {
    let root = resolve_install_root(root)?;
    let base_layout = InstallLayout::new(root);
    let config = EnvironmentConfig::load(&base_layout)?;
    let layout = config.apply_to_layout(base_layout);
    tracing::debug!(
        root = %layout.root().display(),
        distribution_root = layout.distribution_root(),
        "resolved environment"
    );
    Ok((layout, config))
}

fn run_ps_command(
    renderer: TerminalRenderer,
    layout: &InstallLayout,
    command: PsCommands,
) -> Result<()> {
    let mut registry = ProcessRegistry::open(layout);
    let control = SystemProcessControl;

    match command {
        PsCommands::List => {
            let processes = registry.list();
            if processes.is_empty() {
                renderer.print_status("info", "no background processes tracked");
            } else {
                renderer.print_lines(&format_process_lines(processes));
            }
        }
        PsCommands::Status => {
            let statuses = registry.status(&control);
            if statuses.is_empty() {
                renderer.print_status("info", "no background processes tracked");
            } else {
                renderer.print_lines(&format_status_lines(&statuses, renderer.style()));
            }
        }
        PsCommands::Stop { id } => {
            let outcome = registry.stop(&control, &id)?;
            println!("{}", format_stop_outcome_line(&outcome, renderer.style()));
            if !outcome.is_success() {
                bail!("failed to stop background process '{id}'");
            }
        }
        PsCommands::StopAll => {
            let report = registry.stop_all(&control)?;
            if report.outcomes.is_empty() {
                renderer.print_status("info", "no background processes tracked");
            }
            for outcome in &report.outcomes {
                println!("{}", format_stop_outcome_line(outcome, renderer.style()));
            }
            let failed = report.failures().count();
            if failed > 0 {
                bail!("failed to stop {failed} background process(es)");
            }
        }
        PsCommands::Prune => {
            let pruned = registry.prune_dead(&control)?;
            if pruned.is_empty() {
                renderer.print_status("ok", "no dead processes to forget");
            }
            for process in pruned {
                renderer.print_status(
                    "ok",
                    &format!(
                        "forgot {} ({}, pid {})",
                        process.process_id, process.name, process.pid
                    ),
                );
            }
        }
        PsCommands::Track {
            id,
            name,
            pid,
            command,
            url,
        } => {
            let tracked = registry.track(&id, &name, pid, &command, url.as_deref())?;
            renderer.print_status(
                "ok",
                &format!(
                    "tracking {} ({}, pid {})",
                    tracked.process_id, tracked.name, tracked.pid
                ),
            );
        }
    }

    Ok(())
}

fn run_launch_command(
    renderer: TerminalRenderer,
    layout: &InstallLayout,
    config: &EnvironmentConfig,
    app: &str,
    open: bool,
) -> Result<()> {
    let presets = resolve_presets(config);
    let preset = find_preset(&presets, app)
        .ok_or_else(|| anyhow!("unknown app '{app}'; run `aienv apps` to list available apps"))?;

    let mut registry = ProcessRegistry::open(layout);
    let tracked = launch(&mut registry, layout, preset)?;
    renderer.print_status(
        "ok",
        &format!("started {} (pid {})", tracked.name, tracked.pid),
    );

    match (&tracked.url, open) {
        (Some(url), true) => {
            thread::sleep(BROWSER_OPEN_DELAY);
            if let Err(err) = open_in_browser(url) {
                renderer.print_status("warn", &format!("could not open browser: {err:#}"));
            }
        }
        (Some(url), false) => println!("  url: {url}"),
        (None, true) => {
            renderer.print_status("warn", &format!("{} has no URL to open", tracked.name));
        }
        (None, false) => {}
    }
    Ok(())
}

fn run_update_command(
    renderer: TerminalRenderer,
    layout: &InstallLayout,
    command: Option<UpdateCommands>,
) -> Result<()> {
    match command {
        None => {
            renderer.print_section("Update");
            let mut input = io::stdin().lock();
            let mut output = io::stdout();
            let outcome = run_update_session(layout, &mut input, &mut output, |candidate| {
                apply_with_spinner(renderer, layout, candidate)
            })?;
            if matches!(outcome, UpdateOutcome::NoUpdates | UpdateOutcome::Cancelled) {
                return Ok(());
            }
            report_update_outcome(renderer, &outcome)
        }
        Some(UpdateCommands::Scan) => {
            let candidates = scan_for_updates(layout)?;
            if candidates.is_empty() {
                renderer.print_status(
                    "info",
                    &format!(
                        "no update archives found in {}",
                        layout.drop_dir().display()
                    ),
                );
                return Ok(());
            }
            let installed = read_installed_version(&layout.version_manifest_path());
            renderer.print_lines(&render_candidate_lines(&candidates, installed.as_ref()));
            Ok(())
        }
        Some(UpdateCommands::Info) => {
            renderer.print_section("Update info");
            renderer.print_lines(&update_info_lines(layout));
            Ok(())
        }
        Some(UpdateCommands::Install { archive, yes }) => {
            let candidates = scan_for_updates(layout)?;
            let candidate = match archive.as_deref() {
                Some(name) => find_candidate(&candidates, name).ok_or_else(|| {
                    anyhow!(
                        "update archive '{name}' not found in {}",
                        layout.drop_dir().display()
                    )
                })?,
                None if candidates.is_empty() => {
                    return report_update_outcome(renderer, &UpdateOutcome::NoUpdates);
                }
                None => latest_candidate(&candidates).ok_or_else(|| {
                    anyhow!(
                        "no archive in {} carries a version number; choose one with --archive",
                        layout.drop_dir().display()
                    )
                })?,
            };

            if !yes && !confirm_install(candidate)? {
                return report_update_outcome(renderer, &UpdateOutcome::Cancelled);
            }
            let outcome = apply_with_spinner(renderer, layout, candidate);
            report_update_outcome(renderer, &outcome)
        }
    }
}

fn confirm_install(candidate: &UpdateCandidate) -> Result<bool> {
    print!("Install {}? (y/N): ", candidate.name);
    io::stdout()
        .flush()
        .context("failed to flush confirmation prompt")?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(parse_confirmation(&answer))
}

fn apply_with_spinner(
    renderer: TerminalRenderer,
    layout: &InstallLayout,
    candidate: &UpdateCandidate,
) -> UpdateOutcome {
    let spinner = renderer.start_spinner(&format!("installing {}", candidate.name));
    let outcome = apply_update(layout, candidate);
    spinner.finish();
    outcome
}

fn report_update_outcome(renderer: TerminalRenderer, outcome: &UpdateOutcome) -> Result<()> {
    renderer.print_lines(&format_update_outcome_lines(outcome, renderer.style()));
    if outcome.is_failure() {
        bail!("update did not complete");
    }
    Ok(())
}

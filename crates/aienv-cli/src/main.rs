use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

mod completion;
mod dispatch;
mod logging;
mod render;

use dispatch::run_cli;

#[derive(Parser, Debug)]
#[command(name = "aienv")]
#[command(about = "Portable AI development environment manager", long_about = None)]
struct Cli {
    /// Installation root; defaults to the current directory.
    #[arg(long, global = true, env = "AIENV_ROOT")]
    root: Option<PathBuf>,
    /// Disable colors, badges and progress indicators.
    #[arg(long, global = true)]
    plain: bool,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect and stop background processes started by aienv.
    Ps {
        #[command(subcommand)]
        command: PsCommands,
    },
    /// Start an application in the background and track it.
    Launch {
        app: String,
        /// Open the application's URL in a browser once it has had time to start.
        #[arg(long)]
        open: bool,
    },
    /// List launchable applications.
    Apps,
    /// Install an update archive from the drop folder.
    Update {
        #[command(subcommand)]
        command: Option<UpdateCommands>,
    },
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum PsCommands {
    List,
    /// Show tracked processes with their liveness.
    Status,
    Stop {
        id: String,
    },
    StopAll,
    /// Forget tracked processes that are no longer running.
    Prune,
    /// Record an externally started process.
    Track {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        pid: u32,
        #[arg(long)]
        command: String,
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum UpdateCommands {
    /// List archives waiting in the drop folder.
    Scan,
    /// Summarize the update facility and installed version.
    Info,
    /// Install without the interactive menu.
    Install {
        /// Archive file name; defaults to the highest versioned archive.
        #[arg(long)]
        archive: Option<String>,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    run_cli(cli)
}

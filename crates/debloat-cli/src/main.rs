#![allow(
    clippy::needless_continue,
    clippy::collapsible_if,
    clippy::uninlined_format_args,
    clippy::map_unwrap_or,
    reason = "Suppress non-critical pedantic/style lints to keep build green"
)]

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use debloat_core::plan::ActionKind;
use debloat_core::CACHE_DIR;
use fern::colors::{Color, ColoredLevelConfig};
use std::fs::OpenOptions;

mod commands;
mod device;
mod filters;
mod output;
mod repl;

use filters::{LevelFilter, StateFilter};

#[derive(Parser)]
#[command(name = "debloat")]
#[command(about = "Inspect and debloat Android devices over ADB, no root required", long_about = None)]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected Android devices
    Devices {
        /// Sort by serial instead of bridge order
        #[arg(long)]
        sorted: bool,
    },

    /// List packages on a device
    #[command(name = "list", visible_alias = "ls")]
    List {
        /// Device serial number (optional, uses first device if not specified)
        #[arg(short, long)]
        device: Option<String>,

        /// Filter by safety level
        #[arg(short, long, value_enum)]
        level: Option<LevelFilter>,

        /// Filter by enabled/disabled state
        #[arg(short, long, value_enum)]
        state: Option<StateFilter>,

        /// Filter by catalog group tag
        #[arg(short, long)]
        group: Option<String>,

        /// Search pattern (matches package name or label)
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Curated safe-to-remove view, grouped by catalog group
        #[arg(long)]
        safe: bool,
    },

    /// Preview the exact commands a batch action would run
    Preview {
        /// Action to preview
        #[arg(value_enum)]
        action: ActionArg,

        /// Package names forming the batch
        packages: Vec<String>,

        /// Device serial number (optional, uses first device if not specified)
        #[arg(short, long)]
        device: Option<String>,
    },

    /// Uninstall packages for the primary user (batch)
    #[command(visible_alias = "rm")]
    Uninstall {
        /// Package names to uninstall
        packages: Vec<String>,

        /// Device serial number (optional, uses first device if not specified)
        #[arg(short, long)]
        device: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Show the plan without running it
        #[arg(long)]
        dry_run: bool,

        /// Write a CSV report of per-package outcomes
        #[arg(long)]
        report: bool,
    },

    /// Disable packages for the primary user (batch)
    Disable {
        /// Package names to disable
        packages: Vec<String>,

        /// Device serial number (optional, uses first device if not specified)
        #[arg(short, long)]
        device: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Show the plan without running it
        #[arg(long)]
        dry_run: bool,

        /// Write a CSV report of per-package outcomes
        #[arg(long)]
        report: bool,
    },

    /// Save a named selection profile
    Backup {
        /// Profile name
        name: String,

        /// Package names to save (defaults to all safe-to-remove packages)
        packages: Vec<String>,

        /// Device serial number (optional, uses first device if not specified)
        #[arg(short, long)]
        device: Option<String>,
    },

    /// Restore a selection from a profile against the current device
    Restore {
        /// Profile name (or path to a profile file)
        name: String,

        /// Device serial number (optional, uses first device if not specified)
        #[arg(short, long)]
        device: Option<String>,
    },

    /// List saved selection profiles
    Profiles,

    /// Refresh the safety catalog from the remote repository
    Update,

    /// Generate shell completion script
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Start an interactive session (select, preview, apply)
    #[command(visible_alias = "shell")]
    Session {
        /// Device serial number (optional, uses first device if not specified)
        #[arg(short, long)]
        device: Option<String>,
    },
}

/// Batch action selector for `preview`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ActionArg {
    Uninstall,
    Disable,
}

impl From<ActionArg> for ActionKind {
    fn from(a: ActionArg) -> Self {
        match a {
            ActionArg::Uninstall => Self::Uninstall,
            ActionArg::Disable => Self::Disable,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logger().expect("setup logging");

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices { sorted } => {
            commands::list_devices(sorted)?;
        }
        Commands::List {
            device,
            level,
            state,
            group,
            search,
            safe,
        } => {
            commands::list_packages(device, level, state, group, search, safe)?;
        }
        Commands::Preview {
            action,
            packages,
            device,
        } => {
            commands::preview_action(action.into(), &packages, device)?;
        }
        Commands::Uninstall {
            packages,
            device,
            yes,
            dry_run,
            report,
        } => {
            commands::run_batch(ActionKind::Uninstall, &packages, device, yes, dry_run, report)?;
        }
        Commands::Disable {
            packages,
            device,
            yes,
            dry_run,
            report,
        } => {
            commands::run_batch(ActionKind::Disable, &packages, device, yes, dry_run, report)?;
        }
        Commands::Backup {
            name,
            packages,
            device,
        } => {
            commands::backup_selection(&name, &packages, device)?;
        }
        Commands::Restore { name, device } => {
            commands::restore_selection(&name, device)?;
        }
        Commands::Profiles => {
            commands::list_profiles();
        }
        Commands::Update => {
            commands::update_catalog()?;
        }
        Commands::Completions { shell } => {
            commands::generate_completions(shell);
        }
        Commands::Session { device } => {
            repl::session_mode(device)?;
        }
    }

    Ok(())
}

/// Log to a daily file in the cache dir and, from warn up, to stderr.
fn setup_logger() -> Result<(), fern::InitError> {
    let colors = ColoredLevelConfig::new().info(Color::Green);

    let make_formatter = |use_colors: bool| {
        move |out: fern::FormatCallback, message: &std::fmt::Arguments, record: &log::Record| {
            out.finish(format_args!(
                "{} {} [{}:{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                if use_colors {
                    format!("{:5}", colors.color(record.level()))
                } else {
                    format!("{:5}", record.level())
                },
                record.file().unwrap_or("?"),
                record.line().map(|l| l.to_string()).unwrap_or_default(),
                message
            ));
        }
    };

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(CACHE_DIR.join(format!(
            "debloat_{}.log",
            chrono::Local::now().format("%Y%m%d")
        )))?;

    let file_dispatcher = fern::Dispatch::new()
        .format(make_formatter(false))
        .level(log::LevelFilter::Warn)
        .level_for("debloat_core", log::LevelFilter::Debug)
        .level_for("debloat_cli", log::LevelFilter::Debug)
        .chain(log_file);

    let stderr_dispatcher = fern::Dispatch::new()
        .format(make_formatter(true))
        .level(log::LevelFilter::Warn)
        .chain(std::io::stderr());

    fern::Dispatch::new()
        .chain(stderr_dispatcher)
        .chain(file_dispatcher)
        .apply()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

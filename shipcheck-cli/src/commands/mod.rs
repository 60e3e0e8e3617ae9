//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod build;
mod region;
mod run;
mod wait;

pub use build::BuildCommands;
pub use run::ScenarioSelection;
pub use wait::WaitArgs;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use shipcheck_core::domain::build::BuildStatus;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run end-to-end scenarios
    Run {
        /// Scenario to run
        #[arg(long, value_enum, default_value_t = ScenarioSelection::All)]
        scenario: ScenarioSelection,
    },
    /// Wait for the build of a trigger to succeed
    Wait(WaitArgs),
    /// Build inspection
    Build {
        #[command(subcommand)]
        command: BuildCommands,
    },
    /// Print the container registry multi-region of a region
    Region {
        /// Region, e.g. europe-west1
        region: String,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run { scenario } => run::handle_run_command(scenario, config).await,
        Commands::Wait(args) => wait::handle_wait_command(args, config).await,
        Commands::Build { command } => build::handle_build_command(command, config).await,
        Commands::Region { region } => {
            region::handle_region_command(&region);
            Ok(())
        }
    }
}

/// Project given on the command line, or the first set of the harness's
/// project variables
pub(crate) fn resolve_project(project: Option<String>) -> Result<String> {
    match project.filter(|p| !p.trim().is_empty()) {
        Some(project) => Ok(project),
        None => shipcheck_harness::config::project_id_from_env(),
    }
}

/// Colorize build status for display
pub(crate) fn colorize_status(status: BuildStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        BuildStatus::Pending | BuildStatus::Queued => status_str.yellow(),
        BuildStatus::Working => status_str.cyan(),
        BuildStatus::Success => status_str.green(),
        BuildStatus::Failure | BuildStatus::InternalError | BuildStatus::Timeout => {
            status_str.red()
        }
        BuildStatus::Cancelled | BuildStatus::Expired | BuildStatus::StatusUnknown => {
            status_str.dimmed()
        }
    }
}

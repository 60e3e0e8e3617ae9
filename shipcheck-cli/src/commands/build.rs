//! Build command handlers
//!
//! Read-only views of the builds the cloud build service knows about.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use shipcheck_client::{Build, CloudBuildClient};

use super::{colorize_status, resolve_project};
use crate::config::Config;

/// Build subcommands
#[derive(Subcommand)]
pub enum BuildCommands {
    /// Get build details
    Get {
        /// Build ID
        id: String,

        /// Cloud project ID (defaults to the project variables of the harness)
        #[arg(long)]
        project: Option<String>,
    },
    /// List builds started by a trigger, most recent first
    List {
        /// Cloud project ID (defaults to the project variables of the harness)
        #[arg(long)]
        project: Option<String>,

        /// Build trigger ID
        #[arg(long)]
        trigger: String,
    },
}

/// Handle build commands
pub async fn handle_build_command(command: BuildCommands, config: &Config) -> Result<()> {
    let client = config.build_client().await?;

    match command {
        BuildCommands::Get { id, project } => {
            get_build(&client, &resolve_project(project)?, &id).await
        }
        BuildCommands::List { project, trigger } => {
            list_trigger_builds(&client, &resolve_project(project)?, &trigger).await
        }
    }
}

async fn get_build(client: &CloudBuildClient, project: &str, id: &str) -> Result<()> {
    let build = client.get_build(project, id).await?;
    print_build_details(&build);
    Ok(())
}

async fn list_trigger_builds(client: &CloudBuildClient, project: &str, trigger: &str) -> Result<()> {
    let builds = client.list_builds_for_trigger(project, trigger).await?;

    if builds.is_empty() {
        println!(
            "{}",
            format!("No builds found for trigger {}.", trigger).yellow()
        );
    } else {
        println!(
            "{}",
            format!("Found {} build(s) for trigger {}:", builds.len(), trigger).bold()
        );
        println!();
        for build in builds {
            print_build_summary(&build);
        }
    }

    Ok(())
}

/// Print a build summary
fn print_build_summary(build: &Build) {
    println!("  {} Build {}", "▸".cyan(), build.id.dimmed());
    println!("    Status:   {}", colorize_status(build.status));
    if let Some(created) = build.create_time {
        println!(
            "    Created:  {}",
            created.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    println!();
}

/// Print detailed build information
fn print_build_details(build: &Build) {
    println!("{}", "Build Details:".bold());
    println!("  ID:          {}", build.id.cyan());
    println!("  Status:      {}", colorize_status(build.status));

    if let Some(trigger) = &build.build_trigger_id {
        println!("  Trigger:     {}", trigger.dimmed());
    }

    if let Some(created) = build.create_time {
        println!("  Created:     {}", created.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(finished) = build.finish_time {
        println!("  Finished:    {}", finished.format("%Y-%m-%d %H:%M:%S"));

        if let Some(created) = build.create_time {
            let seconds = finished.signed_duration_since(created).num_seconds();
            println!("  Duration:    {}s", seconds);
        }
    }

    if let Some(url) = &build.log_url {
        println!("  Logs:        {}", url);
    }

    if !build.images.is_empty() {
        println!("\n{}", "Images:".bold());
        for image in &build.images {
            println!("  {}", image.cyan());
        }
    }
}

//! Run command handler
//!
//! Runs the selected scenarios, each in its own task. Stages within one
//! scenario stay sequential.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::*;
use shipcheck_client::BuildQuery;
use shipcheck_harness::{HarnessConfig, Scenario, ScenarioKind};
use tokio::task::JoinSet;
use tracing::error;

use crate::config::Config;

/// Which scenarios to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScenarioSelection {
    Example,
    ExampleWithMysql,
    All,
}

impl ScenarioSelection {
    pub fn kinds(&self) -> Vec<ScenarioKind> {
        match self {
            ScenarioSelection::Example => vec![ScenarioKind::Example],
            ScenarioSelection::ExampleWithMysql => vec![ScenarioKind::ExampleWithMysql],
            ScenarioSelection::All => ScenarioKind::ALL.to_vec(),
        }
    }
}

pub async fn handle_run_command(selection: ScenarioSelection, config: &Config) -> Result<()> {
    let mut harness = HarnessConfig::from_env().context("Failed to load harness configuration")?;
    harness.build_api_url = config.build_api_url.clone();
    harness.validate()?;
    let harness = Arc::new(harness);

    let builds: Arc<dyn BuildQuery> = Arc::new(config.build_client().await?);

    let mut tasks = JoinSet::new();
    for kind in selection.kinds() {
        let scenario = Scenario::new(kind, harness.clone(), builds.clone());
        tasks.spawn(async move { (scenario.kind(), scenario.run().await) });
    }

    let mut failed = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((kind, Ok(()))) => println!("{} {}", "✓".green(), kind.to_string().bold()),
            Ok((kind, Err(e))) => {
                failed += 1;
                println!("{} {}: {:#}", "✗".red(), kind.to_string().bold(), e);
            }
            Err(e) => {
                failed += 1;
                error!("Scenario task panicked: {}", e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} scenario(s) failed", failed);
    }
    Ok(())
}

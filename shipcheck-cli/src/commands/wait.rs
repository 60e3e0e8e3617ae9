//! Wait command handler
//!
//! Runs the build poller on its own, against a trigger that was fired by
//! some other means.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use colored::*;
use shipcheck_harness::config::{
    DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL, DEFAULT_QUERY_TIMEOUT,
};
use shipcheck_harness::{BuildPoller, FailurePolicy, PollPolicy};

use super::resolve_project;
use crate::config::Config;

#[derive(Debug, Args)]
pub struct WaitArgs {
    /// Cloud project ID (defaults to the first of GOOGLE_CLOUD_PROJECT,
    /// GOOGLE_CLOUD_PROJECT_ID, GCLOUD_PROJECT, CLOUDSDK_CORE_PROJECT)
    #[arg(long)]
    pub project: Option<String>,

    /// Build trigger ID
    #[arg(long)]
    pub trigger: String,

    /// Maximum number of status checks
    #[arg(long, env = "SHIPCHECK_POLL_ATTEMPTS", default_value_t = DEFAULT_POLL_ATTEMPTS)]
    pub attempts: u32,

    /// Seconds between two status checks
    #[arg(long, env = "SHIPCHECK_POLL_INTERVAL", default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    pub interval_secs: u64,

    /// Seconds one status check may take before it counts as failed
    #[arg(long, env = "SHIPCHECK_QUERY_TIMEOUT", default_value_t = DEFAULT_QUERY_TIMEOUT.as_secs())]
    pub query_timeout_secs: u64,

    /// Reaction to a failed build: retry or fail-fast
    #[arg(long, env = "SHIPCHECK_FAILURE_POLICY", default_value = "retry")]
    pub failure_policy: FailurePolicy,

    /// Shorthand for --failure-policy fail-fast
    #[arg(long)]
    pub fail_fast: bool,
}

impl WaitArgs {
    fn policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.attempts,
            interval: Duration::from_secs(self.interval_secs),
            query_timeout: Duration::from_secs(self.query_timeout_secs),
            on_failure: if self.fail_fast {
                FailurePolicy::FailFast
            } else {
                self.failure_policy
            },
        }
    }
}

pub async fn handle_wait_command(args: WaitArgs, config: &Config) -> Result<()> {
    if args.attempts == 0 {
        anyhow::bail!("--attempts must be greater than 0");
    }
    if args.query_timeout_secs == 0 {
        anyhow::bail!("--query-timeout-secs must be greater than 0");
    }

    let project = resolve_project(args.project.clone())?;
    let client = config.build_client().await?;
    let poller = BuildPoller::new(Arc::new(client), args.policy());

    println!(
        "{}",
        format!(
            "Waiting up to {:?} for trigger {}...",
            poller.policy().budget(),
            args.trigger
        )
        .dimmed()
    );

    let build_id = poller
        .await_successful_build(&project, &args.trigger)
        .await?;

    println!("{} Build {} succeeded", "✓".green(), build_id.cyan());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        wait: WaitArgs,
    }

    fn parse(args: &[&str]) -> WaitArgs {
        TestCli::try_parse_from(std::iter::once("wait").chain(args.iter().copied()))
            .unwrap()
            .wait
    }

    #[test]
    fn test_policy_from_args() {
        let policy = parse(&[
            "--trigger",
            "t",
            "--attempts",
            "3",
            "--interval-secs",
            "5",
            "--query-timeout-secs",
            "2",
            "--fail-fast",
        ])
        .policy();

        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.query_timeout, Duration::from_secs(2));
        assert_eq!(policy.on_failure, FailurePolicy::FailFast);
        assert_eq!(policy.budget(), Duration::from_secs(10 + 6));
    }

    #[test]
    fn test_failure_policy_option() {
        let args = parse(&["--trigger", "t", "--failure-policy", "fail-fast"]);
        assert_eq!(args.policy().on_failure, FailurePolicy::FailFast);
        assert!(args.project.is_none());
    }

    #[test]
    fn test_huge_interval_does_not_overflow() {
        let args = parse(&[
            "--trigger",
            "t",
            "--attempts",
            "3",
            "--interval-secs",
            "18446744073709551615",
        ]);
        assert_eq!(args.policy().budget(), Duration::MAX);
    }
}

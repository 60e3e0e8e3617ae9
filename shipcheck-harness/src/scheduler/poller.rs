//! Build poller
//!
//! Waits for the build started by a trigger to succeed. Every attempt lists
//! the trigger's builds, picks the first one (the build API returns the most
//! recent first) and re-reads it by ID. Anything short of success is retried
//! after a fixed delay until the attempt budget is used up.

use std::sync::Arc;
use std::time::Duration;

use shipcheck_client::BuildQuery;
use shipcheck_core::domain::build::{BuildPhase, BuildStatus};
use thiserror::Error;
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::{FailurePolicy, HarnessConfig};

/// Errors that end a wait
#[derive(Debug, Error)]
pub enum PollError {
    /// The attempt budget ran out without observing a successful build
    #[error(
        "build for trigger {trigger_id} did not succeed after {attempts} attempt(s): {last_reason}"
    )]
    Exhausted {
        trigger_id: String,
        attempts: u32,
        last_reason: String,
    },

    /// A build failed while [`FailurePolicy::FailFast`] was selected
    #[error("build {build_id} finished with status {status}")]
    BuildFailed {
        build_id: String,
        status: BuildStatus,
    },
}

/// Attempt budget and pacing of a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    /// Longest a single attempt may wait for the build service
    pub query_timeout: Duration,
    pub on_failure: FailurePolicy,
}

impl PollPolicy {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            max_attempts: config.poll_attempts,
            interval: config.poll_interval,
            query_timeout: config.query_timeout,
            on_failure: config.failure_policy,
        }
    }

    /// Longest time a wait can take
    ///
    /// Every attempt may use its full query timeout; saturates at
    /// [`Duration::MAX`].
    pub fn budget(&self) -> Duration {
        let sleeps = self
            .interval
            .checked_mul(self.max_attempts.saturating_sub(1));
        let queries = self.query_timeout.checked_mul(self.max_attempts);
        sleeps
            .zip(queries)
            .and_then(|(sleeps, queries)| sleeps.checked_add(queries))
            .unwrap_or(Duration::MAX)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&HarnessConfig::default())
    }
}

/// Result of one status check
#[derive(Debug, Clone, PartialEq, Eq)]
enum Check {
    NotTriggered,
    Queued { build_id: String },
    Working { build_id: String },
    NotSuccessful { build_id: String, status: BuildStatus },
    QueryFailed(String),
    Succeeded { build_id: String },
}

impl Check {
    fn reason(&self) -> String {
        match self {
            Check::NotTriggered => "build hasn't been triggered".to_string(),
            Check::Queued { build_id } => format!("build {build_id} is queued"),
            Check::Working { build_id } => format!("build {build_id} is executing"),
            Check::NotSuccessful { build_id, status } => {
                format!("build {build_id} is not successful ({status})")
            }
            Check::QueryFailed(e) => format!("build query failed: {e}"),
            Check::Succeeded { build_id } => format!("build {build_id} succeeded"),
        }
    }
}

/// Polls the build service until a trigger's build succeeds
pub struct BuildPoller {
    builds: Arc<dyn BuildQuery>,
    policy: PollPolicy,
}

impl BuildPoller {
    pub fn new(builds: Arc<dyn BuildQuery>, policy: PollPolicy) -> Self {
        Self { builds, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Waits for the most recent build of `trigger_id` to succeed
    ///
    /// Returns the ID of the successful build. Fails with
    /// [`PollError::Exhausted`] once `max_attempts` checks have been made
    /// without seeing success.
    pub async fn await_successful_build(
        &self,
        project_id: &str,
        trigger_id: &str,
    ) -> Result<String, PollError> {
        info!(
            "Waiting for build of trigger {} to complete (max {} attempts, every {:?})",
            trigger_id, self.policy.max_attempts, self.policy.interval
        );

        let mut last_reason = String::from("no attempt made");

        for attempt in 1..=self.policy.max_attempts {
            let check = match time::timeout(
                self.policy.query_timeout,
                self.check_once(project_id, trigger_id),
            )
            .await
            {
                Ok(check) => check,
                Err(_) => {
                    warn!(
                        "Build service did not answer within {:?} for trigger {}",
                        self.policy.query_timeout, trigger_id
                    );
                    Check::QueryFailed(format!(
                        "no answer within {:?}",
                        self.policy.query_timeout
                    ))
                }
            };

            match check {
                Check::Succeeded { build_id } => {
                    info!("Build {} was successful (attempt {})", build_id, attempt);
                    return Ok(build_id);
                }
                Check::NotSuccessful { build_id, status }
                    if self.policy.on_failure == FailurePolicy::FailFast && status.is_failure() =>
                {
                    warn!("Build {} finished with status {}", build_id, status);
                    return Err(PollError::BuildFailed { build_id, status });
                }
                other => {
                    let reason = other.reason();
                    if reason != last_reason {
                        info!("{}", reason);
                    }
                    debug!(
                        "Attempt {}/{}: {}",
                        attempt, self.policy.max_attempts, reason
                    );
                    last_reason = reason;
                }
            }

            if attempt < self.policy.max_attempts {
                time::sleep(self.policy.interval).await;
            }
        }

        warn!(
            "Gave up waiting for build of trigger {} after {} attempt(s)",
            trigger_id, self.policy.max_attempts
        );

        Err(PollError::Exhausted {
            trigger_id: trigger_id.to_string(),
            attempts: self.policy.max_attempts,
            last_reason,
        })
    }

    /// Performs a single status check
    async fn check_once(&self, project_id: &str, trigger_id: &str) -> Check {
        let builds = match self
            .builds
            .list_builds_for_trigger(project_id, trigger_id)
            .await
        {
            Ok(builds) => builds,
            Err(e) => {
                warn!("Failed to list builds for trigger {}: {}", trigger_id, e);
                return Check::QueryFailed(e.to_string());
            }
        };

        // Assume the first build returned is the one we triggered
        let Some(latest) = builds.first() else {
            return Check::NotTriggered;
        };

        let build = match self.builds.get_build(project_id, &latest.id).await {
            Ok(build) => build,
            Err(e) => {
                warn!("Failed to get build {}: {}", latest.id, e);
                return Check::QueryFailed(e.to_string());
            }
        };

        let build_id = build.id;
        match build.status.phase() {
            BuildPhase::Queued => Check::Queued { build_id },
            BuildPhase::Working => Check::Working { build_id },
            BuildPhase::Succeeded => Check::Succeeded { build_id },
            BuildPhase::Other => Check::NotSuccessful {
                build_id,
                status: build.status,
            },
        }
    }
}

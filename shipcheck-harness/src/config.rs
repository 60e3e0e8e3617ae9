//! Harness configuration
//!
//! Defines all configurable parameters for a harness run including the
//! sample application source, Terraform module location, build polling
//! policy and region selection.

use std::path::PathBuf;
use std::time::Duration;

/// Sample application cloned and pushed to fire the build trigger
pub const DEFAULT_SAMPLE_REPO_URL: &str = "https://github.com/robmorgan/sample-node-app.git";

/// Branch checked out and pushed to
pub const DEFAULT_SAMPLE_REPO_BRANCH: &str = "main";

/// Folder name the sample app is cloned into
pub const DEFAULT_SAMPLE_REPO_NAME: &str = "sample-app-docker";

/// Maximum number of build status checks
pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;

/// Fixed delay between two build status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Longest a single status check may wait for the build service
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(20);

/// Regions where the serverless run platform is available
pub const DEFAULT_ALLOWED_REGIONS: &[&str] =
    &["asia-northeast1", "europe-west1", "us-central1", "us-east1"];

/// Environment variables checked, in order, for the cloud project ID
pub const PROJECT_ENV_VARS: &[&str] = &[
    "GOOGLE_CLOUD_PROJECT",
    "GOOGLE_CLOUD_PROJECT_ID",
    "GCLOUD_PROJECT",
    "CLOUDSDK_CORE_PROJECT",
];

/// What the poller does when the build reaches a terminal failure status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Keep polling until the attempt budget runs out
    #[default]
    Retry,
    /// Abort as soon as a failed build is observed
    FailFast,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "retry" => Ok(FailurePolicy::Retry),
            "fail-fast" | "fail_fast" | "failfast" => Ok(FailurePolicy::FailFast),
            _ => Err(format!("Unknown failure policy: {s}")),
        }
    }
}

/// Harness configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Git URL of the sample application
    pub sample_repo_url: String,

    /// Branch cloned and pushed
    pub sample_repo_branch: String,

    /// Folder name used for the clone
    pub sample_repo_name: String,

    /// Name of the git remote pointing at the provisioned source repository
    pub git_remote_name: String,

    /// Folder holding the Terraform configuration under test
    pub module_dir: PathBuf,

    /// Root under which each scenario keeps its stage state
    pub work_root: PathBuf,

    /// Base URL of the build API
    pub build_api_url: String,

    /// How many times the build status is checked before giving up
    pub poll_attempts: u32,

    /// Delay between two status checks
    pub poll_interval: Duration,

    /// Time allowed for one status check before it counts as failed
    pub query_timeout: Duration,

    /// Reaction to a failed build
    pub failure_policy: FailurePolicy,

    /// Regions a run may be deployed to
    pub allowed_regions: Vec<String>,

    /// Regions never picked, even if allowed
    pub forbidden_regions: Vec<String>,
}

impl HarnessConfig {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            sample_repo_url: DEFAULT_SAMPLE_REPO_URL.to_string(),
            sample_repo_branch: DEFAULT_SAMPLE_REPO_BRANCH.to_string(),
            sample_repo_name: DEFAULT_SAMPLE_REPO_NAME.to_string(),
            git_remote_name: "google".to_string(),
            module_dir: PathBuf::from(".."),
            work_root: PathBuf::from("stages"),
            build_api_url: shipcheck_client::DEFAULT_BASE_URL.to_string(),
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            failure_policy: FailurePolicy::Retry,
            allowed_regions: DEFAULT_ALLOWED_REGIONS
                .iter()
                .map(|r| r.to_string())
                .collect(),
            forbidden_regions: Vec::new(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Every variable is optional and falls back to the default:
    /// - SHIPCHECK_SAMPLE_REPO_URL
    /// - SHIPCHECK_SAMPLE_REPO_BRANCH
    /// - SHIPCHECK_MODULE_DIR
    /// - SHIPCHECK_WORK_ROOT
    /// - SHIPCHECK_BUILD_API_URL
    /// - SHIPCHECK_POLL_ATTEMPTS (default: 30)
    /// - SHIPCHECK_POLL_INTERVAL (seconds, default: 20)
    /// - SHIPCHECK_QUERY_TIMEOUT (seconds, default: 20)
    /// - SHIPCHECK_FAILURE_POLICY (retry | fail-fast, default: retry)
    /// - SHIPCHECK_ALLOWED_REGIONS (comma separated)
    /// - SHIPCHECK_FORBIDDEN_REGIONS (comma separated)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Same as [`HarnessConfig::from_env`] over an explicit set of variables
    pub fn from_vars<I, K, V>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: std::collections::HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |key: &str| vars.get(key).filter(|v| !v.trim().is_empty()).cloned();

        let mut config = Self::new();

        if let Some(url) = get("SHIPCHECK_SAMPLE_REPO_URL") {
            config.sample_repo_url = url;
        }
        if let Some(branch) = get("SHIPCHECK_SAMPLE_REPO_BRANCH") {
            config.sample_repo_branch = branch;
        }
        if let Some(dir) = get("SHIPCHECK_MODULE_DIR") {
            config.module_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("SHIPCHECK_WORK_ROOT") {
            config.work_root = PathBuf::from(dir);
        }
        if let Some(url) = get("SHIPCHECK_BUILD_API_URL") {
            config.build_api_url = url;
        }
        if let Some(attempts) = get("SHIPCHECK_POLL_ATTEMPTS") {
            config.poll_attempts = attempts
                .parse()
                .map_err(|_| anyhow::anyhow!("SHIPCHECK_POLL_ATTEMPTS must be a number"))?;
        }
        if let Some(secs) = get("SHIPCHECK_POLL_INTERVAL") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| anyhow::anyhow!("SHIPCHECK_POLL_INTERVAL must be a number"))?;
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = get("SHIPCHECK_QUERY_TIMEOUT") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| anyhow::anyhow!("SHIPCHECK_QUERY_TIMEOUT must be a number"))?;
            config.query_timeout = Duration::from_secs(secs);
        }
        if let Some(policy) = get("SHIPCHECK_FAILURE_POLICY") {
            config.failure_policy = policy.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }
        if let Some(regions) = get("SHIPCHECK_ALLOWED_REGIONS") {
            config.allowed_regions = split_list(&regions);
        }
        if let Some(regions) = get("SHIPCHECK_FORBIDDEN_REGIONS") {
            config.forbidden_regions = split_list(&regions);
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sample_repo_url.is_empty() {
            anyhow::bail!("sample_repo_url cannot be empty");
        }

        if self.sample_repo_branch.is_empty() {
            anyhow::bail!("sample_repo_branch cannot be empty");
        }

        if !self.build_api_url.starts_with("http://") && !self.build_api_url.starts_with("https://")
        {
            anyhow::bail!("build_api_url must start with http:// or https://");
        }

        if self.poll_attempts == 0 {
            anyhow::bail!("poll_attempts must be greater than 0");
        }

        if self.query_timeout.is_zero() {
            anyhow::bail!("query_timeout must be greater than 0");
        }

        if self.allowed_regions.is_empty() {
            anyhow::bail!("allowed_regions cannot be empty");
        }

        if self
            .allowed_regions
            .iter()
            .all(|r| self.forbidden_regions.contains(r))
        {
            anyhow::bail!("every allowed region is also forbidden");
        }

        Ok(())
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the cloud project ID from the first set variable of [`PROJECT_ENV_VARS`]
pub fn project_id_from_env() -> anyhow::Result<String> {
    project_id_from_vars(std::env::vars())
}

/// Same as [`project_id_from_env`] over an explicit set of variables
pub fn project_id_from_vars<I, K, V>(vars: I) -> anyhow::Result<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let vars: std::collections::HashMap<String, String> = vars
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    PROJECT_ENV_VARS
        .iter()
        .find_map(|name| vars.get(*name).filter(|v| !v.trim().is_empty()).cloned())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "cloud project ID not set; export one of {}",
                PROJECT_ENV_VARS.join(", ")
            )
        })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

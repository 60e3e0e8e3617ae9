//! Scenario pipeline
//!
//! A [`Scenario`] drives one end-to-end run of the example: clone the sample
//! app, copy and apply the Terraform module, push a commit to fire the build
//! trigger, wait for the build and tear everything down again.
//!
//! Stages run strictly in order and stop at the first failure. Cleanup runs
//! afterwards in every case and only acts on what earlier stages stored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde_json::json;
use shipcheck_client::BuildQuery;
use tracing::{info, warn};

use crate::config::{HarnessConfig, project_id_from_env};
use crate::region::{lookup_multi_region, pick_random_region, unique_id};
use crate::scheduler::{BuildPoller, PollPolicy};
use crate::stage::{Stage, StageGate, StageStore};
use crate::tools::terraform::{self, TerraformOptions};
use crate::tools::{gcloud, git};
use crate::workspace::copy_terraform_folder_to_temp;

/// File rewritten on every run so there is always something to commit
const MARKER_FILE: &str = "auto-committed.txt";
const COMMIT_MESSAGE: &str = "triggering a build";
const TRIGGER_OUTPUT: &str = "trigger_id";

// Stage store keys
const KEY_REPO_PATH: &str = "repoPath";
const KEY_MODULE_PATH: &str = "exampleTerraformModulePath";
const KEY_UNIQUE_ID: &str = "uniqueID";
const KEY_PROJECT: &str = "project";
const KEY_REGION: &str = "region";
const KEY_BUILD_ID: &str = "buildID";

/// Variable set a scenario deploys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioKind {
    /// The app alone
    Example,
    /// The app backed by a MySQL instance
    ExampleWithMysql,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 2] = [ScenarioKind::Example, ScenarioKind::ExampleWithMysql];

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::Example => "example",
            ScenarioKind::ExampleWithMysql => "example-with-mysql",
        }
    }

    fn deploys_db(&self) -> bool {
        matches!(self, ScenarioKind::ExampleWithMysql)
    }
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Terraform variables for one run of `kind`
pub fn terraform_options(
    kind: ScenarioKind,
    unique_id: &str,
    project: &str,
    region: &str,
    module_path: &Path,
) -> TerraformOptions {
    let mut vars = BTreeMap::new();
    vars.insert("location".to_string(), json!(region));
    vars.insert("project".to_string(), json!(project));
    vars.insert("gcr_region".to_string(), json!(lookup_multi_region(region)));
    vars.insert(
        "repository_name".to_string(),
        json!(format!("sample-docker-app-{unique_id}").to_lowercase()),
    );
    vars.insert(
        "service_name".to_string(),
        json!(format!("sample-docker-service-{unique_id}").to_lowercase()),
    );
    if kind.deploys_db() {
        vars.insert("deploy_db".to_string(), json!(true));
    }

    TerraformOptions::new(module_path, vars)
}

/// One end-to-end run
pub struct Scenario {
    kind: ScenarioKind,
    config: Arc<HarnessConfig>,
    store: StageStore,
    gate: StageGate,
    builds: Arc<dyn BuildQuery>,
}

impl Scenario {
    /// Creates a scenario whose state lives in `<work_root>/<scenario name>`
    ///
    /// Skip switches are read from the process environment.
    pub fn new(kind: ScenarioKind, config: Arc<HarnessConfig>, builds: Arc<dyn BuildQuery>) -> Self {
        let store = StageStore::new(config.work_root.join(kind.name()));
        Self {
            kind,
            config,
            store,
            gate: StageGate::from_env(),
            builds,
        }
    }

    pub fn with_gate(mut self, gate: StageGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn kind(&self) -> ScenarioKind {
        self.kind
    }

    pub fn store(&self) -> &StageStore {
        &self.store
    }

    /// Runs every stage, then cleanup
    ///
    /// A pipeline failure is returned even if cleanup succeeds; a cleanup
    /// failure is attached to it as context.
    pub async fn run(&self) -> Result<()> {
        info!("[{}] Starting scenario", self.kind);
        let started = Instant::now();

        let outcome = self.run_pipeline().await;
        let cleanup = self.run_stage(Stage::Cleanup).await;

        let result = match (outcome, cleanup) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(c)) => Err(c),
            (Err(e), Err(c)) => Err(e.context(format!("cleanup also failed: {c:#}"))),
        };

        match &result {
            Ok(()) => info!("[{}] Scenario passed in {:?}", self.kind, started.elapsed()),
            Err(e) => warn!("[{}] Scenario failed: {:#}", self.kind, e),
        }
        result
    }

    async fn run_pipeline(&self) -> Result<()> {
        for stage in Stage::PIPELINE {
            self.run_stage(stage).await?;
        }
        Ok(())
    }

    async fn run_stage(&self, stage: Stage) -> Result<()> {
        if !self.gate.should_run(stage) {
            info!(
                "[{}] Skipping stage {} ({} is set)",
                self.kind,
                stage,
                stage.skip_var()
            );
            return Ok(());
        }

        info!("[{}] Running stage {}", self.kind, stage);
        let started = Instant::now();

        let result = match stage {
            Stage::CloneSampleApp => self.clone_sample_app().await,
            Stage::CreateTestCopyOfExamples => self.create_test_copy_of_examples(),
            Stage::CreateTerratestOptions => self.create_terratest_options(),
            Stage::TerraformApply => self.terraform_apply().await,
            Stage::TriggerBuild => self.trigger_build().await,
            Stage::WaitForBuild => self.wait_for_build().await,
            Stage::Cleanup => self.cleanup().await,
        };
        result.with_context(|| format!("stage {stage} failed"))?;

        info!(
            "[{}] Stage {} finished in {:?}",
            self.kind,
            stage,
            started.elapsed()
        );
        Ok(())
    }

    async fn clone_sample_app(&self) -> Result<()> {
        let tmp = tempfile::Builder::new()
            .prefix("sample-app-")
            .tempdir()
            .context("creating temp folder for the sample app")?
            .keep();
        let dest = tmp.join(&self.config.sample_repo_name);

        git::clone(
            &self.config.sample_repo_url,
            &self.config.sample_repo_branch,
            &dest,
        )
        .await?;

        self.store
            .save_string(KEY_REPO_PATH, &dest.to_string_lossy())?;
        Ok(())
    }

    fn create_test_copy_of_examples(&self) -> Result<()> {
        let path = copy_terraform_folder_to_temp(&self.config.module_dir, self.kind.name())?;
        self.store
            .save_string(KEY_MODULE_PATH, &path.to_string_lossy())?;
        Ok(())
    }

    fn create_terratest_options(&self) -> Result<()> {
        let module_path = PathBuf::from(self.store.load_string(KEY_MODULE_PATH)?);
        let id = unique_id();
        let project = project_id_from_env()?;
        let region = pick_random_region(
            &self.config.allowed_regions,
            &self.config.forbidden_regions,
            &mut rand::thread_rng(),
        )
        .context("no allowed region left after removing forbidden regions")?;

        info!(
            "[{}] Run {} deploys to {} in project {}",
            self.kind, id, region, project
        );
        let options = terraform_options(self.kind, &id, &project, &region, &module_path);

        self.store.save_string(KEY_UNIQUE_ID, &id)?;
        self.store.save_string(KEY_PROJECT, &project)?;
        self.store.save_string(KEY_REGION, &region)?;
        self.store.save_terraform_options(&options)?;
        Ok(())
    }

    async fn terraform_apply(&self) -> Result<()> {
        let options = self.store.load_terraform_options()?;
        terraform::init_and_apply(&options).await
    }

    async fn trigger_build(&self) -> Result<()> {
        let options = self.store.load_terraform_options()?;
        let project = self.store.load_string(KEY_PROJECT)?;
        let repo_path = PathBuf::from(self.store.load_string(KEY_REPO_PATH)?);
        let repo_name = options
            .var_str("repository_name")
            .context("Terraform options have no repository_name")?;

        let remote = &self.config.git_remote_name;
        git::ensure_remote(&repo_path, remote, &git::source_repo_url(&project, repo_name)).await?;

        let marker = git::write_marker_file(&repo_path, MARKER_FILE)?;
        git::add_commit_push(
            &repo_path,
            &marker,
            COMMIT_MESSAGE,
            remote,
            &self.config.sample_repo_branch,
        )
        .await
    }

    async fn wait_for_build(&self) -> Result<()> {
        // A build ID from an earlier run must not reach cleanup if this wait fails
        self.store.remove(KEY_BUILD_ID)?;

        let options = self.store.load_terraform_options()?;
        let project = self.store.load_string(KEY_PROJECT)?;
        let trigger_id = terraform::output(&options, TRIGGER_OUTPUT).await?;

        let poller = BuildPoller::new(self.builds.clone(), PollPolicy::from_config(&self.config));
        let build_id = poller.await_successful_build(&project, &trigger_id).await?;

        self.store.save_string(KEY_BUILD_ID, &build_id)?;
        Ok(())
    }

    async fn cleanup(&self) -> Result<()> {
        let project: Option<String> = self.store.try_load(KEY_PROJECT)?;
        let build_id: Option<String> = self.store.try_load(KEY_BUILD_ID)?;

        let mut failed_images = 0;
        match (project, build_id) {
            (Some(project), Some(build_id)) => match self.builds.get_build(&project, &build_id).await {
                Ok(build) => {
                    info!(
                        "[{}] Deleting {} image(s) of build {}",
                        self.kind,
                        build.images.len(),
                        build.id
                    );
                    failed_images = gcloud::delete_images(&build.images).await;
                }
                Err(e) if e.is_not_found() => info!(
                    "[{}] Build {} no longer exists, no images to delete",
                    self.kind, build_id
                ),
                Err(e) => warn!(
                    "[{}] Could not fetch build {}, images are left behind: {}",
                    self.kind, build_id, e
                ),
            },
            _ => warn!(
                "[{}] No build recorded, skipping image deletion",
                self.kind
            ),
        }

        match self.store.try_load_terraform_options()? {
            Some(options) => terraform::destroy(&options).await?,
            None => warn!(
                "[{}] No Terraform options recorded, skipping destroy",
                self.kind
            ),
        }

        if failed_images > 0 {
            anyhow::bail!("{} image(s) could not be deleted", failed_images);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shipcheck_client::{Build, ClientError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Answers every lookup with an image-less build and counts the calls
    #[derive(Default)]
    struct RecordingBuilds {
        gets: AtomicUsize,
    }

    #[async_trait]
    impl BuildQuery for RecordingBuilds {
        async fn list_builds_for_trigger(
            &self,
            _project_id: &str,
            _trigger_id: &str,
        ) -> shipcheck_client::Result<Vec<Build>> {
            Ok(Vec::new())
        }

        async fn get_build(&self, _project_id: &str, build_id: &str) -> shipcheck_client::Result<Build> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if build_id == "gone" {
                return Err(ClientError::api_error(404, "not found"));
            }
            Ok(Build {
                id: build_id.to_string(),
                ..Default::default()
            })
        }
    }

    fn gate_skipping(stages: &[Stage]) -> StageGate {
        stages
            .iter()
            .fold(StageGate::default(), |gate, stage| gate.skip(*stage))
    }

    fn scenario(dir: &TempDir, builds: Arc<RecordingBuilds>, gate: StageGate) -> Scenario {
        let config = HarnessConfig {
            work_root: dir.path().to_path_buf(),
            ..Default::default()
        };
        Scenario::new(ScenarioKind::Example, Arc::new(config), builds).with_gate(gate)
    }

    #[test]
    fn test_example_options() {
        let options = terraform_options(
            ScenarioKind::Example,
            "AbC123",
            "my-project",
            "europe-west1",
            Path::new("/tmp/example"),
        );

        assert_eq!(options.terraform_dir, PathBuf::from("/tmp/example"));
        assert_eq!(options.var_str("location"), Some("europe-west1"));
        assert_eq!(options.var_str("project"), Some("my-project"));
        assert_eq!(options.var_str("gcr_region"), Some("eu"));
        assert_eq!(options.var_str("repository_name"), Some("sample-docker-app-abc123"));
        assert_eq!(options.var_str("service_name"), Some("sample-docker-service-abc123"));
        assert!(!options.vars.contains_key("deploy_db"));
    }

    #[test]
    fn test_mysql_options_deploy_db() {
        let options = terraform_options(
            ScenarioKind::ExampleWithMysql,
            "x1",
            "p",
            "us-east1",
            Path::new("m"),
        );
        assert_eq!(options.vars.get("deploy_db"), Some(&json!(true)));
        assert_eq!(options.var_str("gcr_region"), Some("us"));
    }

    #[test]
    fn test_scenario_kind_names() {
        assert_eq!(ScenarioKind::Example.to_string(), "example");
        assert_eq!(ScenarioKind::ExampleWithMysql.name(), "example-with-mysql");
    }

    #[test]
    fn test_store_is_scoped_per_scenario() {
        let dir = TempDir::new().unwrap();
        let scenario = scenario(&dir, Arc::default(), StageGate::default());
        assert_eq!(scenario.store().working_dir(), dir.path().join("example"));
    }

    #[tokio::test]
    async fn test_cleanup_with_nothing_recorded() {
        let dir = TempDir::new().unwrap();
        let builds = Arc::new(RecordingBuilds::default());
        let scenario = scenario(&dir, builds.clone(), gate_skipping(&Stage::PIPELINE));

        scenario.run().await.unwrap();
        assert_eq!(builds.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cleanup_fetches_recorded_build() {
        let dir = TempDir::new().unwrap();
        let builds = Arc::new(RecordingBuilds::default());
        let scenario = scenario(&dir, builds.clone(), gate_skipping(&Stage::PIPELINE));
        scenario.store().save_string(KEY_PROJECT, "p").unwrap();
        scenario.store().save_string(KEY_BUILD_ID, "b-1").unwrap();

        scenario.run().await.unwrap();
        assert_eq!(builds.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_unknown_build() {
        let dir = TempDir::new().unwrap();
        let builds = Arc::new(RecordingBuilds::default());
        let scenario = scenario(&dir, builds.clone(), gate_skipping(&Stage::PIPELINE));
        scenario.store().save_string(KEY_PROJECT, "p").unwrap();
        scenario.store().save_string(KEY_BUILD_ID, "gone").unwrap();

        scenario.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_stage_still_runs_cleanup() {
        let dir = TempDir::new().unwrap();
        let builds = Arc::new(RecordingBuilds::default());
        // Only create_terratest_options runs, without the module path it needs
        let gate = gate_skipping(&[
            Stage::CloneSampleApp,
            Stage::CreateTestCopyOfExamples,
            Stage::TerraformApply,
            Stage::TriggerBuild,
            Stage::WaitForBuild,
        ]);
        let scenario = scenario(&dir, builds.clone(), gate);
        scenario.store().save_string(KEY_PROJECT, "p").unwrap();
        scenario.store().save_string(KEY_BUILD_ID, "b-1").unwrap();

        let err = scenario.run().await.unwrap_err();
        assert!(format!("{err:#}").contains("create_terratest_options"));
        assert!(format!("{err:#}").contains(KEY_MODULE_PATH));
        assert_eq!(builds.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_skipped_cleanup_does_nothing() {
        let dir = TempDir::new().unwrap();
        let builds = Arc::new(RecordingBuilds::default());
        let mut stages = Stage::PIPELINE.to_vec();
        stages.push(Stage::Cleanup);
        let scenario = scenario(&dir, builds.clone(), gate_skipping(&stages));
        scenario.store().save_string(KEY_PROJECT, "p").unwrap();
        scenario.store().save_string(KEY_BUILD_ID, "b-1").unwrap();

        scenario.run().await.unwrap();
        assert_eq!(builds.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_wait_forgets_previous_build() {
        let dir = TempDir::new().unwrap();
        let builds = Arc::new(RecordingBuilds::default());
        // wait_for_build runs without Terraform options and fails
        let gate = gate_skipping(&[
            Stage::CloneSampleApp,
            Stage::CreateTestCopyOfExamples,
            Stage::CreateTerratestOptions,
            Stage::TerraformApply,
            Stage::TriggerBuild,
        ]);
        let scenario = scenario(&dir, builds.clone(), gate);
        scenario.store().save_string(KEY_PROJECT, "p").unwrap();
        scenario.store().save_string(KEY_BUILD_ID, "stale").unwrap();

        let err = scenario.run().await.unwrap_err();
        assert!(format!("{err:#}").contains("wait_for_build"));
        assert_eq!(builds.gets.load(Ordering::SeqCst), 0);
        assert!(
            scenario
                .store()
                .try_load::<String>(KEY_BUILD_ID)
                .unwrap()
                .is_none()
        );
    }
}

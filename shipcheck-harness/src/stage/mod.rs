//! Scenario stages
//!
//! A scenario is a fixed sequence of named stages. Each stage can be skipped
//! by exporting `SKIP_<stage name>` with any non-empty value, which makes it
//! possible to re-run one phase (e.g. `wait_for_build`) against resources
//! left over from a previous run. Values flow between stages through a
//! [`StageStore`].

mod store;

pub use store::{StageStore, StoreError};

use std::collections::HashSet;

/// One phase of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    CloneSampleApp,
    CreateTestCopyOfExamples,
    CreateTerratestOptions,
    TerraformApply,
    TriggerBuild,
    WaitForBuild,
    Cleanup,
}

impl Stage {
    /// Stages run in order until one fails; `Cleanup` always follows.
    pub const PIPELINE: [Stage; 6] = [
        Stage::CloneSampleApp,
        Stage::CreateTestCopyOfExamples,
        Stage::CreateTerratestOptions,
        Stage::TerraformApply,
        Stage::TriggerBuild,
        Stage::WaitForBuild,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::CloneSampleApp => "clone_sample_app",
            Stage::CreateTestCopyOfExamples => "create_test_copy_of_examples",
            Stage::CreateTerratestOptions => "create_terratest_options",
            Stage::TerraformApply => "terraform_apply",
            Stage::TriggerBuild => "trigger_build",
            Stage::WaitForBuild => "wait_for_build",
            Stage::Cleanup => "cleanup",
        }
    }

    /// Environment variable that skips this stage
    pub fn skip_var(&self) -> String {
        format!("SKIP_{}", self.name())
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decides which stages run
#[derive(Debug, Clone, Default)]
pub struct StageGate {
    skipped: HashSet<Stage>,
}

impl StageGate {
    /// Reads `SKIP_<stage>` switches from the process environment
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Reads `SKIP_<stage>` switches from an explicit set of variables
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let set: HashSet<String> = vars
            .into_iter()
            .filter(|(_, v)| !v.as_ref().is_empty())
            .map(|(k, _)| k.as_ref().to_string())
            .collect();

        let skipped = Stage::PIPELINE
            .iter()
            .chain(std::iter::once(&Stage::Cleanup))
            .filter(|stage| set.contains(&stage.skip_var()))
            .copied()
            .collect();

        Self { skipped }
    }

    pub fn skip(mut self, stage: Stage) -> Self {
        self.skipped.insert(stage);
        self
    }

    pub fn should_run(&self, stage: Stage) -> bool {
        !self.skipped.contains(&stage)
    }
}

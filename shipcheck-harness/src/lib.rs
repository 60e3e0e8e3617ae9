//! Shipcheck Harness
//!
//! End-to-end validation of the Terraform-managed deployment example.
//!
//! Architecture:
//! - Configuration: harness settings from environment or defaults
//! - Scheduler: the bounded, fixed-interval wait for a triggered build
//! - Stages: named, individually skippable phases and their persisted state
//! - Tools: git, terraform and gcloud invocations
//! - Scenario: the stage pipeline for one variable set, with cleanup
//!
//! A scenario clones the sample app, applies its own copy of the module,
//! pushes a commit to fire the build trigger and polls the build service
//! until the build succeeds, then tears everything down.

pub mod config;
pub mod region;
pub mod scenario;
pub mod scheduler;
pub mod stage;
pub mod tools;
pub mod workspace;

pub use config::{FailurePolicy, HarnessConfig};
pub use scenario::{Scenario, ScenarioKind};
pub use scheduler::{BuildPoller, PollError, PollPolicy};

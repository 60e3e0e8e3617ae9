//! Build query capability
//!
//! The seam between the poller and the build service. The poller only needs
//! two reads, so it depends on this trait rather than on the HTTP client,
//! which lets tests script the service's answers.

use async_trait::async_trait;
use shipcheck_core::domain::build::Build;

use crate::CloudBuildClient;
use crate::error::Result;

/// Read access to builds
#[async_trait]
pub trait BuildQuery: Send + Sync {
    /// Lists builds started by `trigger_id`, most recent first
    async fn list_builds_for_trigger(&self, project_id: &str, trigger_id: &str)
    -> Result<Vec<Build>>;

    /// Fetches a single build
    async fn get_build(&self, project_id: &str, build_id: &str) -> Result<Build>;
}

#[async_trait]
impl BuildQuery for CloudBuildClient {
    async fn list_builds_for_trigger(
        &self,
        project_id: &str,
        trigger_id: &str,
    ) -> Result<Vec<Build>> {
        CloudBuildClient::list_builds_for_trigger(self, project_id, trigger_id).await
    }

    async fn get_build(&self, project_id: &str, build_id: &str) -> Result<Build> {
        CloudBuildClient::get_build(self, project_id, build_id).await
    }
}

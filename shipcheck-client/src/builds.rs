//! Build-related API endpoints

use shipcheck_core::domain::build::Build;
use shipcheck_core::dto::build::ListBuildsResponse;
use tracing::debug;

use crate::CloudBuildClient;
use crate::error::Result;

impl CloudBuildClient {
    // =============================================================================
    // Builds
    // =============================================================================

    /// List builds started by a trigger
    ///
    /// The API returns builds most recent first. Only the first page is
    /// fetched.
    ///
    /// # Arguments
    /// * `project_id` - The cloud project owning the trigger
    /// * `trigger_id` - The trigger identifier
    pub async fn list_builds_for_trigger(
        &self,
        project_id: &str,
        trigger_id: &str,
    ) -> Result<Vec<Build>> {
        let url = format!("{}/v1/projects/{}/builds", self.base_url, project_id);
        let filter = format!("trigger_id=\"{}\"", trigger_id);
        debug!("Listing builds for trigger {} in {}", trigger_id, project_id);

        let response = self.get(&url).query(&[("filter", filter)]).send().await?;

        let list: ListBuildsResponse = self.handle_response(response).await?;
        Ok(list.builds)
    }

    /// Get a build by ID
    ///
    /// # Arguments
    /// * `project_id` - The cloud project owning the build
    /// * `build_id` - The build identifier
    pub async fn get_build(&self, project_id: &str, build_id: &str) -> Result<Build> {
        let url = format!(
            "{}/v1/projects/{}/builds/{}",
            self.base_url, project_id, build_id
        );
        let response = self.get(&url).send().await?;

        self.handle_response(response).await
    }
}

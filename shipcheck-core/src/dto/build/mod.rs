//! Build list DTOs

use serde::{Deserialize, Serialize};

use crate::domain::build::Build;

/// Response of the "list builds" endpoint
///
/// The API omits `builds` entirely when nothing matches the filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBuildsResponse {
    #[serde(default)]
    pub builds: Vec<Build>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_response_has_no_builds() {
        let resp: ListBuildsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.builds.is_empty());
    }
}

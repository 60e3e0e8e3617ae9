//! gcloud CLI helpers

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::ShellCommand;

pub fn delete_image_command(image: &str) -> ShellCommand {
    ShellCommand::new("gcloud").args([
        "container",
        "images",
        "delete",
        image,
        "--force-delete-tags",
        "--quiet",
    ])
}

/// Deletes an image reference from the container registry
pub async fn delete_image(image: &str) -> Result<()> {
    info!("Deleting image {}", image);
    delete_image_command(image)
        .run()
        .await
        .with_context(|| format!("deleting image {image}"))?;
    Ok(())
}

/// Deletes every image, logging failures instead of stopping at the first
///
/// Returns the number of images that could not be deleted.
pub async fn delete_images(images: &[String]) -> usize {
    let mut failed = 0;
    for image in images {
        if let Err(e) = delete_image(image).await {
            warn!("Failed to delete image {}: {:#}", image, e);
            failed += 1;
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_image_command() {
        let cmd = delete_image_command("gcr.io/proj/app:abc");
        assert_eq!(
            cmd.display(),
            "gcloud container images delete gcr.io/proj/app:abc --force-delete-tags --quiet"
        );
    }

    #[tokio::test]
    async fn test_delete_images_with_nothing_to_do() {
        assert_eq!(delete_images(&[]).await, 0);
    }
}

//! Git operations on the sample app clone

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::ShellCommand;

pub fn clone_command(url: &str, branch: &str, dest: &Path) -> ShellCommand {
    ShellCommand::new("git")
        .args(["clone", url, "--branch", branch, "--single-branch"])
        .arg(dest.to_string_lossy())
}

/// Clones a single branch of `url` into `dest`
pub async fn clone(url: &str, branch: &str, dest: &Path) -> Result<()> {
    info!("Cloning git repo {} to {}", url, dest.display());
    clone_command(url, branch, dest)
        .run()
        .await
        .with_context(|| format!("cloning {url}"))?;
    Ok(())
}

/// URL of a cloud source repository
pub fn source_repo_url(project: &str, repo_name: &str) -> String {
    format!("https://source.developers.google.com/p/{project}/r/{repo_name}")
}

/// Returns `true` if the clone already knows `remote`
pub fn has_remote(repo: &Path, remote: &str) -> bool {
    repo.join(".git")
        .join("refs")
        .join("remotes")
        .join(remote)
        .exists()
        || git_config_has_remote(repo, remote)
}

fn git_config_has_remote(repo: &Path, remote: &str) -> bool {
    std::fs::read_to_string(repo.join(".git").join("config"))
        .map(|config| config.contains(&format!("[remote \"{remote}\"]")))
        .unwrap_or(false)
}

/// Adds `remote` pointing at `url` unless it already exists
pub async fn ensure_remote(repo: &Path, remote: &str, url: &str) -> Result<()> {
    if has_remote(repo, remote) {
        debug!("Remote {} already present in {}", remote, repo.display());
        return Ok(());
    }

    ShellCommand::new("git")
        .args(["remote", "add", remote, url])
        .current_dir(repo)
        .run()
        .await
        .with_context(|| format!("adding remote {remote}"))?;
    Ok(())
}

/// Writes a timestamp file whose content changes on every call
pub fn write_marker_file(repo: &Path, name: &str) -> Result<PathBuf> {
    let path = repo.join(name);
    let content = format!("{}\n", chrono::Local::now().to_rfc3339());
    std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

pub fn push_command(repo: &Path, remote: &str, branch: &str) -> ShellCommand {
    ShellCommand::new("git")
        .args(["push", remote])
        .arg(format!("HEAD:refs/heads/{branch}"))
        .current_dir(repo)
}

/// Stages `file`, commits it and pushes the commit to `remote`
pub async fn add_commit_push(
    repo: &Path,
    file: &Path,
    message: &str,
    remote: &str,
    branch: &str,
) -> Result<()> {
    ShellCommand::new("git")
        .arg("add")
        .arg(file.to_string_lossy())
        .current_dir(repo)
        .run()
        .await
        .context("git add")?;

    ShellCommand::new("git")
        .args(["commit", "-m", message])
        .current_dir(repo)
        .run()
        .await
        .context("git commit")?;

    push_command(repo, remote, branch)
        .run()
        .await
        .with_context(|| format!("pushing to {remote}"))?;

    info!("Pushed commit '{}' to {}/{}", message, remote, branch);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clone_command() {
        let cmd = clone_command(
            "https://github.com/robmorgan/sample-node-app.git",
            "main",
            Path::new("/tmp/repos/sample-app-docker"),
        );
        assert_eq!(
            cmd.display(),
            "git clone https://github.com/robmorgan/sample-node-app.git --branch main \
             --single-branch /tmp/repos/sample-app-docker"
        );
    }

    #[test]
    fn test_source_repo_url() {
        assert_eq!(
            source_repo_url("proj", "sample-docker-app-abc123"),
            "https://source.developers.google.com/p/proj/r/sample-docker-app-abc123"
        );
    }

    #[test]
    fn test_push_command() {
        let cmd = push_command(Path::new("/repo"), "google", "main");
        assert_eq!(cmd.display(), "git push google HEAD:refs/heads/main");
    }

    #[test]
    fn test_has_remote() {
        let dir = TempDir::new().unwrap();
        let git = dir.path().join(".git");
        std::fs::create_dir_all(&git).unwrap();
        assert!(!has_remote(dir.path(), "google"));

        std::fs::write(
            git.join("config"),
            "[remote \"google\"]\n\turl = https://source.developers.google.com/p/p/r/r\n",
        )
        .unwrap();
        assert!(has_remote(dir.path(), "google"));
        assert!(!has_remote(dir.path(), "origin"));
    }

    #[test]
    fn test_write_marker_file_writes_timestamp() {
        let dir = TempDir::new().unwrap();
        let path = write_marker_file(dir.path(), "auto-committed.txt").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with('\n'));
        assert!(chrono::DateTime::parse_from_rfc3339(content.trim()).is_ok());
    }

    #[tokio::test]
    async fn test_ensure_remote_on_real_repo() {
        let dir = TempDir::new().unwrap();
        if ShellCommand::new("git")
            .args(["init", "-q"])
            .current_dir(dir.path())
            .run()
            .await
            .is_err()
        {
            // git is not installed on this machine
            return;
        }

        let url = source_repo_url("p", "r");
        ensure_remote(dir.path(), "google", &url).await.unwrap();
        assert!(has_remote(dir.path(), "google"));

        // Second call is a no-op instead of a "remote already exists" failure
        ensure_remote(dir.path(), "google", &url).await.unwrap();
    }
}

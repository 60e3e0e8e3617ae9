//! External command-line tools
//!
//! Thin wrappers around the CLIs a scenario drives:
//! - git: cloning the sample app and pushing a commit to fire the trigger
//! - terraform: provisioning and tearing down the example
//! - gcloud: deleting images pushed by the build
//!
//! Every invocation goes through [`ShellCommand`], which logs the command,
//! captures its output and turns a non-zero exit into an error.

pub mod gcloud;
pub mod git;
pub mod terraform;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, error, info};

/// A command to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
}

/// Captured output of a successful command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Human readable form, e.g. `git clone https://... --branch main`
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the command to completion
    ///
    /// Fails if the process cannot be spawned or exits unsuccessfully.
    pub async fn run(&self) -> Result<CommandOutput> {
        info!("Running command: {}", self.display());

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }

        let output = command
            .output()
            .await
            .with_context(|| format!("Failed to execute '{}'. Is it installed?", self.program))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !stdout.trim().is_empty() {
            debug!("{} stdout: {}", self.program, stdout.trim());
        }
        if !stderr.trim().is_empty() {
            debug!("{} stderr: {}", self.program, stderr.trim());
        }

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let error_msg = format!(
                "'{}' failed: exit_code={}, stderr='{}'",
                self.display(),
                exit_code,
                stderr.trim()
            );
            error!("{}", error_msg);
            anyhow::bail!("{}", error_msg);
        }

        Ok(CommandOutput { stdout })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let cmd = ShellCommand::new("git")
            .arg("clone")
            .args(["https://example.com/app.git", "--branch", "main"]);
        assert_eq!(
            cmd.display(),
            "git clone https://example.com/app.git --branch main"
        );
        assert_eq!(cmd.program(), "git");
        assert_eq!(cmd.get_args().len(), 4);
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let output = ShellCommand::new("sh")
            .args(["-c", "echo \"$GREETING\""])
            .env("GREETING", "hello")
            .run()
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_honours_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();

        let output = ShellCommand::new("ls")
            .current_dir(dir.path())
            .run()
            .await
            .unwrap();
        assert!(output.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_run_reports_failure() {
        let err = ShellCommand::new("sh")
            .args(["-c", "echo boom >&2; exit 3"])
            .run()
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exit_code=3"));
        assert!(msg.contains("boom"));
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let err = ShellCommand::new("definitely-not-a-real-binary-shipcheck")
            .run()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Is it installed?"));
    }
}

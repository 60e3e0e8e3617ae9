//! Terraform invocation
//!
//! Options are plain data so they can be persisted between stages and
//! rendered into `-var` flags for every command that needs them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;

use super::ShellCommand;

/// Where and with which variables Terraform runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerraformOptions {
    pub terraform_dir: PathBuf,
    pub vars: BTreeMap<String, JsonValue>,
}

impl TerraformOptions {
    pub fn new(terraform_dir: impl Into<PathBuf>, vars: BTreeMap<String, JsonValue>) -> Self {
        Self {
            terraform_dir: terraform_dir.into(),
            vars,
        }
    }

    /// String value of a variable, if set and a string
    pub fn var_str(&self, name: &str) -> Option<&str> {
        self.vars.get(name).and_then(JsonValue::as_str)
    }

    /// `-var name=value` pairs for every variable, in name order
    pub fn var_args(&self) -> Vec<String> {
        self.vars
            .iter()
            .flat_map(|(name, value)| ["-var".to_string(), format!("{name}={}", render_value(value))])
            .collect()
    }
}

/// Strings are passed raw; everything else as JSON, which Terraform reads as HCL
fn render_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn terraform(options: &TerraformOptions) -> ShellCommand {
    ShellCommand::new("terraform")
        .current_dir(&options.terraform_dir)
        .env("TF_IN_AUTOMATION", "1")
}

pub fn init_command(options: &TerraformOptions) -> ShellCommand {
    terraform(options).args(["init", "-input=false", "-no-color"])
}

pub fn apply_command(options: &TerraformOptions) -> ShellCommand {
    terraform(options)
        .args(["apply", "-input=false", "-auto-approve", "-no-color"])
        .args(options.var_args())
}

pub fn destroy_command(options: &TerraformOptions) -> ShellCommand {
    terraform(options)
        .args(["destroy", "-input=false", "-auto-approve", "-no-color"])
        .args(options.var_args())
}

pub fn output_command(options: &TerraformOptions, name: &str) -> ShellCommand {
    terraform(options).args(["output", "-no-color", "-raw", name])
}

/// Runs `terraform init` then `terraform apply`
pub async fn init_and_apply(options: &TerraformOptions) -> Result<()> {
    info!(
        "Applying Terraform configuration in {}",
        options.terraform_dir.display()
    );
    init_command(options).run().await.context("terraform init")?;
    apply_command(options).run().await.context("terraform apply")?;
    Ok(())
}

/// Reads an output value as a string
pub async fn output(options: &TerraformOptions, name: &str) -> Result<String> {
    let out = output_command(options, name)
        .run()
        .await
        .with_context(|| format!("terraform output {name}"))?;

    let value = out.stdout.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("terraform output '{}' is empty", name);
    }
    Ok(value)
}

pub async fn destroy(options: &TerraformOptions) -> Result<()> {
    info!(
        "Destroying Terraform resources in {}",
        options.terraform_dir.display()
    );
    destroy_command(options)
        .run()
        .await
        .context("terraform destroy")?;
    Ok(())
}

/// State and variable files, which never travel with a copied module
pub fn is_state_or_vars_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| {
            name.starts_with("terraform.tfstate") || name.starts_with("terraform.tfvars")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options() -> TerraformOptions {
        let mut vars = BTreeMap::new();
        vars.insert("project".to_string(), json!("my-project"));
        vars.insert("deploy_db".to_string(), json!(true));
        vars.insert("location".to_string(), json!("us-east1"));
        TerraformOptions::new("/tmp/module", vars)
    }

    #[test]
    fn test_var_args_are_sorted_and_rendered() {
        assert_eq!(
            options().var_args(),
            vec![
                "-var",
                "deploy_db=true",
                "-var",
                "location=us-east1",
                "-var",
                "project=my-project",
            ]
        );
    }

    #[test]
    fn test_var_str() {
        let options = options();
        assert_eq!(options.var_str("project"), Some("my-project"));
        assert_eq!(options.var_str("deploy_db"), None);
        assert_eq!(options.var_str("missing"), None);
    }

    #[test]
    fn test_render_complex_values() {
        assert_eq!(render_value(&json!(["a", "b"])), r#"["a","b"]"#);
        assert_eq!(render_value(&json!(3)), "3");
    }

    #[test]
    fn test_apply_command() {
        let cmd = apply_command(&options());
        assert_eq!(cmd.program(), "terraform");
        assert_eq!(
            &cmd.get_args()[..4],
            &["apply", "-input=false", "-auto-approve", "-no-color"]
        );
        assert!(cmd.get_args().contains(&"project=my-project".to_string()));
    }

    #[test]
    fn test_output_command() {
        let cmd = output_command(&options(), "trigger_id");
        assert_eq!(cmd.display(), "terraform output -no-color -raw trigger_id");
    }

    #[test]
    fn test_destroy_passes_vars() {
        let cmd = destroy_command(&options());
        assert_eq!(cmd.get_args()[0], "destroy");
        assert!(cmd.get_args().contains(&"deploy_db=true".to_string()));
    }

    #[test]
    fn test_state_and_vars_files() {
        assert!(is_state_or_vars_file(Path::new("a/terraform.tfstate")));
        assert!(is_state_or_vars_file(Path::new("terraform.tfvars.json")));
        assert!(is_state_or_vars_file(Path::new(
            "terraform.tfstate.1712345678.backup"
        )));
        assert!(is_state_or_vars_file(Path::new("env/terraform.tfvars.local")));
        assert!(!is_state_or_vars_file(Path::new("main.tf")));
        assert!(!is_state_or_vars_file(Path::new("variables.tfvars")));
    }
}

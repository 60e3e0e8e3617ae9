//! Isolated copies of the Terraform module under test
//!
//! Each scenario applies its own copy of the module so concurrent runs never
//! share `.terraform/` directories or state files.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::tools::terraform::is_state_or_vars_file;

/// Hidden files that are part of the module and must be copied
const KEPT_HIDDEN_FILES: &[&str] = &[".terraform-version", ".terraform.lock.hcl"];

/// Build output of the harness itself, which lives inside the module folder
const SKIPPED_DIRS: &[&str] = &["target"];

/// Returns `true` if `relative` (a path below the module root) is copied
pub fn should_copy(relative: &Path) -> bool {
    for component in relative.components() {
        let Component::Normal(name) = component else {
            continue;
        };
        let name = name.to_string_lossy();
        if name.starts_with('.') && !KEPT_HIDDEN_FILES.contains(&name.as_ref()) {
            return false;
        }
        if SKIPPED_DIRS.contains(&name.as_ref()) {
            return false;
        }
    }
    !is_state_or_vars_file(relative)
}

/// Copies the module at `root` into a fresh temporary folder
///
/// The folder is created under the system temp dir with `prefix` in its name
/// and survives this process; `terraform destroy` needs it during cleanup.
/// Returns `<tmp>/<name of root>`.
pub fn copy_terraform_folder_to_temp(root: &Path, prefix: &str) -> Result<PathBuf> {
    let source = root
        .canonicalize()
        .with_context(|| format!("Terraform folder does not exist: {}", root.display()))?;

    let tmp = tempfile::Builder::new()
        .prefix(&format!("{prefix}-"))
        .tempdir()
        .context("creating temp folder")?
        .keep();

    let name = source
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "module".into());
    let dest = tmp.join(name);

    copy_filtered(&source, &dest)?;
    info!("Copied Terraform folder {} to {}", source.display(), dest.display());
    Ok(dest)
}

fn copy_filtered(source: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).with_context(|| format!("creating {}", dest.display()))?;

    let walker = WalkDir::new(source).into_iter().filter_entry(|entry| {
        entry
            .path()
            .strip_prefix(source)
            .map(|relative| relative.as_os_str().is_empty() || should_copy(relative))
            .unwrap_or(false)
    });

    for entry in walker {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source)?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("creating {}", target.display()))?;
        } else if entry.file_type().is_file() {
            debug!("Copying {}", relative.display());
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("copying {}", entry.path().display()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_should_copy() {
        assert!(should_copy(Path::new("main.tf")));
        assert!(should_copy(Path::new("modules/run/main.tf")));
        assert!(should_copy(Path::new(".terraform-version")));
        assert!(should_copy(Path::new(".terraform.lock.hcl")));

        assert!(!should_copy(Path::new(".terraform")));
        assert!(!should_copy(Path::new(".terraform/providers/x")));
        assert!(!should_copy(Path::new(".git/config")));
        assert!(!should_copy(Path::new("terraform.tfstate")));
        assert!(!should_copy(Path::new("nested/terraform.tfvars")));
        assert!(!should_copy(Path::new("terraform.tfstate.1712345678.backup")));
        assert!(!should_copy(Path::new("terraform.tfvars.local")));
        assert!(!should_copy(Path::new("test/target/debug/shipcheck")));
    }

    #[test]
    fn test_copy_terraform_folder_to_temp() {
        let src = TempDir::new().unwrap();
        let root = src.path().join("example");
        std::fs::create_dir_all(root.join("modules/db")).unwrap();
        std::fs::create_dir_all(root.join(".terraform")).unwrap();
        std::fs::write(root.join("main.tf"), "resource {}").unwrap();
        std::fs::write(root.join("modules/db/main.tf"), "db").unwrap();
        std::fs::write(root.join(".terraform/plugin"), "bin").unwrap();
        std::fs::write(root.join(".terraform.lock.hcl"), "lock").unwrap();
        std::fs::write(root.join("terraform.tfstate"), "{}").unwrap();

        let dest = copy_terraform_folder_to_temp(&root, "example").unwrap();

        assert!(dest.ends_with("example"));
        assert_ne!(dest, root.canonicalize().unwrap());
        assert_eq!(
            std::fs::read_to_string(dest.join("modules/db/main.tf")).unwrap(),
            "db"
        );
        assert!(dest.join("main.tf").is_file());
        assert!(dest.join(".terraform.lock.hcl").is_file());
        assert!(!dest.join(".terraform").exists());
        assert!(!dest.join("terraform.tfstate").exists());

        if let Some(tmp) = dest.parent() {
            std::fs::remove_dir_all(tmp).unwrap();
        }
    }

    #[test]
    fn test_copy_missing_folder() {
        let err = copy_terraform_folder_to_temp(Path::new("/no/such/folder"), "x").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}

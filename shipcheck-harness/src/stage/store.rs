//! Stage store
//!
//! A small key-value scratch store scoped to one scenario's working
//! directory. Each value is a JSON file under `<working_dir>/.test-data/`,
//! so a later invocation that skips earlier stages still finds their output.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::tools::terraform::TerraformOptions;

const DATA_DIR: &str = ".test-data";
const TERRAFORM_OPTIONS_KEY: &str = "TerraformOptions";

/// Errors raised by the stage store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no value stored for '{key}' (expected {path}); did an earlier stage run?")]
    Missing { key: String, path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid stored value for '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persisted state shared by the stages of one scenario
#[derive(Debug, Clone)]
pub struct StageStore {
    working_dir: PathBuf,
}

impl StageStore {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// File backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.working_dir.join(DATA_DIR).join(format!("{key}.json"))
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path_for(key);
        let data = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            key: key.to_string(),
            source,
        })?;

        atomic_write(&path, &data)?;
        debug!("Stored '{}' at {}", key, path.display());
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let path = self.path_for(key);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::Missing {
                    key: key.to_string(),
                    path,
                });
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&data).map_err(|source| StoreError::Json {
            key: key.to_string(),
            source,
        })
    }

    /// Loads `key`, returning `None` if it was never stored
    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.load(key) {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::Missing { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn save_string(&self, key: &str, value: &str) -> Result<()> {
        self.save(key, &value)
    }

    pub fn load_string(&self, key: &str) -> Result<String> {
        self.load(key)
    }

    pub fn save_terraform_options(&self, options: &TerraformOptions) -> Result<()> {
        self.save(TERRAFORM_OPTIONS_KEY, options)
    }

    pub fn load_terraform_options(&self) -> Result<TerraformOptions> {
        self.load(TERRAFORM_OPTIONS_KEY)
    }

    pub fn try_load_terraform_options(&self) -> Result<Option<TerraformOptions>> {
        self.try_load(TERRAFORM_OPTIONS_KEY)
    }

    /// Forgets `key`; a no-op if it was never stored
    pub fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `data` to `path` through a tempfile in the same directory
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::validate_directory;
use crate::Result;

/// On-disk table layout.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory holding one subdirectory per table
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        validate_directory(&self.data_dir, "data_dir")?;
        Ok(())
    }

    /// Where the files of `table` live.
    pub fn data_file_location(
        &self,
        table: &str,
    ) -> PathBuf {
        Path::new(&self.data_dir).join(table)
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/tmp/ringkv/data")
}

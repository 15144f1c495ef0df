use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::constants::DATA_SUFFIX;
use crate::constants::SSTABLE_SUFFIXES;
use crate::constants::TEMP_MARKER;
use crate::Result;
use crate::StorageError;

/// Parsed form of an sstable component file name:
/// `<cf>-<generation>[-tmp]-<Kind>.db`, `Kind` one of Data, Index,
/// Filter. The column family name must not contain `-`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SstableName {
    pub column_family: String,
    pub generation: u64,
    pub temporary: bool,
    /// Component suffix including the extension, e.g. `Data.db`.
    pub kind: String,
}

impl SstableName {
    pub fn parse(file_name: &str) -> Result<Self> {
        let mut pieces: Vec<&str> = file_name.split('-').collect();
        if pieces.len() < 3 {
            return Err(StorageError::BadFileName(file_name.to_string()).into());
        }

        let kind = pieces.pop().unwrap().to_string();
        if !SSTABLE_SUFFIXES.contains(&kind.as_str()) {
            return Err(StorageError::BadFileName(file_name.to_string()).into());
        }

        let temporary = pieces.last() == Some(&TEMP_MARKER);
        if temporary {
            pieces.pop();
        }

        let generation = pieces
            .pop()
            .and_then(|g| g.parse::<u64>().ok())
            .ok_or_else(|| StorageError::BadFileName(file_name.to_string()))?;

        if pieces.len() != 1 {
            return Err(StorageError::BadFileName(file_name.to_string()).into());
        }

        Ok(Self {
            column_family: pieces[0].to_string(),
            generation,
            temporary,
            kind,
        })
    }

    pub fn format(&self) -> String {
        if self.temporary {
            format!(
                "{}-{}-{}-{}",
                self.column_family, self.generation, TEMP_MARKER, self.kind
            )
        } else {
            format!("{}-{}-{}", self.column_family, self.generation, self.kind)
        }
    }

    /// The same generation with a different component suffix.
    pub fn with_kind(
        &self,
        kind: &str,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            ..self.clone()
        }
    }

    /// The `<cf>-<generation>` prefix that all components of one
    /// generation share.
    pub fn stem(&self) -> String {
        format!("{}-{}", self.column_family, self.generation)
    }
}

/// Handle to an installed on-disk table; opened on the Data component.
#[derive(Debug)]
pub struct SstableReader {
    data_path: PathBuf,
}

impl SstableReader {
    pub fn open(data_path: PathBuf) -> Result<Self> {
        if !data_path.exists() {
            return Err(StorageError::PathError {
                path: data_path,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }
            .into());
        }
        Ok(Self { data_path })
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn file_name(&self) -> String {
        self.data_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Component files of this generation that exist on disk.
    pub fn component_paths(&self) -> Vec<PathBuf> {
        let Ok(name) = SstableName::parse(&self.file_name()) else {
            return vec![self.data_path.clone()];
        };
        let dir = self.data_path.parent().unwrap_or_else(|| Path::new(""));
        SSTABLE_SUFFIXES
            .iter()
            .map(|kind| dir.join(name.with_kind(kind).format()))
            .filter(|p| p.exists())
            .collect()
    }
}

pub struct SstableWriter;

impl SstableWriter {
    /// Rename one fully received `-tmp-` component to its final name.
    /// Components promote independently as each finishes streaming, so
    /// completion order across Data/Index/Filter never matters.
    pub async fn promote_component(path: &Path) -> Result<PathBuf> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StorageError::BadFileName(path.display().to_string()))?;

        let mut name = SstableName::parse(&file_name)?;
        if !name.temporary {
            return Ok(path.to_path_buf());
        }
        name.temporary = false;

        let final_path = path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(name.format());

        debug!(from = %path.display(), to = %final_path.display(), "promoting sstable component");
        tokio::fs::rename(path, &final_path)
            .await
            .map_err(|e| StorageError::PathError {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(final_path)
    }

    /// Promote a received Data component and open it for reading.
    pub async fn rename_and_open(data_path: &Path) -> Result<SstableReader> {
        let file_name = data_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StorageError::BadFileName(data_path.display().to_string()))?;

        let name = SstableName::parse(&file_name)?;
        if name.kind != DATA_SUFFIX {
            return Err(StorageError::BadFileName(format!(
                "{file_name} is not a Data component"
            ))
            .into());
        }

        let final_path = Self::promote_component(data_path).await?;
        SstableReader::open(final_path)
    }
}

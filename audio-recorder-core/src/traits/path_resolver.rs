use std::path::PathBuf;

use crate::models::format::OutputFormat;
use crate::models::session::FileNameOption;

/// Maps a file name option and format to filesystem locations.
pub trait PathResolver: Send + Sync {
    /// Persisted location of a finished recording.
    fn resolve(&self, name: &FileNameOption, format: OutputFormat) -> PathBuf;

    /// Location the file is written to while recording.
    fn scratch_path(&self, name: &FileNameOption, format: OutputFormat) -> PathBuf;
}

/// Resolves into one scratch directory and one persisted directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPathResolver {
    scratch_dir: PathBuf,
    persisted_dir: PathBuf,
}

impl DirectoryPathResolver {
    pub fn new(scratch_dir: impl Into<PathBuf>, persisted_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            persisted_dir: persisted_dir.into(),
        }
    }

    pub fn persisted_dir(&self) -> &std::path::Path {
        &self.persisted_dir
    }

    fn file_name(name: &FileNameOption, format: OutputFormat) -> String {
        format!("{}.{}", name.file_stem(), format.extension())
    }
}

impl PathResolver for DirectoryPathResolver {
    fn resolve(&self, name: &FileNameOption, format: OutputFormat) -> PathBuf {
        self.persisted_dir.join(Self::file_name(name, format))
    }

    fn scratch_path(&self, name: &FileNameOption, format: OutputFormat) -> PathBuf {
        self.scratch_dir.join(Self::file_name(name, format))
    }
}

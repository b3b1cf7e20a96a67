//! Artifact naming

use std::path::{Path, PathBuf};

/// Formats the current local time as a run timestamp
pub fn run_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Builds artifact paths for one run
///
/// The timestamp is fixed when the namer is created, so every artifact of a
/// run shares it.
#[derive(Debug, Clone)]
pub struct ArtifactNamer {
    directory: PathBuf,
    stem: String,
    stamp: String,
}

impl ArtifactNamer {
    /// Creates a namer with an explicit timestamp
    pub fn new(directory: impl AsRef<Path>, stem: &str, stamp: &str) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            stem: stem.to_string(),
            stamp: stamp.to_string(),
        }
    }

    /// Creates a namer stamped with the current local time
    pub fn now(directory: impl AsRef<Path>, stem: &str) -> Self {
        Self::new(directory, stem, &run_timestamp())
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    /// `backup_<stem>_<ts>_<count>.json`
    pub fn checkpoint(&self, count: usize) -> PathBuf {
        self.directory
            .join(format!("backup_{}_{}_{}.json", self.stem, self.stamp, count))
    }

    /// `<stem>_final_<ts>.json`
    pub fn final_structured(&self) -> PathBuf {
        self.directory
            .join(format!("{}_final_{}.json", self.stem, self.stamp))
    }

    /// `<stem>_final_<ts>.csv`
    pub fn final_tabular(&self) -> PathBuf {
        self.directory
            .join(format!("{}_final_{}.csv", self.stem, self.stamp))
    }

    /// `interrupted_<stem>_<ts>.json`
    pub fn interrupted(&self) -> PathBuf {
        self.directory
            .join(format!("interrupted_{}_{}.json", self.stem, self.stamp))
    }

    /// `error_<stem>_<ts>.json`
    pub fn error(&self) -> PathBuf {
        self.directory
            .join(format!("error_{}_{}.json", self.stem, self.stamp))
    }
}

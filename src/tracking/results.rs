use super::episode::NavigationStats;
use crate::error::EvalError;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// Append-only log of cumulative `success collision` counts, one line per episode
pub struct ResultsFile {
    path: PathBuf,
}

impl ResultsFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn append(&self, stats: &NavigationStats) -> Result<(), EvalError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{} {}", stats.success, stats.collision)?;
        Ok(())
    }
}

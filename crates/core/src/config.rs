//! Run configuration.

use crate::error::{GdirError, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Parameters read once at the start of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Fan entity tasks out over a worker pool
    pub use_multiprocessing: bool,

    /// Worker pool size
    pub mp_processes: usize,

    /// Root of everything the run writes
    pub working_dir: PathBuf,

    /// Reference glacier table (CSV with an `RGI_ID` column)
    pub wgms_rgi_links: Option<PathBuf>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            use_multiprocessing: false,
            mp_processes: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            working_dir: PathBuf::from(".glacierflow"),
            wgms_rgi_links: None,
        }
    }
}

impl Params {
    /// Create default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load parameters from a JSON file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| GdirError::io(path, e))?;
        serde_json::from_str(&json).map_err(|e| GdirError::json(path, e))
    }

    /// Set the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Enable the worker pool with `processes` workers.
    pub fn with_multiprocessing(mut self, processes: usize) -> Self {
        self.use_multiprocessing = true;
        self.mp_processes = processes;
        self
    }

    /// Set the reference glacier table.
    pub fn with_reference_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.wgms_rgi_links = Some(path.into());
        self
    }

    /// Directory holding one sub-directory per glacier.
    pub fn per_glacier_dir(&self) -> PathBuf {
        self.working_dir.join("per_glacier")
    }

    /// Resolve how entity tasks are executed.
    pub fn execution_mode(&self) -> Result<ExecutionMode> {
        if !self.use_multiprocessing {
            return Ok(ExecutionMode::Serial);
        }
        NonZeroUsize::new(self.mp_processes)
            .map(|processes| ExecutionMode::Parallel { processes })
            .ok_or_else(|| GdirError::Config("mp_processes must be at least 1".to_string()))
    }
}

/// How entity tasks are applied to a collection of glaciers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One glacier after the other on the calling thread
    Serial,
    /// Fanned out over a fixed-size worker pool
    Parallel {
        /// Number of workers
        processes: NonZeroUsize,
    },
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Serial => write!(f, "serial"),
            ExecutionMode::Parallel { processes } => write!(f, "parallel({})", processes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_serial() {
        let params = Params::default();
        assert!(params.mp_processes >= 1);
        assert_eq!(params.execution_mode().unwrap(), ExecutionMode::Serial);
    }

    #[test]
    fn test_parallel_mode() {
        let params = Params::new().with_multiprocessing(4);
        assert_eq!(
            params.execution_mode().unwrap(),
            ExecutionMode::Parallel { processes: NonZeroUsize::new(4).unwrap() }
        );
    }

    #[test]
    fn test_zero_processes_rejected() {
        let params = Params::new().with_multiprocessing(0);
        assert!(matches!(params.execution_mode(), Err(GdirError::Config(_))));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"use_multiprocessing": true, "mp_processes": 2, "working_dir": "/tmp/wd"}"#).unwrap();

        let params = Params::load(&path).unwrap();
        assert!(params.use_multiprocessing);
        assert_eq!(params.mp_processes, 2);
        assert_eq!(params.per_glacier_dir(), PathBuf::from("/tmp/wd/per_glacier"));
        assert_eq!(params.wgms_rgi_links, None);
    }
}

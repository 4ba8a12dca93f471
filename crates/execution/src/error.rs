//! Errors raised while running the workflow.

use std::path::PathBuf;

/// Result alias for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Error type for workflow execution.
///
/// Nothing is recovered locally: every variant aborts the stage it happened in.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The worker pool could not be created
    #[error("Failed to build a worker pool of {processes} workers: {source}")]
    PoolBuild {
        /// Requested pool size
        processes: usize,
        /// Underlying error
        #[source]
        source: rayon::ThreadPoolBuildError,
    },

    /// An entity task failed on one glacier
    #[error("Entity task `{task}` failed on {rgi_id}: {source}")]
    EntityTask {
        /// Task name
        task: String,
        /// Earliest failing glacier in input order
        rgi_id: String,
        /// Error raised by the task
        #[source]
        source: anyhow::Error,
        /// Other glaciers whose in-flight invocation also failed
        other_failures: Vec<String>,
        /// Glaciers never started because the batch was aborted
        skipped: usize,
    },

    /// A global task failed
    #[error("Global task `{task}` failed: {source}")]
    GlobalTask {
        /// Task name
        task: String,
        /// Error raised by the task
        #[source]
        source: anyhow::Error,
    },

    /// A glacier directory could not be initialized
    #[error("Failed to initialize glacier {rgi_id}: {source}")]
    Region {
        /// Glacier identifier
        rgi_id: String,
        /// Underlying error
        #[source]
        source: anyhow::Error,
    },

    /// The reference glacier table could not be used
    #[error("Reference table {path}: {reason}")]
    ReferenceTable {
        /// Table location
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// No reference glacier table is configured
    #[error("No reference glacier table configured (wgms_rgi_links)")]
    MissingReferenceTable,

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] glacierflow_core::GdirError),
}

impl WorkflowError {
    /// Identifier of the glacier the error is about, if any.
    pub fn rgi_id(&self) -> Option<&str> {
        match self {
            Self::EntityTask { rgi_id, .. } | Self::Region { rgi_id, .. } => Some(rgi_id),
            _ => None,
        }
    }
}

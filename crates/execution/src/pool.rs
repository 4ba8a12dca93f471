//! Lazily created worker pool.

use crate::error::{Result, WorkflowError};
use once_cell::sync::OnceCell;
use std::num::NonZeroUsize;
use tracing::info;

/// Final step of pool construction, after size and thread names are set.
pub(crate) type BuildFn =
    fn(rayon::ThreadPoolBuilder) -> std::result::Result<rayon::ThreadPool, rayon::ThreadPoolBuildError>;

/// Fixed-size pool of worker threads.
///
/// The pool is built on first use and kept until the owner is dropped. Its
/// size never changes after construction.
pub struct WorkerPool {
    processes: NonZeroUsize,
    build: BuildFn,
    pool: OnceCell<rayon::ThreadPool>,
}

impl WorkerPool {
    /// Describe a pool of `processes` workers. No thread is spawned yet.
    pub fn new(processes: NonZeroUsize) -> Self {
        Self::with_builder(processes, rayon::ThreadPoolBuilder::build)
    }

    /// Same as [`WorkerPool::new`] with a custom last build step.
    pub(crate) fn with_builder(processes: NonZeroUsize, build: BuildFn) -> Self {
        Self {
            processes,
            build,
            pool: OnceCell::new(),
        }
    }

    pub(crate) fn processes(&self) -> NonZeroUsize {
        self.processes
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.processes.get()
    }

    /// Whether the workers have been spawned.
    pub fn is_initialized(&self) -> bool {
        self.pool.get().is_some()
    }

    /// Get the pool, spawning the workers on first call.
    ///
    /// A failed build is returned to the caller and retried on the next call.
    pub fn ensure(&self) -> Result<&rayon::ThreadPool> {
        self.pool.get_or_try_init(|| {
            let processes = self.size();
            info!(processes, "Starting worker pool");
            let builder = rayon::ThreadPoolBuilder::new()
                .num_threads(processes)
                .thread_name(|i| format!("glacierflow-worker-{}", i));
            (self.build)(builder).map_err(|source| WorkflowError::PoolBuild { processes, source })
        })
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("processes", &self.processes)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

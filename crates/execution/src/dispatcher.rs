//! Entity task dispatch - serial or over the worker pool.

use crate::error::{Result, WorkflowError};
use crate::pool::WorkerPool;
use crate::task::EntityTask;
use glacierflow_core::{ExecutionMode, GlacierDirectory, Params};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Outcome of a successful dispatch.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Task name
    pub task: String,
    /// Number of glaciers processed
    pub glaciers: usize,
    /// Mode the task ran in
    pub mode: ExecutionMode,
    /// Wall-clock duration
    pub elapsed: Duration,
}

/// Applies entity tasks to collections of glacier directories.
///
/// The execution mode is fixed at construction. In parallel mode the
/// dispatcher owns the worker pool and creates it on its first dispatch.
#[derive(Debug)]
pub struct TaskDispatcher {
    mode: ExecutionMode,
    pool: Option<WorkerPool>,
}

impl TaskDispatcher {
    /// Create a dispatcher for the given mode.
    pub fn new(mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::Serial => Self { mode, pool: None },
            ExecutionMode::Parallel { processes } => Self::with_pool(WorkerPool::new(processes)),
        }
    }

    /// Parallel dispatcher over an already described pool.
    pub(crate) fn with_pool(pool: WorkerPool) -> Self {
        Self {
            mode: ExecutionMode::Parallel {
                processes: pool.processes(),
            },
            pool: Some(pool),
        }
    }

    /// Create a dispatcher from the run parameters.
    pub fn from_params(params: &Params) -> Result<Self> {
        Ok(Self::new(params.execution_mode()?))
    }

    /// Execution mode.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// The worker pool, if running in parallel mode.
    pub fn pool(&self) -> Option<&WorkerPool> {
        self.pool.as_ref()
    }

    /// Spawn the worker pool if parallel mode is on and it does not exist yet.
    pub fn ensure_pool(&self) -> Result<Option<&rayon::ThreadPool>> {
        self.pool.as_ref().map(WorkerPool::ensure).transpose()
    }

    /// Apply `task` to every glacier in `gdirs`.
    ///
    /// Returns once every glacier has been processed. The first failure aborts
    /// the batch: in serial mode the remaining glaciers are not touched, in
    /// parallel mode no new glacier is started and the ones already running
    /// are awaited before the error is returned.
    pub fn dispatch(&self, task: &dyn EntityTask, gdirs: &[GlacierDirectory]) -> Result<DispatchReport> {
        let start = Instant::now();
        let report = |start: Instant| DispatchReport {
            task: task.name().to_string(),
            glaciers: gdirs.len(),
            mode: self.mode,
            elapsed: start.elapsed(),
        };

        if gdirs.is_empty() {
            debug!(task = task.name(), "Nothing to dispatch");
            return Ok(report(start));
        }

        info!(task = task.name(), glaciers = gdirs.len(), mode = %self.mode, "Dispatching entity task");

        match self.ensure_pool()? {
            None => self.run_serial(task, gdirs)?,
            Some(pool) => self.run_parallel(pool, task, gdirs)?,
        }

        let report = report(start);
        info!(task = task.name(), elapsed_ms = report.elapsed.as_millis() as u64, "Entity task done");
        Ok(report)
    }

    fn run_serial(&self, task: &dyn EntityTask, gdirs: &[GlacierDirectory]) -> Result<()> {
        for (i, gdir) in gdirs.iter().enumerate() {
            debug!(task = task.name(), rgi_id = gdir.rgi_id(), "Running");
            if let Err(source) = task.run(gdir) {
                error!(task = task.name(), rgi_id = gdir.rgi_id(), error = %source, "Entity task failed");
                return Err(WorkflowError::EntityTask {
                    task: task.name().to_string(),
                    rgi_id: gdir.rgi_id().to_string(),
                    source,
                    other_failures: Vec::new(),
                    skipped: gdirs.len() - i - 1,
                });
            }
        }
        Ok(())
    }

    fn run_parallel(
        &self,
        pool: &rayon::ThreadPool,
        task: &dyn EntityTask,
        gdirs: &[GlacierDirectory],
    ) -> Result<()> {
        let aborted = AtomicBool::new(false);
        let skipped = AtomicUsize::new(0);

        // One glacier per work item; failures come back in input order.
        let failures: Vec<(String, anyhow::Error)> = pool.install(|| {
            gdirs
                .par_iter()
                .with_max_len(1)
                .filter_map(|gdir| {
                    if aborted.load(Ordering::Acquire) {
                        skipped.fetch_add(1, Ordering::Relaxed);
                        return None;
                    }
                    debug!(task = task.name(), rgi_id = gdir.rgi_id(), "Running");
                    match task.run(gdir) {
                        Ok(()) => None,
                        Err(e) => {
                            error!(task = task.name(), rgi_id = gdir.rgi_id(), error = %e, "Entity task failed");
                            aborted.store(true, Ordering::Release);
                            Some((gdir.rgi_id().to_string(), e))
                        }
                    }
                })
                .collect()
        });

        let mut failures = failures.into_iter();
        let Some((rgi_id, source)) = failures.next() else {
            return Ok(());
        };

        let other_failures: Vec<String> = failures.map(|(id, _)| id).collect();
        let skipped = skipped.into_inner();
        warn!(
            task = task.name(),
            failed = other_failures.len() + 1,
            skipped,
            "Aborted entity task batch"
        );

        Err(WorkflowError::EntityTask {
            task: task.name().to_string(),
            rgi_id,
            source,
            other_failures,
            skipped,
        })
    }
}

//! Task capabilities.
//!
//! An entity task works on a single glacier directory and must not share
//! mutable state with other invocations, so it can be fanned out over the
//! worker pool. A global task sees the whole collection at once and always
//! runs on the calling thread.

use glacierflow_core::GlacierDirectory;
use std::sync::Arc;

/// A processing step applied independently to one glacier.
pub trait EntityTask: Send + Sync {
    /// Task name, used for logging and error reports.
    fn name(&self) -> &str;

    /// Apply the task to one glacier directory.
    fn run(&self, gdir: &GlacierDirectory) -> anyhow::Result<()>;
}

/// A processing step applied once to a collection of glaciers.
pub trait GlobalTask: Send + Sync {
    /// Task name, used for logging and error reports.
    fn name(&self) -> &str;

    /// Apply the task to the collection.
    fn run(&self, gdirs: &[GlacierDirectory]) -> anyhow::Result<()>;
}

struct FnEntityTask<F> {
    name: String,
    f: F,
}

impl<F> EntityTask for FnEntityTask<F>
where
    F: Fn(&GlacierDirectory) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, gdir: &GlacierDirectory) -> anyhow::Result<()> {
        (self.f)(gdir)
    }
}

struct FnGlobalTask<F> {
    name: String,
    f: F,
}

impl<F> GlobalTask for FnGlobalTask<F>
where
    F: Fn(&[GlacierDirectory]) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, gdirs: &[GlacierDirectory]) -> anyhow::Result<()> {
        (self.f)(gdirs)
    }
}

/// Wrap a closure as an entity task.
pub fn entity_task<F>(name: impl Into<String>, f: F) -> Arc<dyn EntityTask>
where
    F: Fn(&GlacierDirectory) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnEntityTask { name: name.into(), f })
}

/// Wrap a closure as a global task.
pub fn global_task<F>(name: impl Into<String>, f: F) -> Arc<dyn GlobalTask>
where
    F: Fn(&[GlacierDirectory]) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnGlobalTask { name: name.into(), f })
}

/// Every task the workflow stages are built from.
#[derive(Clone)]
pub struct TaskSet {
    /// Bootstrap of a glacier directory (writes the base artifact)
    pub define_glacier_region: Arc<dyn EntityTask>,

    // Geometry
    /// Glacier masks
    pub glacier_masks: Arc<dyn EntityTask>,
    /// Centerlines
    pub compute_centerlines: Arc<dyn EntityTask>,
    /// Downstream lines
    pub compute_downstream_lines: Arc<dyn EntityTask>,
    /// Catchment areas
    pub catchment_area: Arc<dyn EntityTask>,
    /// Flowlines
    pub initialize_flowlines: Arc<dyn EntityTask>,
    /// Catchment widths from geometry
    pub catchment_width_geom: Arc<dyn EntityTask>,
    /// Catchment width correction
    pub catchment_width_correction: Arc<dyn EntityTask>,

    // Climate
    /// Climate data for all glaciers
    pub distribute_climate_data: Arc<dyn GlobalTask>,
    /// Calibration candidates on reference glaciers
    pub mu_candidates: Arc<dyn EntityTask>,
    /// Reference calibration values
    pub compute_ref_t_stars: Arc<dyn GlobalTask>,
    /// Calibration values for all glaciers
    pub distribute_t_stars: Arc<dyn GlobalTask>,

    // Inversion
    /// Inversion input preparation
    pub prepare_for_inversion: Arc<dyn EntityTask>,
    /// Shared inversion parameters
    pub optimize_inversion_params: Arc<dyn GlobalTask>,
    /// Bed topography inversion
    pub volume_inversion: Arc<dyn EntityTask>,
}

impl std::fmt::Debug for TaskSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSet")
            .field("define_glacier_region", &self.define_glacier_region.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glacierflow_core::RgiEntity;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_closure_tasks() {
        let tmp = tempfile::tempdir().unwrap();
        let gdir = GlacierDirectory::new(RgiEntity::new("A"), tmp.path(), false).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let task = entity_task("count", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(task.name(), "count");
        task.run(&gdir).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let global = global_task("size", |gdirs| {
            anyhow::ensure!(gdirs.len() == 1, "expected one glacier");
            Ok(())
        });
        assert!(global.run(std::slice::from_ref(&gdir)).is_ok());
        assert!(global.run(&[]).is_err());
    }
}

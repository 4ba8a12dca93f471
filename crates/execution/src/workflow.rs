//! Workflow facade - region setup and the processing stages.

use crate::dispatcher::TaskDispatcher;
use crate::error::{Result, WorkflowError};
use crate::reference::{filter_reference, read_reference_ids};
use crate::region::{ConsoleInteraction, RegionInitializer, UserInteraction};
use crate::stage::{Scope, Stage, StageReport, Step, StepRecord};
use crate::task::TaskSet;
use glacierflow_core::{GlacierDirectory, Params, RgiEntity, RunId};
use serde::Serialize;
use tracing::{info, info_span};

/// Outcome of a complete run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run identifier
    pub run_id: RunId,
    /// Glaciers processed, in input order
    pub glaciers: Vec<String>,
    /// Stages in execution order
    pub stages: Vec<StageReport>,
}

/// Runs the processing stages over a set of glacier directories.
pub struct Workflow {
    params: Params,
    tasks: TaskSet,
    dispatcher: TaskDispatcher,
    interaction: Box<dyn UserInteraction>,
}

impl Workflow {
    /// Create a workflow. The execution mode is fixed here for the whole run.
    pub fn new(params: Params, tasks: TaskSet) -> Result<Self> {
        let dispatcher = TaskDispatcher::from_params(&params)?;
        Ok(Self {
            params,
            tasks,
            dispatcher,
            interaction: Box::new(ConsoleInteraction::new()),
        })
    }

    /// Set how reset confirmations are answered.
    pub fn with_interaction(mut self, interaction: Box<dyn UserInteraction>) -> Self {
        self.interaction = interaction;
        self
    }

    /// Run parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Entity task dispatcher.
    pub fn dispatcher(&self) -> &TaskDispatcher {
        &self.dispatcher
    }

    /// Very first step of every run: one glacier directory per record.
    ///
    /// Set `reset` to delete the content of the directories.
    pub fn init_glacier_regions(
        &self,
        entities: &[RgiEntity],
        reset: bool,
        force: bool,
    ) -> Result<Vec<GlacierDirectory>> {
        let base_dir = self.params.per_glacier_dir();
        RegionInitializer::new(&base_dir, self.tasks.define_glacier_region.as_ref(), self.interaction.as_ref())
            .init(entities, reset, force)
    }

    /// Prepare the flowlines.
    pub fn gis_prepro_tasks(&self, gdirs: &[GlacierDirectory]) -> Result<StageReport> {
        self.run_stage(&Stage::gis_prepro(&self.tasks), gdirs)
    }

    /// Prepare the climate data.
    pub fn climate_tasks(&self, gdirs: &[GlacierDirectory]) -> Result<StageReport> {
        self.run_stage(&Stage::climate(&self.tasks), gdirs)
    }

    /// Invert the bed topography.
    pub fn inversion_tasks(&self, gdirs: &[GlacierDirectory]) -> Result<StageReport> {
        self.run_stage(&Stage::inversion(&self.tasks), gdirs)
    }

    /// Run the steps of `stage` in order, stopping at the first failure.
    pub fn run_stage(&self, stage: &Stage, gdirs: &[GlacierDirectory]) -> Result<StageReport> {
        let _span = info_span!("stage", name = %stage.name).entered();
        info!(steps = stage.steps.len(), glaciers = gdirs.len(), "Starting stage");

        // Loaded when the first reference-scoped step is reached.
        let mut reference: Option<Vec<GlacierDirectory>> = None;
        let mut records = Vec::with_capacity(stage.steps.len());

        for step in &stage.steps {
            let targets: &[GlacierDirectory] = match step.scope() {
                Scope::All => gdirs,
                Scope::Reference => {
                    if reference.is_none() {
                        reference = Some(self.reference_glaciers(gdirs)?);
                    }
                    reference.as_deref().unwrap_or_default()
                }
            };

            let started_at = chrono::Utc::now();
            match step {
                Step::Entity { task, .. } => {
                    self.dispatcher.dispatch(task.as_ref(), targets)?;
                }
                Step::Global { task, .. } => {
                    info!(task = task.name(), glaciers = targets.len(), "Running global task");
                    task.run(targets).map_err(|source| WorkflowError::GlobalTask {
                        task: task.name().to_string(),
                        source,
                    })?;
                }
            }

            records.push(StepRecord {
                task: step.task_name().to_string(),
                kind: step.kind(),
                scope: step.scope(),
                glaciers: targets.len(),
                started_at,
                finished_at: chrono::Utc::now(),
            });
        }

        let report = StageReport { stage: stage.name.clone(), steps: records };
        info!(elapsed_ms = report.duration().num_milliseconds(), "Stage done");
        Ok(report)
    }

    /// Initialize the glacier directories and run every stage.
    pub fn run_all(&self, entities: &[RgiEntity], reset: bool, force: bool) -> Result<RunReport> {
        let run_id = RunId::new();
        let _span = info_span!("run", %run_id).entered();
        info!(glaciers = entities.len(), mode = %self.dispatcher.mode(), "Starting run");

        let gdirs = self.init_glacier_regions(entities, reset, force)?;
        let stages = Stage::all(&self.tasks)
            .iter()
            .map(|stage| self.run_stage(stage, &gdirs))
            .collect::<Result<Vec<_>>>()?;

        Ok(RunReport {
            run_id,
            glaciers: gdirs.iter().map(|g| g.rgi_id().to_string()).collect(),
            stages,
        })
    }

    fn reference_glaciers(&self, gdirs: &[GlacierDirectory]) -> Result<Vec<GlacierDirectory>> {
        let path = self
            .params
            .wgms_rgi_links
            .as_deref()
            .ok_or(WorkflowError::MissingReferenceTable)?;
        let ids = read_reference_ids(path)?;
        let reference = filter_reference(gdirs, &ids);
        info!(reference = reference.len(), glaciers = gdirs.len(), "Selected reference glaciers");
        Ok(reference)
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("params", &self.params)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

//! Stage definitions - ordered lists of tagged steps.

use crate::task::{EntityTask, GlobalTask, TaskSet};
use glacierflow_core::Time;
use serde::Serialize;
use std::sync::Arc;

/// Which glaciers a step applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Every glacier of the run
    All,
    /// Glaciers listed in the reference table
    Reference,
}

/// Kind of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Dispatched per glacier
    Entity,
    /// Run once on the collection
    Global,
}

/// One step of a stage.
#[derive(Clone)]
pub enum Step {
    /// Dispatch an entity task over the scoped glaciers
    Entity {
        /// Task to dispatch
        task: Arc<dyn EntityTask>,
        /// Target glaciers
        scope: Scope,
    },
    /// Run a global task on the scoped glaciers
    Global {
        /// Task to run
        task: Arc<dyn GlobalTask>,
        /// Target glaciers
        scope: Scope,
    },
}

impl Step {
    /// Entity step over all glaciers.
    pub fn entity(task: &Arc<dyn EntityTask>) -> Self {
        Self::Entity { task: task.clone(), scope: Scope::All }
    }

    /// Global step over all glaciers.
    pub fn global(task: &Arc<dyn GlobalTask>) -> Self {
        Self::Global { task: task.clone(), scope: Scope::All }
    }

    /// Restrict the step to the reference glaciers.
    pub fn on_reference(self) -> Self {
        match self {
            Self::Entity { task, .. } => Self::Entity { task, scope: Scope::Reference },
            Self::Global { task, .. } => Self::Global { task, scope: Scope::Reference },
        }
    }

    /// Step kind.
    pub fn kind(&self) -> StepKind {
        match self {
            Self::Entity { .. } => StepKind::Entity,
            Self::Global { .. } => StepKind::Global,
        }
    }

    /// Step scope.
    pub fn scope(&self) -> Scope {
        match self {
            Self::Entity { scope, .. } | Self::Global { scope, .. } => *scope,
        }
    }

    /// Name of the task the step runs.
    pub fn task_name(&self) -> &str {
        match self {
            Self::Entity { task, .. } => task.name(),
            Self::Global { task, .. } => task.name(),
        }
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("kind", &self.kind())
            .field("task", &self.task_name())
            .field("scope", &self.scope())
            .finish()
    }
}

/// A fixed, ordered sequence of steps.
///
/// Each step may rely on artifacts written by the steps before it, so a step
/// only starts once the previous one has completed for every glacier.
#[derive(Debug, Clone)]
pub struct Stage {
    /// Stage name
    pub name: String,
    /// Steps in execution order
    pub steps: Vec<Step>,
}

impl Stage {
    /// Create a stage.
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self { name: name.into(), steps }
    }

    /// Flowline preparation.
    pub fn gis_prepro(tasks: &TaskSet) -> Self {
        Self::new(
            "gis_prepro",
            vec![
                Step::entity(&tasks.glacier_masks),
                Step::entity(&tasks.compute_centerlines),
                Step::entity(&tasks.compute_downstream_lines),
                Step::entity(&tasks.catchment_area),
                Step::entity(&tasks.initialize_flowlines),
                Step::entity(&tasks.catchment_width_geom),
                Step::entity(&tasks.catchment_width_correction),
            ],
        )
    }

    /// Climate data and mass-balance calibration.
    pub fn climate(tasks: &TaskSet) -> Self {
        Self::new(
            "climate",
            vec![
                Step::global(&tasks.distribute_climate_data),
                Step::entity(&tasks.mu_candidates).on_reference(),
                Step::global(&tasks.compute_ref_t_stars).on_reference(),
                Step::global(&tasks.distribute_t_stars),
            ],
        )
    }

    /// Bed topography inversion.
    pub fn inversion(tasks: &TaskSet) -> Self {
        Self::new(
            "inversion",
            vec![
                Step::entity(&tasks.prepare_for_inversion),
                Step::global(&tasks.optimize_inversion_params),
                Step::entity(&tasks.volume_inversion),
            ],
        )
    }

    /// The three processing stages, in run order.
    pub fn all(tasks: &TaskSet) -> Vec<Self> {
        vec![Self::gis_prepro(tasks), Self::climate(tasks), Self::inversion(tasks)]
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}:", self.name)?;
        for (i, step) in self.steps.iter().enumerate() {
            let kind = match step.kind() {
                StepKind::Entity => "entity",
                StepKind::Global => "global",
            };
            let scope = match step.scope() {
                Scope::All => "all",
                Scope::Reference => "reference",
            };
            writeln!(f, "  {}. [{}] {} ({})", i + 1, kind, step.task_name(), scope)?;
        }
        Ok(())
    }
}

/// What one step did.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Task name
    pub task: String,
    /// Step kind
    pub kind: StepKind,
    /// Step scope
    pub scope: Scope,
    /// Number of glaciers the step was applied to
    pub glaciers: usize,
    /// When the step started
    pub started_at: Time,
    /// When the step finished
    pub finished_at: Time,
}

/// What a completed stage did.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// Stage name
    pub stage: String,
    /// Steps in execution order
    pub steps: Vec<StepRecord>,
}

impl StageReport {
    /// Total duration of the stage.
    pub fn duration(&self) -> chrono::Duration {
        match (self.steps.first(), self.steps.last()) {
            (Some(first), Some(last)) => last.finished_at - first.started_at,
            _ => chrono::Duration::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn names(stage: &Stage) -> Vec<&str> {
        stage.steps.iter().map(Step::task_name).collect()
    }

    #[test]
    fn test_gis_prepro_order() {
        let stage = Stage::gis_prepro(&TaskSet::stamped(Path::new("wd")));
        assert_eq!(
            names(&stage),
            vec![
                "glacier_masks",
                "compute_centerlines",
                "compute_downstream_lines",
                "catchment_area",
                "initialize_flowlines",
                "catchment_width_geom",
                "catchment_width_correction",
            ]
        );
        assert!(stage.steps.iter().all(|s| s.kind() == StepKind::Entity && s.scope() == Scope::All));
    }

    #[test]
    fn test_climate_scopes() {
        let stage = Stage::climate(&TaskSet::stamped(Path::new("wd")));
        let layout: Vec<_> = stage.steps.iter().map(|s| (s.task_name(), s.kind(), s.scope())).collect();
        assert_eq!(
            layout,
            vec![
                ("distribute_climate_data", StepKind::Global, Scope::All),
                ("mu_candidates", StepKind::Entity, Scope::Reference),
                ("compute_ref_t_stars", StepKind::Global, Scope::Reference),
                ("distribute_t_stars", StepKind::Global, Scope::All),
            ]
        );
    }

    #[test]
    fn test_display() {
        let stage = Stage::inversion(&TaskSet::stamped(Path::new("wd")));
        let text = stage.to_string();
        assert!(text.starts_with("inversion:\n"));
        assert!(text.contains("  2. [global] optimize_inversion_params (all)"));
        assert_eq!(Stage::all(&TaskSet::stamped(Path::new("wd"))).len(), 3);
    }
}

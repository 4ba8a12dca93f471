//! Execution layer - worker pool, task dispatch, region setup and stages.

#![warn(missing_docs)]

pub mod error;
pub mod task;
pub mod pool;
pub mod dispatcher;
pub mod region;
pub mod reference;
pub mod stage;
pub mod stamp;
pub mod workflow;

pub use error::{WorkflowError, Result};
pub use task::{EntityTask, GlobalTask, TaskSet, entity_task, global_task};
pub use pool::WorkerPool;
pub use dispatcher::{TaskDispatcher, DispatchReport};
pub use region::{RegionInitializer, UserInteraction, ConsoleInteraction, FixedAnswer};
pub use reference::{read_reference_ids, filter_reference, REFERENCE_ID_COLUMN};
pub use stage::{Stage, Step, StepKind, Scope, StageReport, StepRecord};
pub use stamp::{Stamp, EntityStamp, GlobalStamp};
pub use workflow::{Workflow, RunReport};

//! Glacier directory bootstrap.

use crate::error::{Result, WorkflowError};
use crate::task::EntityTask;
use glacierflow_core::{GlacierDirectory, RgiEntity, BASE_ARTIFACT};
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Trait for user interaction (prompts, confirmation).
pub trait UserInteraction: Send + Sync {
    /// Prompt for yes/no confirmation.
    fn confirm(&self, message: &str) -> bool;
}

/// Asks on the terminal, unless told to assume yes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleInteraction {
    assume_yes: bool,
}

impl ConsoleInteraction {
    /// Prompt on stderr and read the answer from stdin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer yes without prompting (`--yes`).
    pub fn assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }
}

/// Only an explicit `y` or `yes` counts as consent.
fn parse_answer(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

impl UserInteraction for ConsoleInteraction {
    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            info!(prompt = message, "Confirmed by --yes");
            return true;
        }

        // stdout may carry command output, keep the prompt apart.
        eprint!("{} [y/N]: ", message);
        io::stderr().flush().ok();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => parse_answer(&answer),
            Err(e) => {
                warn!(error = %e, "Could not read confirmation, assuming no");
                false
            }
        }
    }
}

/// Answers every prompt the same way, for non-interactive runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl UserInteraction for FixedAnswer {
    fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

/// Creates one glacier directory per input record.
pub struct RegionInitializer<'a> {
    base_dir: &'a Path,
    define_region: &'a dyn EntityTask,
    interaction: &'a dyn UserInteraction,
}

impl<'a> RegionInitializer<'a> {
    /// Create an initializer writing under `base_dir`.
    pub fn new(
        base_dir: &'a Path,
        define_region: &'a dyn EntityTask,
        interaction: &'a dyn UserInteraction,
    ) -> Self {
        Self { base_dir, define_region, interaction }
    }

    /// Open (or create) the directory of every record, in input order.
    ///
    /// The define-region task runs, on the calling thread, for every glacier
    /// whose base artifact is missing. A `reset` without `force` asks for
    /// confirmation once for the whole batch; declining keeps existing data.
    /// Duplicate identifiers are rejected before anything is touched.
    pub fn init(&self, entities: &[RgiEntity], reset: bool, force: bool) -> Result<Vec<GlacierDirectory>> {
        // Two records on one directory would let two workers share it.
        let mut seen = HashSet::with_capacity(entities.len());
        if let Some(dup) = entities.iter().find(|e| !seen.insert(e.rgi_id.as_str())) {
            return Err(WorkflowError::Region {
                rgi_id: dup.rgi_id.clone(),
                source: anyhow::anyhow!("duplicate glacier id {:?} in input records", dup.rgi_id),
            });
        }

        let mut reset = reset;
        if reset && !force {
            reset = self.interaction.confirm("Delete all glacier directories?");
            if !reset {
                warn!("Reset declined, keeping existing glacier directories");
            }
        }

        let mut gdirs = Vec::with_capacity(entities.len());
        let mut defined = 0usize;

        for entity in entities {
            let gdir = GlacierDirectory::new(entity.clone(), self.base_dir, reset).map_err(|e| {
                WorkflowError::Region { rgi_id: entity.rgi_id.clone(), source: e.into() }
            })?;

            if gdir.has_file(BASE_ARTIFACT) {
                debug!(rgi_id = gdir.rgi_id(), "Reusing glacier directory");
            } else {
                debug!(rgi_id = gdir.rgi_id(), task = self.define_region.name(), "Defining glacier region");
                self.define_region.run(&gdir).map_err(|source| WorkflowError::Region {
                    rgi_id: entity.rgi_id.clone(),
                    source,
                })?;
                defined += 1;
            }
            gdirs.push(gdir);
        }

        info!(
            glaciers = gdirs.len(),
            defined,
            reused = gdirs.len() - defined,
            reset,
            "Initialized glacier directories"
        );
        Ok(gdirs)
    }
}

//! Stamp tasks - placeholders that only record what ran where.
//!
//! Each stamp checks that the artifacts it depends on exist, then writes an
//! artifact named after itself. Running the stages with stamps exercises the
//! whole workflow and its ordering without any glaciological computation.

use crate::task::{EntityTask, GlobalTask, TaskSet};
use anyhow::Context;
use glacierflow_core::{GlacierDirectory, BASE_ARTIFACT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Content of a stamp artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamp {
    /// Task that wrote the stamp
    pub task: String,
    /// Glacier(s) the task ran on
    pub glaciers: Vec<String>,
    /// Artifacts the task required
    pub inputs: Vec<String>,
}

fn require(gdir: &GlacierDirectory, task: &str, inputs: &[&str]) -> anyhow::Result<()> {
    for input in inputs {
        anyhow::ensure!(
            gdir.has_file(input),
            "{} needs `{}` in {} which does not exist",
            task,
            input,
            gdir.rgi_id()
        );
    }
    Ok(())
}

/// Entity stamp writing an artifact named after the task.
pub struct EntityStamp {
    name: &'static str,
    requires: &'static [&'static str],
    writes: &'static [&'static str],
}

impl EntityStamp {
    /// Stamp `name` requiring the `requires` artifacts.
    pub fn new(name: &'static str, requires: &'static [&'static str]) -> Self {
        Self { name, requires, writes: &[] }
    }

    /// Also write these artifacts.
    pub fn writing(mut self, writes: &'static [&'static str]) -> Self {
        self.writes = writes;
        self
    }

    fn stamp(&self, gdir: &GlacierDirectory) -> Stamp {
        Stamp {
            task: self.name.to_string(),
            glaciers: vec![gdir.rgi_id().to_string()],
            inputs: self.requires.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl EntityTask for EntityStamp {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, gdir: &GlacierDirectory) -> anyhow::Result<()> {
        require(gdir, self.name, self.requires)?;
        let stamp = self.stamp(gdir);
        for artifact in self.writes.iter().chain(std::iter::once(&self.name)) {
            gdir.write_json(artifact, &stamp)?;
        }
        Ok(())
    }
}

/// Global stamp writing a summary to the working directory.
pub struct GlobalStamp {
    name: &'static str,
    output_dir: PathBuf,
    requires: &'static [&'static str],
    per_glacier: Option<&'static str>,
}

impl GlobalStamp {
    /// Stamp `name` writing its summary under `output_dir`.
    pub fn new(name: &'static str, output_dir: impl Into<PathBuf>, requires: &'static [&'static str]) -> Self {
        Self { name, output_dir: output_dir.into(), requires, per_glacier: None }
    }

    /// Also write `artifact` into every glacier directory.
    pub fn distributing(mut self, artifact: &'static str) -> Self {
        self.per_glacier = Some(artifact);
        self
    }

    /// Where the summary is written.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", self.name))
    }
}

impl GlobalTask for GlobalStamp {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, gdirs: &[GlacierDirectory]) -> anyhow::Result<()> {
        for gdir in gdirs {
            require(gdir, self.name, self.requires)?;
        }

        let stamp = Stamp {
            task: self.name.to_string(),
            glaciers: gdirs.iter().map(|g| g.rgi_id().to_string()).collect(),
            inputs: self.requires.iter().map(|s| s.to_string()).collect(),
        };

        if let Some(artifact) = self.per_glacier {
            for gdir in gdirs {
                gdir.write_json(artifact, &stamp)?;
            }
        }

        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("creating {}", self.output_dir.display()))?;
        let path = self.output_path();
        std::fs::write(&path, serde_json::to_string_pretty(&stamp)?)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

impl TaskSet {
    /// Task set made of stamps, global summaries go to `working_dir`.
    pub fn stamped(working_dir: &Path) -> Self {
        let entity = |stamp: EntityStamp| -> Arc<dyn EntityTask> { Arc::new(stamp) };
        let global = |stamp: GlobalStamp| -> Arc<dyn GlobalTask> { Arc::new(stamp) };

        Self {
            define_glacier_region: entity(
                EntityStamp::new("define_glacier_region", &[]).writing(&["outlines", BASE_ARTIFACT]),
            ),
            glacier_masks: entity(EntityStamp::new("glacier_masks", &[BASE_ARTIFACT, "outlines"])),
            compute_centerlines: entity(EntityStamp::new("compute_centerlines", &["glacier_masks"])),
            compute_downstream_lines: entity(EntityStamp::new("compute_downstream_lines", &["compute_centerlines"])),
            catchment_area: entity(EntityStamp::new("catchment_area", &["compute_downstream_lines"])),
            initialize_flowlines: entity(EntityStamp::new("initialize_flowlines", &["catchment_area"])),
            catchment_width_geom: entity(EntityStamp::new("catchment_width_geom", &["initialize_flowlines"])),
            catchment_width_correction: entity(EntityStamp::new(
                "catchment_width_correction",
                &["catchment_width_geom"],
            )),
            distribute_climate_data: global(
                GlobalStamp::new("distribute_climate_data", working_dir, &[BASE_ARTIFACT])
                    .distributing("climate_monthly"),
            ),
            mu_candidates: entity(EntityStamp::new("mu_candidates", &["climate_monthly", "initialize_flowlines"])),
            compute_ref_t_stars: global(GlobalStamp::new("compute_ref_t_stars", working_dir, &["mu_candidates"])),
            distribute_t_stars: global(
                GlobalStamp::new("distribute_t_stars", working_dir, &["climate_monthly"]).distributing("local_mustar"),
            ),
            prepare_for_inversion: entity(EntityStamp::new(
                "prepare_for_inversion",
                &["local_mustar", "catchment_width_correction"],
            )),
            optimize_inversion_params: global(
                GlobalStamp::new("optimize_inversion_params", working_dir, &["prepare_for_inversion"])
                    .distributing("inversion_params"),
            ),
            volume_inversion: entity(EntityStamp::new("volume_inversion", &["inversion_params"])),
        }
    }
}

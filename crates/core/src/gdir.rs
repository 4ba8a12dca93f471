//! Glacier directory - the persisted working context of one glacier.
//!
//! Every task reads and writes its artifacts inside the directory of the
//! glacier it is applied to. Directories live for the whole run; they are only
//! wiped when created with `reset`.

use crate::entity::{validate_rgi_id, RgiEntity};
use crate::error::{GdirError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Artifact whose presence means the region has already been defined.
pub const BASE_ARTIFACT: &str = "dem";

/// Logical artifact names with a fixed file name.
const BASENAMES: &[(&str, &str)] = &[
    ("dem", "dem.tif"),
    ("outlines", "outlines.json"),
    ("glacier_grid", "glacier_grid.json"),
    ("climate_monthly", "climate_monthly.nc"),
    ("inversion_params", "inversion_params.json"),
];

/// Handle on the directory of one glacier.
#[derive(Debug, Clone)]
pub struct GlacierDirectory {
    entity: RgiEntity,
    dir: PathBuf,
}

impl GlacierDirectory {
    /// Open the directory of `entity` under `base_dir`, creating it if needed.
    ///
    /// With `reset`, any existing content is deleted first.
    pub fn new(entity: RgiEntity, base_dir: impl AsRef<Path>, reset: bool) -> Result<Self> {
        validate_rgi_id(&entity.rgi_id)?;
        let dir = base_dir.as_ref().join(&entity.rgi_id);

        if reset && dir.exists() {
            debug!(rgi_id = %entity.rgi_id, dir = %dir.display(), "Resetting glacier directory");
            std::fs::remove_dir_all(&dir).map_err(|e| GdirError::io(&dir, e))?;
        }
        std::fs::create_dir_all(&dir).map_err(|e| GdirError::io(&dir, e))?;

        Ok(Self { entity, dir })
    }

    /// Open the directory of `entity` only if it already exists.
    pub fn open_existing(entity: RgiEntity, base_dir: impl AsRef<Path>) -> Result<Option<Self>> {
        validate_rgi_id(&entity.rgi_id)?;
        let dir = base_dir.as_ref().join(&entity.rgi_id);
        Ok(dir.is_dir().then(|| Self { entity, dir }))
    }

    /// Glacier identifier.
    pub fn rgi_id(&self) -> &str {
        &self.entity.rgi_id
    }

    /// The record this directory was created from.
    pub fn entity(&self) -> &RgiEntity {
        &self.entity
    }

    /// Root of the directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a named artifact.
    pub fn get_filepath(&self, name: &str) -> PathBuf {
        let basename = BASENAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, f)| f.to_string())
            .unwrap_or_else(|| format!("{}.json", name));
        self.dir.join(basename)
    }

    /// Whether a named artifact exists.
    pub fn has_file(&self, name: &str) -> bool {
        self.get_filepath(name).exists()
    }

    /// Write a named artifact as pretty JSON.
    pub fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.get_filepath(name);
        let json = serde_json::to_string_pretty(value).map_err(|e| GdirError::json(&path, e))?;
        std::fs::write(&path, json.as_bytes()).map_err(|e| GdirError::io(&path, e))
    }

    /// Read a named artifact. A missing file is `Ok(None)`.
    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.get_filepath(name);
        match std::fs::read_to_string(&path) {
            Ok(json) => {
                let value = serde_json::from_str(&json).map_err(|e| GdirError::json(&path, e))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GdirError::io(path, e)),
        }
    }

    /// Delete a named artifact. Missing files are ignored.
    pub fn remove_file(&self, name: &str) -> Result<()> {
        let path = self.get_filepath(name);
        std::fs::remove_file(&path).or_else(|e| {
            if e.kind() == std::io::ErrorKind::NotFound { Ok(()) } else { Err(GdirError::io(&path, e)) }
        })
    }
}

impl std::fmt::Display for GlacierDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.entity.name {
            Some(name) => write!(f, "{} ({})", self.entity.rgi_id, name),
            None => f.write_str(&self.entity.rgi_id),
        }
    }
}

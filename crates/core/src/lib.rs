//! glacierflow core data models.
//!
//! This crate defines the input records, the per-glacier directory handle and
//! the run configuration consumed by the execution engine.

#![warn(missing_docs)]

mod id;
mod error;
mod entity;
mod gdir;
mod config;

pub use id::RunId;
pub use error::{GdirError, Result};
pub use entity::{RgiEntity, validate_rgi_id};
pub use gdir::{GlacierDirectory, BASE_ARTIFACT};
pub use config::{Params, ExecutionMode};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

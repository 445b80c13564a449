//! Consist discovery and resolution.
//!
//! A consist names an ordered (possibly randomised) formation of vehicles. This crate finds
//! consist files in a content tree, parses both the native `.consist-or` and the legacy `.con`
//! formats, and turns a consist into the concrete list of [`VehicleReference`]s a simulator
//! should load, honouring an optional preferred lead locomotive.

mod files;
mod legacy;
mod model;
mod preference;
mod resolver;

use std::path::PathBuf;

use thiserror::Error;

pub use files::{
    CONSIST_OR_EXTENSION, LEGACY_EXTENSION, all_consist_files, load_consist, resolve_consist_file,
};
pub use model::{Consist, ConsistEntry, Formation, Slot, VehicleReference, WeightedEntry};
pub use preference::{PreferenceKey, normalize_path};
pub use resolver::{ContentFolders, forward_list, lead_choices, reverse_list};

/// Errors raised while locating, parsing, or resolving consists.
#[derive(Debug, Error)]
pub enum ConsistError {
    #[error("consist file not found: {0}")]
    MissingFile(PathBuf),
    #[error("consist directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("content folder '{0}' is not known")]
    UnknownFolder(String),
    #[error("failed to read consist: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse consist JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed legacy consist {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("random slot {slot} has a non-positive or non-finite weight")]
    InvalidWeight { slot: usize },
    #[error("UiD {0} is used by more than one entry")]
    DuplicateUid(u32),
    #[error("consist defines neither a list nor a random formation")]
    EmptyFormation,
}

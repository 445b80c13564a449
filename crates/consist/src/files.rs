//! Consist file discovery and the native JSON format.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::model::{Consist, ConsistEntry, Formation, Slot, WeightedEntry};
use crate::preference::normalize_path;
use crate::{ConsistError, legacy};

/// Extension of native consist files.
pub const CONSIST_OR_EXTENSION: &str = "consist-or";
/// Extension of legacy consist files.
pub const LEGACY_EXTENSION: &str = "con";

/// Locate a consist by name, preferring the native format when both exist.
pub fn resolve_consist_file<P: AsRef<Path>>(base_path: P, name: &str) -> PathBuf {
    let base_file = base_path
        .as_ref()
        .join("trains")
        .join("consists")
        .join(name);
    let native = base_file.with_extension(CONSIST_OR_EXTENSION);
    if native.is_file() {
        debug!("resolved consist '{name}' to {}", native.display());
        native
    } else {
        base_file.with_extension(LEGACY_EXTENSION)
    }
}

/// Enumerate every consist in `dir`. Native files shadow legacy ones sharing a base name
/// (compared case-insensitively); the result holds absolute paths in lexicographic order.
pub fn all_consist_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, ConsistError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(ConsistError::MissingDirectory(dir.to_path_buf()));
    }

    // lowercased base name -> (original base name, native?)
    let mut names: BTreeMap<String, (String, bool)> = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let native = if ext.eq_ignore_ascii_case(CONSIST_OR_EXTENSION) {
            true
        } else if ext.eq_ignore_ascii_case(LEGACY_EXTENSION) {
            false
        } else {
            continue;
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let slot = names
            .entry(stem.to_lowercase())
            .or_insert_with(|| (stem.to_string(), native));
        if native && !slot.1 {
            *slot = (stem.to_string(), true);
        }
    }

    let mut consists: Vec<PathBuf> = names
        .into_values()
        .map(|(stem, native)| {
            let ext = if native {
                CONSIST_OR_EXTENSION
            } else {
                LEGACY_EXTENSION
            };
            normalize_path(dir.join(format!("{stem}.{ext}")))
        })
        .collect();
    consists.sort();
    Ok(consists)
}

/// Load and validate a consist from either file format.
pub fn load_consist<P: AsRef<Path>>(path: P) -> Result<Consist, ConsistError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ConsistError::MissingFile(path.to_path_buf()));
    }
    let is_native = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(CONSIST_OR_EXTENSION));

    let consist = if is_native {
        let contents = std::fs::read_to_string(path)?;
        let file: ConsistFile = serde_json::from_str(&contents)?;
        file.into_consist(path)?
    } else {
        let bytes = std::fs::read(path)?;
        legacy::parse(path, &bytes)?
    };
    consist.validate()?;
    debug!(
        "loaded consist '{}' from {}",
        consist.display_name,
        path.display()
    );
    Ok(consist)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsistFile {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    max_velocity: Option<f64>,
    #[serde(default)]
    durability: Option<f64>,
    #[serde(default)]
    player_drivable: Option<bool>,
    #[serde(default)]
    list: Option<Vec<EntryDef>>,
    #[serde(default)]
    random: Option<Vec<SlotDef>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EntryDef {
    wagon: String,
    #[serde(default)]
    flip: bool,
    #[serde(default, rename = "UiD")]
    uid: Option<u32>,
    #[serde(default)]
    count: Option<u32>,
    #[serde(default)]
    folder: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WeightedDef {
    weight: f64,
    #[serde(flatten)]
    entry: EntryDef,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SlotDef {
    Choice {
        #[serde(rename = "Choice")]
        choice: Vec<WeightedDef>,
    },
    Fixed(EntryDef),
}

impl From<EntryDef> for ConsistEntry {
    fn from(def: EntryDef) -> Self {
        ConsistEntry {
            vehicle: def.wagon,
            flipped: def.flip,
            uid: def.uid,
            count: def.count.unwrap_or(1).max(1),
            folder: def.folder,
        }
    }
}

impl ConsistFile {
    fn into_consist(self, path: &Path) -> Result<Consist, ConsistError> {
        let formation = match (self.list, self.random) {
            (Some(list), _) => Formation::List(list.into_iter().map(Into::into).collect()),
            (None, Some(slots)) => Formation::Random(
                slots
                    .into_iter()
                    .map(|slot| match slot {
                        SlotDef::Fixed(entry) => Slot::Fixed(entry.into()),
                        SlotDef::Choice { choice } => Slot::Choice(
                            choice
                                .into_iter()
                                .map(|opt| WeightedEntry {
                                    weight: opt.weight,
                                    entry: opt.entry.into(),
                                })
                                .collect(),
                        ),
                    })
                    .collect(),
            ),
            (None, None) => return Err(ConsistError::EmptyFormation),
        };

        let display_name = self.display_name.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string()
        });

        Ok(Consist {
            display_name,
            max_velocity_mps: self.max_velocity,
            durability: self.durability.unwrap_or(1.0),
            player_drivable: self.player_drivable.unwrap_or(true),
            formation,
        })
    }
}

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::ConsistError;

/// An engine or wagon reference for loading by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleReference {
    pub path: PathBuf,
    pub flipped: bool,
    pub uid: u32,
}

impl VehicleReference {
    /// Engines (`.eng`) can lead a train; everything else is a wagon.
    pub fn is_locomotive(&self) -> bool {
        is_locomotive_path(&self.path)
    }
}

pub(crate) fn is_locomotive_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("eng"))
}

/// One vehicle line of a consist definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistEntry {
    /// Vehicle file relative to `trains/trainset`, e.g. `Dash9/dash9.eng`.
    pub vehicle: String,
    pub flipped: bool,
    pub uid: Option<u32>,
    /// Number of consecutive copies; at least one.
    pub count: u32,
    /// Key into the content folder map; `None` means the base content path.
    pub folder: Option<String>,
}

impl ConsistEntry {
    pub fn new(vehicle: impl Into<String>) -> Self {
        Self {
            vehicle: vehicle.into(),
            flipped: false,
            uid: None,
            count: 1,
            folder: None,
        }
    }

    pub fn flipped(mut self, flipped: bool) -> Self {
        self.flipped = flipped;
        self
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count.max(1);
        self
    }

    pub fn in_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }
}

/// Candidate for a random slot.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedEntry {
    pub weight: f64,
    pub entry: ConsistEntry,
}

/// A position in a random formation.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Fixed(ConsistEntry),
    Choice(Vec<WeightedEntry>),
}

/// The composition of a consist.
#[derive(Debug, Clone, PartialEq)]
pub enum Formation {
    /// Literal head-to-tail list.
    List(Vec<ConsistEntry>),
    /// Slots rolled independently from an explicit seed.
    Random(Vec<Slot>),
}

/// A generic consist of wagons and engines. Its composition may be nondeterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Consist {
    pub display_name: String,
    pub max_velocity_mps: Option<f64>,
    pub durability: f64,
    pub player_drivable: bool,
    pub formation: Formation,
}

impl Consist {
    pub fn from_list(display_name: impl Into<String>, entries: Vec<ConsistEntry>) -> Self {
        Self {
            display_name: display_name.into(),
            max_velocity_mps: None,
            durability: 1.0,
            player_drivable: true,
            formation: Formation::List(entries),
        }
    }

    pub fn from_slots(display_name: impl Into<String>, slots: Vec<Slot>) -> Self {
        Self {
            formation: Formation::Random(slots),
            ..Self::from_list(display_name, Vec::new())
        }
    }

    /// Check weights and explicit UiDs. Options within one random slot may share a UiD since
    /// only one of them is ever rolled.
    pub fn validate(&self) -> Result<(), ConsistError> {
        let mut seen = BTreeSet::new();
        let mut claim = |uids: BTreeSet<u32>| -> Result<(), ConsistError> {
            for uid in uids {
                if !seen.insert(uid) {
                    return Err(ConsistError::DuplicateUid(uid));
                }
            }
            Ok(())
        };

        match &self.formation {
            Formation::List(entries) => {
                for entry in entries {
                    claim(entry.uid.into_iter().collect())?;
                }
            }
            Formation::Random(slots) => {
                for (index, slot) in slots.iter().enumerate() {
                    match slot {
                        Slot::Fixed(entry) => claim(entry.uid.into_iter().collect())?,
                        Slot::Choice(options) => {
                            if options.is_empty()
                                || options
                                    .iter()
                                    .any(|opt| !(opt.weight.is_finite() && opt.weight > 0.0))
                            {
                                return Err(ConsistError::InvalidWeight { slot: index });
                            }
                            claim(options.iter().filter_map(|opt| opt.entry.uid).collect())?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

//! Turning a [`Consist`] into concrete vehicle lists.
//!
//! Random slots are rolled from a `ChaCha8Rng` seeded with the caller's seed, one stream per
//! slot, so a given seed always rolls the same vehicle in a slot regardless of the direction
//! the formation is walked in. A lead-locomotive preference constrains the roll: until a lead
//! has been fixed, a locomotive option is only admissible when it is the preferred one, and a
//! wagon option is only admissible when the preference can still be met further along.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand_chacha::ChaCha8Rng;

use crate::ConsistError;
use crate::model::{
    Consist, ConsistEntry, Formation, Slot, VehicleReference, is_locomotive_path,
};
use crate::preference::{PreferenceKey, normalize_path};

/// Alternate content directories addressable from consist entries by key.
pub type ContentFolders = BTreeMap<String, PathBuf>;

struct Candidate<'a> {
    weight: f64,
    entry: &'a ConsistEntry,
    path: PathBuf,
    lead_key: Option<PreferenceKey>,
}

impl<'a> Candidate<'a> {
    fn resolve(
        weight: f64,
        entry: &'a ConsistEntry,
        base_path: &Path,
        folders: &ContentFolders,
    ) -> Result<Self, ConsistError> {
        let content = match &entry.folder {
            None => base_path,
            Some(key) => folders
                .get(key)
                .map(PathBuf::as_path)
                .ok_or_else(|| ConsistError::UnknownFolder(key.clone()))?,
        };
        let path = normalize_path(content.join("trains").join("trainset").join(&entry.vehicle));
        let lead_key = is_locomotive_path(&path).then(|| PreferenceKey::Locomotive(path.clone()));
        Ok(Self {
            weight,
            entry,
            path,
            lead_key,
        })
    }
}

/// Slots of a consist with every vehicle path resolved against the content folders.
struct ResolvedSlots<'a> {
    slots: Vec<Vec<Candidate<'a>>>,
}

impl<'a> ResolvedSlots<'a> {
    fn new(
        consist: &'a Consist,
        base_path: &Path,
        folders: &ContentFolders,
    ) -> Result<Self, ConsistError> {
        consist.validate()?;
        let resolve = |weight, entry| Candidate::resolve(weight, entry, base_path, folders);

        let slots = match &consist.formation {
            Formation::List(entries) => entries
                .iter()
                .map(|entry| resolve(1.0, entry).map(|c| vec![c]))
                .collect::<Result<Vec<_>, _>>()?,
            Formation::Random(slots) => slots
                .iter()
                .map(|slot| match slot {
                    Slot::Fixed(entry) => resolve(1.0, entry).map(|c| vec![c]),
                    Slot::Choice(options) => options
                        .iter()
                        .map(|opt| resolve(opt.weight, &opt.entry))
                        .collect(),
                })
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(Self { slots })
    }

    /// Slot indices in the order a lead locomotive is searched for.
    fn walk_order(&self, reverse: bool) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.slots.len()).collect();
        if reverse {
            order.reverse();
        }
        order
    }

    /// `reachable[k]` holds every lead obtainable from the `k`-th walked slot onwards;
    /// `NoLocomotive` stands for rolls that contain no locomotive past that point.
    fn reachable_leads(&self, order: &[usize]) -> Vec<BTreeSet<PreferenceKey>> {
        let mut reachable = vec![BTreeSet::new(); order.len() + 1];
        reachable[order.len()] = PreferenceKey::no_locomotive_set();
        for k in (0..order.len()).rev() {
            let mut leads = BTreeSet::new();
            for candidate in &self.slots[order[k]] {
                match &candidate.lead_key {
                    Some(key) => {
                        leads.insert(key.clone());
                    }
                    None => leads.extend(reachable[k + 1].iter().cloned()),
                }
            }
            reachable[k] = leads;
        }
        reachable
    }

    /// Pick one candidate per slot, or `None` when the preference cannot be met.
    fn roll(
        &self,
        reverse: bool,
        preference: Option<&PreferenceKey>,
        seed: u64,
    ) -> Option<Vec<usize>> {
        let order = self.walk_order(reverse);
        let reachable = self.reachable_leads(&order);
        if !preference_feasible(&reachable[0], preference) {
            return None;
        }

        let mut wanted = preference.filter(|key| matches!(key, PreferenceKey::Locomotive(_)));
        let mut picks = vec![0; self.slots.len()];
        for (k, &slot_index) in order.iter().enumerate() {
            let candidates = &self.slots[slot_index];
            let admissible: Vec<usize> = candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| match (wanted, &c.lead_key) {
                    (None, _) => true,
                    (Some(want), Some(key)) => key == want,
                    (Some(want), None) => reachable[k + 1].contains(want),
                })
                .map(|(i, _)| i)
                .collect();

            let pick = match admissible.as_slice() {
                [] => return None,
                [only] => *only,
                many => {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    rng.set_stream(slot_index as u64);
                    let weights = many.iter().map(|&i| candidates[i].weight);
                    let dist = WeightedIndex::new(weights).ok()?;
                    many[dist.sample(&mut rng)]
                }
            };
            if candidates[pick].lead_key.is_some() {
                wanted = None;
            }
            picks[slot_index] = pick;
        }
        Some(picks)
    }

    /// Expand picks into head-to-tail references, assigning UiDs where none are given.
    fn references(&self, picks: &[usize]) -> Vec<VehicleReference> {
        let chosen: Vec<&Candidate<'_>> = self
            .slots
            .iter()
            .zip(picks)
            .map(|(slot, &pick)| &slot[pick])
            .collect();

        let mut used: BTreeSet<u32> = chosen.iter().filter_map(|c| c.entry.uid).collect();
        let mut next_uid = 0u32;
        let mut allocate = || {
            while used.contains(&next_uid) {
                next_uid += 1;
            }
            used.insert(next_uid);
            next_uid
        };

        let mut refs = Vec::new();
        for candidate in chosen {
            for copy in 0..candidate.entry.count.max(1) {
                let uid = match candidate.entry.uid {
                    Some(uid) if copy == 0 => uid,
                    _ => allocate(),
                };
                refs.push(VehicleReference {
                    path: candidate.path.clone(),
                    flipped: candidate.entry.flipped,
                    uid,
                });
            }
        }
        refs
    }
}

fn preference_feasible(
    choices: &BTreeSet<PreferenceKey>,
    preference: Option<&PreferenceKey>,
) -> bool {
    match preference {
        None => true,
        Some(PreferenceKey::NoLocomotive) => {
            choices.len() == 1 && choices.contains(&PreferenceKey::NoLocomotive)
        }
        Some(key) => choices.contains(key),
    }
}

/// Obtain the vehicles of `consist` head to tail, each with its own flip flag.
///
/// Returns an empty list when `preference` is set and no lead choice satisfies it.
pub fn forward_list(
    consist: &Consist,
    base_path: &Path,
    folders: &ContentFolders,
    preference: Option<&PreferenceKey>,
    seed: u64,
) -> Result<Vec<VehicleReference>, ConsistError> {
    let resolved = ResolvedSlots::new(consist, base_path, folders)?;
    match resolved.roll(false, preference, seed) {
        Some(picks) => {
            let refs = resolved.references(&picks);
            debug!(
                "consist '{}' resolved to {} vehicles",
                consist.display_name,
                refs.len()
            );
            Ok(refs)
        }
        None => {
            warn!(
                "consist '{}' cannot be formed with lead {:?}",
                consist.display_name, preference
            );
            Ok(Vec::new())
        }
    }
}

/// Obtain the vehicles of `consist` tail to head with every flip flag inverted.
///
/// The preference applies to the lead of the reversed train. UiDs match the ones the same
/// roll would carry in forward order.
pub fn reverse_list(
    consist: &Consist,
    base_path: &Path,
    folders: &ContentFolders,
    preference: Option<&PreferenceKey>,
    seed: u64,
) -> Result<Vec<VehicleReference>, ConsistError> {
    let resolved = ResolvedSlots::new(consist, base_path, folders)?;
    let Some(picks) = resolved.roll(true, preference, seed) else {
        warn!(
            "reversed consist '{}' cannot be formed with lead {:?}",
            consist.display_name, preference
        );
        return Ok(Vec::new());
    };
    Ok(resolved
        .references(&picks)
        .into_iter()
        .rev()
        .map(|r| VehicleReference {
            flipped: !r.flipped,
            ..r
        })
        .collect())
}

/// Head-end locomotives this consist can spawn with, forward or reversed.
///
/// Consists without locomotives yield `{NoLocomotive}`; the set is never empty.
pub fn lead_choices(
    consist: &Consist,
    base_path: &Path,
    folders: &ContentFolders,
    reverse: bool,
) -> Result<BTreeSet<PreferenceKey>, ConsistError> {
    let resolved = ResolvedSlots::new(consist, base_path, folders)?;
    let order = resolved.walk_order(reverse);
    let mut reachable = resolved.reachable_leads(&order);
    Ok(std::mem::take(&mut reachable[0]))
}

//! Configuration models and loaders for brake ratings, locomotive brake equipment, and
//! simulation scenarios.
//!
//! Catalog records load from a YAML list, a single TOML file, or a directory of TOML files
//! (read in file-name order). Every record is validated before it is handed out.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use railbrake_brakes::{BrakeSystemKind, ControllerState};
use serde::Deserialize;
use thiserror::Error;

fn one() -> u32 {
    1
}

fn unit_factor() -> f64 {
    1.0
}

fn default_skid_friction() -> f64 {
    0.08
}

/// Static brake ratings for one vehicle file.
///
/// Rates are psi/s (percent/s for manual brakes). Pressures and swings are in the family's
/// customary unit: inches of mercury for vacuum brakes, psi for air brakes.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BrakeRatingsConfig {
    /// Vehicle file name the ratings apply to, matched without regard to case.
    pub vehicle: String,
    pub system: BrakeSystemKind,
    pub max_application_rate_psi_s: f64,
    pub max_release_rate_psi_s: f64,
    #[serde(default = "one")]
    pub num_cylinders: u32,
    #[serde(default)]
    pub cylinder_volume_ft3: f64,
    #[serde(default)]
    pub pipe_volume_ft3: f64,
    #[serde(default)]
    pub max_cylinder_pressure: f64,
    /// Maximum vacuum (inHg) or supply pressure (psi).
    #[serde(default)]
    pub pressure_band: f64,
    pub max_brake_force_n: f64,
    #[serde(default)]
    pub max_handbrake_force_n: f64,
    #[serde(default = "unit_factor")]
    pub retard_friction_factor: f64,
    #[serde(default = "unit_factor")]
    pub shoe_friction_factor: f64,
    #[serde(default = "default_skid_friction")]
    pub skid_friction: f64,
    #[serde(default)]
    pub aux_reservoir_volume_ft3: f64,
    #[serde(default)]
    pub aux_charging_rate_psi_s: f64,
    /// Handbrake setting applied when the car starts stationary.
    #[serde(default)]
    pub handbrake_percent: f64,
}

/// Driver's brake equipment of a locomotive class.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LocomotiveBrakeConfig {
    pub vehicle: String,
    /// Ejector or feed-valve rate for a 200 ft³ train, psi/s.
    pub charging_rate_psi_s: f64,
    #[serde(default)]
    pub leak_rate_psi_s: f64,
    pub service_time_factor_s: f64,
    /// Pipe change between release and full service (inHg or psi).
    pub full_service_reduction: f64,
    /// Overrides the locomotive's own pressure band when set.
    #[serde(default)]
    pub max_pipe_pressure: Option<f64>,
}

/// How the train is placed into the simulation.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StartCondition {
    /// Charged and released, as a train already running.
    #[default]
    Running,
    /// Standing with a full service application and handbrakes as rated.
    Stationary,
}

/// Controller change at a given simulation time.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ScheduleStep {
    pub at_s: f64,
    pub controller: ControllerState,
    /// Switch the ejector or compressor on or off at the same time.
    #[serde(default)]
    pub charging: Option<bool>,
}

fn default_tick() -> f64 {
    0.1
}

/// A brake simulation run.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScenarioConfig {
    /// Content root holding `trains/consists` and `trains/trainset`.
    pub content: PathBuf,
    #[serde(default)]
    pub folders: BTreeMap<String, PathBuf>,
    pub consist: String,
    /// Preferred lead locomotive path relative to `trains/trainset`, or `none`.
    #[serde(default)]
    pub preference: Option<String>,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default)]
    pub seed: u64,
    pub ratings: PathBuf,
    #[serde(default)]
    pub locomotives: Option<PathBuf>,
    #[serde(default)]
    pub start: StartCondition,
    #[serde(default = "default_tick")]
    pub tick_s: f64,
    pub duration_s: f64,
    #[serde(default)]
    pub schedule: Vec<ScheduleStep>,
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid {record}: {reason}")]
    Invalid { record: String, reason: String },
}

fn invalid(record: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        record: record.to_string(),
        reason: reason.into(),
    }
}

fn require_positive(record: &str, field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(record, format!("{field} must be positive, got {value}")))
    }
}

fn require_non_negative(record: &str, field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(record, format!("{field} must not be negative, got {value}")))
    }
}

impl BrakeRatingsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let record = format!("brake ratings '{}'", self.vehicle);
        let record = record.as_str();
        require_positive(record, "max_application_rate_psi_s", self.max_application_rate_psi_s)?;
        require_positive(record, "max_release_rate_psi_s", self.max_release_rate_psi_s)?;
        require_non_negative(record, "max_brake_force_n", self.max_brake_force_n)?;
        require_non_negative(record, "max_handbrake_force_n", self.max_handbrake_force_n)?;
        require_non_negative(record, "retard_friction_factor", self.retard_friction_factor)?;
        require_non_negative(record, "shoe_friction_factor", self.shoe_friction_factor)?;
        require_non_negative(record, "skid_friction", self.skid_friction)?;
        if !(0.0..=100.0).contains(&self.handbrake_percent) {
            return Err(invalid(
                record,
                format!("handbrake_percent must lie in 0..=100, got {}", self.handbrake_percent),
            ));
        }

        if self.system.has_pipe() {
            if self.num_cylinders == 0 {
                return Err(invalid(record, "num_cylinders must be at least 1"));
            }
            require_positive(record, "cylinder_volume_ft3", self.cylinder_volume_ft3)?;
            require_positive(record, "pipe_volume_ft3", self.pipe_volume_ft3)?;
            require_positive(record, "max_cylinder_pressure", self.max_cylinder_pressure)?;
            require_positive(record, "pressure_band", self.pressure_band)?;
        }
        if self.system == BrakeSystemKind::AutomaticAir {
            require_positive(record, "aux_reservoir_volume_ft3", self.aux_reservoir_volume_ft3)?;
            require_positive(record, "aux_charging_rate_psi_s", self.aux_charging_rate_psi_s)?;
        }
        Ok(())
    }
}

impl LocomotiveBrakeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let record = format!("locomotive brakes '{}'", self.vehicle);
        let record = record.as_str();
        require_non_negative(record, "charging_rate_psi_s", self.charging_rate_psi_s)?;
        require_non_negative(record, "leak_rate_psi_s", self.leak_rate_psi_s)?;
        require_positive(record, "service_time_factor_s", self.service_time_factor_s)?;
        require_non_negative(record, "full_service_reduction", self.full_service_reduction)?;
        if let Some(max) = self.max_pipe_pressure {
            require_positive(record, "max_pipe_pressure", max)?;
        }
        Ok(())
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let record = format!("scenario '{}'", self.consist);
        let record = record.as_str();
        require_positive(record, "tick_s", self.tick_s)?;
        require_non_negative(record, "duration_s", self.duration_s)?;
        for step in &self.schedule {
            require_non_negative(record, "schedule.at_s", step.at_s)?;
        }
        Ok(())
    }

    /// Rebase relative paths onto `dir`, the directory holding the scenario file.
    pub fn resolve_paths(&mut self, dir: &Path) {
        let rebase = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        };
        rebase(&mut self.content);
        rebase(&mut self.ratings);
        if let Some(locomotives) = self.locomotives.as_mut() {
            rebase(locomotives);
        }
        for folder in self.folders.values_mut() {
            rebase(folder);
        }
    }
}

/// Load brake ratings from a YAML list, a TOML file, or a directory of TOML files.
pub fn load_brake_ratings<P: AsRef<Path>>(path: P) -> Result<Vec<BrakeRatingsConfig>, ConfigError> {
    let ratings: Vec<BrakeRatingsConfig> = load_records(path)?;
    for rating in &ratings {
        rating.validate()?;
    }
    Ok(ratings)
}

/// Load locomotive brake equipment from a YAML list, a TOML file, or a directory of TOML files.
pub fn load_locomotive_brakes<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<LocomotiveBrakeConfig>, ConfigError> {
    let locomotives: Vec<LocomotiveBrakeConfig> = load_records(path)?;
    for locomotive in &locomotives {
        locomotive.validate()?;
    }
    Ok(locomotives)
}

/// Load one scenario file (TOML or YAML) with its paths rebased on the file's directory and
/// its schedule sorted by time.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<ScenarioConfig, ConfigError> {
    let path = path.as_ref();
    let mut scenario: ScenarioConfig = if is_toml(path) {
        toml::from_str(&std::fs::read_to_string(path)?)?
    } else {
        serde_yaml::from_reader(File::open(path)?)?
    };
    scenario.validate()?;
    if let Some(dir) = path.parent() {
        scenario.resolve_paths(dir);
    }
    scenario.schedule.sort_by(|a, b| a.at_s.total_cmp(&b.at_s));
    Ok(scenario)
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut records = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_toml(path))
        .collect();
    entries.sort();
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        let record: T = toml::from_str(&contents)?;
        records.push(record);
    }
    Ok(records)
}

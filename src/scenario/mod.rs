//! Scenario assembly: ratings lookup, consist resolution, and train construction.

mod run;

pub use run::{apply_step, simulate};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use railbrake_brakes::{
    BrakeParams, BrakeSystemKind, Car, CarBrakes, ControllerState, LeadPipeInput, Train,
    TrainError,
};
use railbrake_config::{
    BrakeRatingsConfig, ConfigError, LocomotiveBrakeConfig, ScenarioConfig, StartCondition,
    load_brake_ratings, load_locomotive_brakes,
};
use railbrake_consist::{
    Consist, ConsistError, PreferenceKey, VehicleReference, forward_list, load_consist,
    resolve_consist_file, reverse_list,
};
use railbrake_core::units::{ft3_to_m3, inhg_to_psi};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Consist(#[from] ConsistError),
    #[error(transparent)]
    Train(#[from] TrainError),
    #[error("no brake ratings for vehicle {}", .0.display())]
    MissingRatings(PathBuf),
    #[error("consist '{consist}' cannot be formed with lead {preference}")]
    InfeasiblePreference { consist: String, preference: String },
}

/// Brake ratings and locomotive equipment keyed by lower-case vehicle file name.
#[derive(Debug, Clone, Default)]
pub struct RatingsCatalog {
    ratings: BTreeMap<String, BrakeRatingsConfig>,
    locomotives: BTreeMap<String, LocomotiveBrakeConfig>,
}

fn catalog_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

fn vehicle_key(path: &Path) -> Option<String> {
    path.file_name().and_then(|name| name.to_str()).map(catalog_key)
}

impl RatingsCatalog {
    /// Later records replace earlier ones for the same vehicle.
    pub fn new(
        ratings: Vec<BrakeRatingsConfig>,
        locomotives: Vec<LocomotiveBrakeConfig>,
    ) -> Self {
        Self {
            ratings: ratings
                .into_iter()
                .map(|r| (catalog_key(&r.vehicle), r))
                .collect(),
            locomotives: locomotives
                .into_iter()
                .map(|l| (catalog_key(&l.vehicle), l))
                .collect(),
        }
    }

    pub fn load(ratings: &Path, locomotives: Option<&Path>) -> Result<Self, ScenarioError> {
        let ratings = load_brake_ratings(ratings)?;
        let locomotives = match locomotives {
            Some(path) => load_locomotive_brakes(path)?,
            None => Vec::new(),
        };
        info!(
            "loaded brake ratings for {} vehicles, {} locomotive classes",
            ratings.len(),
            locomotives.len()
        );
        Ok(Self::new(ratings, locomotives))
    }

    pub fn ratings_for(&self, vehicle: &Path) -> Option<&BrakeRatingsConfig> {
        self.ratings.get(&vehicle_key(vehicle)?)
    }

    pub fn locomotive_for(&self, vehicle: &Path) -> Option<&LocomotiveBrakeConfig> {
        self.locomotives.get(&vehicle_key(vehicle)?)
    }
}

/// Vacuum ratings are in inches of mercury; air ratings are already psi.
fn family_psi(kind: BrakeSystemKind, value: f64) -> f64 {
    if kind.is_vacuum() {
        inhg_to_psi(value)
    } else {
        value
    }
}

pub fn brake_params(ratings: &BrakeRatingsConfig) -> BrakeParams {
    let kind = ratings.system;
    BrakeParams {
        max_application_rate_psi_s: ratings.max_application_rate_psi_s,
        max_release_rate_psi_s: ratings.max_release_rate_psi_s,
        cylinder_volume_m3: ft3_to_m3(ratings.cylinder_volume_ft3),
        num_cylinders: ratings.num_cylinders,
        pipe_volume_m3: ft3_to_m3(ratings.pipe_volume_ft3),
        max_cylinder_pressure_psi: family_psi(kind, ratings.max_cylinder_pressure),
        pressure_band_psi: family_psi(kind, ratings.pressure_band),
        max_brake_force_n: ratings.max_brake_force_n,
        max_handbrake_force_n: ratings.max_handbrake_force_n,
        retard_friction_factor: ratings.retard_friction_factor,
        shoe_friction_factor: ratings.shoe_friction_factor,
        skid_friction: ratings.skid_friction,
        aux_reservoir_volume_m3: ft3_to_m3(ratings.aux_reservoir_volume_ft3),
        aux_charging_rate_psi_s: ratings.aux_charging_rate_psi_s,
    }
}

/// Driver's equipment of a locomotive, with the controller in release.
///
/// Automatic brakes start with the ejector or compressor running; a straight vacuum ejector
/// would apply the train, so it starts off.
pub fn lead_input(
    locomotive: &LocomotiveBrakeConfig,
    ratings: &BrakeRatingsConfig,
) -> LeadPipeInput {
    let kind = ratings.system;
    LeadPipeInput {
        controller: ControllerState::Release,
        charging_device_on: kind != BrakeSystemKind::StraightVacuum,
        charging_rate_psi_s: locomotive.charging_rate_psi_s,
        leak_rate_psi_s: locomotive.leak_rate_psi_s,
        service_time_factor_s: locomotive.service_time_factor_s,
        full_service_reduction_psi: family_psi(kind, locomotive.full_service_reduction),
        pressure_band_psi: family_psi(
            kind,
            locomotive.max_pipe_pressure.unwrap_or(ratings.pressure_band),
        ),
    }
}

/// `none` asks for a train without a locomotive; anything else names an engine file below
/// `trains/trainset`.
pub fn parse_preference(content: &Path, value: &str) -> PreferenceKey {
    if value.eq_ignore_ascii_case("none") {
        PreferenceKey::NoLocomotive
    } else {
        PreferenceKey::locomotive(content.join("trains").join("trainset").join(value))
    }
}

/// Load the scenario's consist and resolve it into vehicles, head first.
pub fn resolve_vehicles(
    scenario: &ScenarioConfig,
) -> Result<(Consist, Vec<VehicleReference>), ScenarioError> {
    let path = resolve_consist_file(&scenario.content, &scenario.consist);
    let consist = load_consist(&path)?;
    let preference = scenario
        .preference
        .as_deref()
        .map(|value| parse_preference(&scenario.content, value));
    let resolve = if scenario.reverse {
        reverse_list
    } else {
        forward_list
    };
    let vehicles = resolve(
        &consist,
        &scenario.content,
        &scenario.folders,
        preference.as_ref(),
        scenario.seed,
    )?;
    if vehicles.is_empty() {
        if let Some(value) = &scenario.preference {
            return Err(ScenarioError::InfeasiblePreference {
                consist: consist.display_name.clone(),
                preference: value.clone(),
            });
        }
    }
    Ok((consist, vehicles))
}

/// Car ids pair the vehicle file stem with its UiD so repeated vehicles stay distinct.
pub fn car_id(vehicle: &VehicleReference) -> String {
    let stem = vehicle
        .path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    format!("{stem}#{}", vehicle.uid)
}

/// Build a train from resolved vehicles. The first locomotive with driver's equipment leads.
pub fn build_train(
    vehicles: &[VehicleReference],
    catalog: &RatingsCatalog,
    start: StartCondition,
) -> Result<Train, ScenarioError> {
    let mut cars = Vec::with_capacity(vehicles.len());
    let mut lead = None;
    let mut handbrakes = Vec::with_capacity(vehicles.len());

    for (index, vehicle) in vehicles.iter().enumerate() {
        let ratings = catalog
            .ratings_for(&vehicle.path)
            .ok_or_else(|| ScenarioError::MissingRatings(vehicle.path.clone()))?;
        let brakes = CarBrakes::new(ratings.system, brake_params(ratings));
        let mut car = Car::new(car_id(vehicle), brakes);
        if vehicle.is_locomotive() {
            if let Some(locomotive) = catalog.locomotive_for(&vehicle.path) {
                car = car.with_lead(lead_input(locomotive, ratings));
                lead.get_or_insert(index);
            }
        }
        handbrakes.push(ratings.handbrake_percent);
        cars.push(car);
    }

    if start == StartCondition::Stationary {
        let reduction = lead
            .and_then(|index| cars[index].lead)
            .map(|input| input.full_service_reduction_psi);
        for (car, handbrake) in cars.iter_mut().zip(&handbrakes) {
            let kind = car.brakes.kind();
            let params = &car.brakes.params;
            let applied = kind.full_service_pipe_psi(
                params,
                reduction.unwrap_or(params.pressure_band_psi),
            );
            car.brakes.initialize(false, applied);
            car.brakes.set_handbrake(*handbrake);
            car.brakes.set_manual_target(100.0);
            if let Some(input) = car.lead.as_mut() {
                input.controller = ControllerState::Lap;
            }
        }
    }

    debug!(
        "built train of {} cars, lead {:?}, start {:?}",
        cars.len(),
        lead,
        start
    );
    Ok(Train::new(cars, lead)?)
}

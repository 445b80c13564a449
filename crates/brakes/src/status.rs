//! Display projections of brake state for HUD-style brake tables.
//!
//! Every row is a fixed-width list of strings so that cars of different families line up in
//! one table. Columns that a family does not use are empty strings.

use std::collections::BTreeMap;

use railbrake_core::constants::ONE_ATMOSPHERE_PSI;
use railbrake_core::units::{PressureUnit, VolumeUnit};
use serde::{Deserialize, Serialize};

use crate::system::{BrakeSystem, BrakeSystemKind, CarBrakes};
use crate::train::Train;

/// Number of columns in a car status row.
pub const STATUS_WIDTH: usize = 12;

/// Pressure-carrying parts of the brake equipment, each with its own display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrakeSystemComponent {
    MainReservoir,
    EqualizingReservoir,
    AuxiliaryReservoir,
    EmergencyReservoir,
    MainPipe,
    BrakePipe,
    BrakeCylinder,
}

impl BrakeSystemComponent {
    pub const ALL: [BrakeSystemComponent; 7] = [
        Self::MainReservoir,
        Self::EqualizingReservoir,
        Self::AuxiliaryReservoir,
        Self::EmergencyReservoir,
        Self::MainPipe,
        Self::BrakePipe,
        Self::BrakeCylinder,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPreferences {
    pub pressure: BTreeMap<BrakeSystemComponent, PressureUnit>,
    pub volume: VolumeUnit,
}

impl UnitPreferences {
    /// Every component in `unit`.
    pub fn uniform(unit: PressureUnit, volume: VolumeUnit) -> Self {
        Self {
            pressure: BrakeSystemComponent::ALL
                .into_iter()
                .map(|component| (component, unit))
                .collect(),
            volume,
        }
    }

    /// Conventional readout units: inches of mercury for vacuum, psi otherwise.
    pub fn for_kind(kind: BrakeSystemKind) -> Self {
        if kind.is_vacuum() {
            Self::uniform(PressureUnit::InHg, VolumeUnit::CubicFoot)
        } else {
            Self::uniform(PressureUnit::Psi, VolumeUnit::CubicFoot)
        }
    }

    pub fn unit(&self, component: BrakeSystemComponent) -> PressureUnit {
        self.pressure
            .get(&component)
            .copied()
            .unwrap_or(PressureUnit::Psi)
    }
}

fn format_value(value: f64, unit: PressureUnit) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    match unit {
        PressureUnit::Bar | PressureUnit::KgfPerCm2 => format!("{value:.1} {}", unit.suffix()),
        _ => format!("{value:.0} {}", unit.suffix()),
    }
}

/// Absolute pressure shown as the vacuum it represents.
pub fn format_vacuum(psia: f64, unit: PressureUnit) -> String {
    format_value(unit.from_psi(ONE_ATMOSPHERE_PSI - psia), unit)
}

/// Gauge pressure in the preferred unit.
pub fn format_pressure(psig: f64, unit: PressureUnit) -> String {
    format_value(unit.from_psi(psig), unit)
}

fn format_percent(percent: f64) -> String {
    if percent.is_finite() {
        format!("{percent:.0}%")
    } else {
        "-".to_string()
    }
}

/// Status row of one car.
pub fn debug_status(car: &CarBrakes, units: &UnitPreferences) -> Vec<String> {
    let state = &car.state;
    let cylinder_unit = units.unit(BrakeSystemComponent::BrakeCylinder);
    let pipe_unit = units.unit(BrakeSystemComponent::BrakePipe);
    let reservoir_unit = units.unit(BrakeSystemComponent::AuxiliaryReservoir);

    let (tag, cylinder, pipe, reservoir) = match &car.system {
        BrakeSystem::StraightVacuum => (
            "1VS",
            format_vacuum(state.cylinder_psi, cylinder_unit),
            format_vacuum(state.pipe_psi, pipe_unit),
            String::new(),
        ),
        BrakeSystem::AutomaticVacuum(res) => (
            "1V",
            format_vacuum(state.cylinder_psi, cylinder_unit),
            format_vacuum(state.pipe_psi, pipe_unit),
            format_vacuum(res.pressure_psia, reservoir_unit),
        ),
        BrakeSystem::AutomaticAir(valve) => (
            "1P",
            format_pressure(state.cylinder_psi, cylinder_unit),
            format_pressure(state.pipe_psi, pipe_unit),
            format_pressure(valve.aux_reservoir_psi, reservoir_unit),
        ),
        BrakeSystem::Manual(brake) => (
            "M",
            format_percent(brake.applied_percent),
            String::new(),
            String::new(),
        ),
    };

    let handbrake = if state.handbrake_percent > 0.0 {
        format_percent(state.handbrake_percent)
    } else {
        String::new()
    };
    let (connection, cocks) = if car.kind().has_pipe() {
        (
            state.connection_label().to_string(),
            state.angle_cock_label(),
        )
    } else {
        (String::new(), String::new())
    };

    let mut row = vec![String::new(); STATUS_WIDTH];
    row[0] = tag.to_string();
    row[1] = cylinder;
    row[2] = pipe;
    row[3] = reservoir;
    row[9] = handbrake;
    row[10] = connection;
    row[11] = cocks;
    row
}

/// Column titles for [`brake_table`] rows of a train braked by `kind`.
pub fn brake_table_header(kind: BrakeSystemKind) -> Vec<String> {
    let (cylinder, pipe, reservoir) = match kind {
        BrakeSystemKind::StraightVacuum => ("BrkCyl", "BrkPipe", ""),
        BrakeSystemKind::AutomaticVacuum => ("BrkCyl", "BrkPipe", "VacRes"),
        BrakeSystemKind::AutomaticAir => ("BrkCyl", "BrkPipe", "AuxRes"),
        BrakeSystemKind::Manual => ("Applied", "", ""),
    };
    let mut header = vec![String::new(); STATUS_WIDTH + 1];
    header[0] = "Car".to_string();
    header[1] = "Type".to_string();
    header[2] = cylinder.to_string();
    header[3] = pipe.to_string();
    header[4] = reservoir.to_string();
    header[10] = "Handbrk".to_string();
    header[11] = "Conn".to_string();
    header[12] = "AnglCock".to_string();
    header
}

/// One row per car, each prefixed with the car id.
pub fn brake_table(train: &Train, units: &UnitPreferences) -> Vec<Vec<String>> {
    train
        .cars()
        .iter()
        .map(|car| {
            let mut row = Vec::with_capacity(STATUS_WIDTH + 1);
            row.push(car.id.clone());
            row.extend(debug_status(&car.brakes, units));
            row
        })
        .collect()
}

/// Summary of the train volumes: pipe, cylinders, and the system connected to the lead.
pub fn train_volume_status(train: &Train, units: &UnitPreferences) -> Vec<String> {
    let volumes = train.volumes();
    let unit = units.volume;
    let format = |m3: f64| {
        if m3.is_finite() {
            format!("{:.2} {}", unit.from_m3(m3), unit.suffix())
        } else {
            "-".to_string()
        }
    };
    vec![
        "Train Pipe".to_string(),
        format(volumes.pipe_m3),
        "Brake Cyl".to_string(),
        format(volumes.cylinder_m3),
        "Air Vol".to_string(),
        format(volumes.current_system_m3),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BrakeParams;
    use crate::pipe::{ControllerState, LeadPipeInput};
    use crate::train::Car;
    use railbrake_core::units::{inhg_to_psi, vacuum_to_psia};

    fn vacuum_units() -> UnitPreferences {
        UnitPreferences::for_kind(BrakeSystemKind::StraightVacuum)
    }

    #[test]
    fn straight_vacuum_row_has_fixed_layout() {
        let mut car = CarBrakes::new(BrakeSystemKind::StraightVacuum, BrakeParams::default());
        car.initialize(false, vacuum_to_psia(20.0));

        let row = debug_status(&car, &vacuum_units());
        assert_eq!(row.len(), STATUS_WIDTH);
        assert_eq!(row[0], "1VS");
        assert_eq!(row[1], "20 inHg");
        assert_eq!(row[2], "20 inHg");
        assert_eq!(row[3], "");
        assert!(row[4..9].iter().all(String::is_empty));
        assert_eq!(row[9], "", "handbrake column is blank when released");
        assert_eq!(row[10], "I");
        assert_eq!(row[11], "A+ B+");
    }

    #[test]
    fn isolated_car_and_handbrake_are_reported() {
        let mut car = CarBrakes::new(BrakeSystemKind::StraightVacuum, BrakeParams::default());
        car.state.front_hose_connected = false;
        car.state.angle_cock_b_open = false;
        car.set_handbrake(50.0);

        let row = debug_status(&car, &vacuum_units());
        assert_eq!(row[9], "50%");
        assert_eq!(row[10], "T");
        assert_eq!(row[11], "A+ B-");
    }

    #[test]
    fn non_finite_pressure_renders_as_dash() {
        let mut car = CarBrakes::new(BrakeSystemKind::StraightVacuum, BrakeParams::default());
        car.state.cylinder_psi = f64::NAN;
        car.state.pipe_psi = f64::INFINITY;
        let row = debug_status(&car, &vacuum_units());
        assert_eq!(row[1], "-");
        assert_eq!(row[2], "-");
    }

    #[test]
    fn air_row_shows_auxiliary_reservoir_in_psi() {
        let car = CarBrakes::new(BrakeSystemKind::AutomaticAir, BrakeParams::air_wagon());
        let units = UnitPreferences::for_kind(BrakeSystemKind::AutomaticAir);
        let row = debug_status(&car, &units);
        assert_eq!(row[0], "1P");
        assert_eq!(row[1], "0 psi");
        assert_eq!(row[2], "90 psi");
        assert_eq!(row[3], "90 psi");
    }

    #[test]
    fn per_component_units_are_honoured() {
        let car = CarBrakes::new(BrakeSystemKind::AutomaticAir, BrakeParams::air_wagon());
        let mut units = UnitPreferences::for_kind(BrakeSystemKind::AutomaticAir);
        units
            .pressure
            .insert(BrakeSystemComponent::BrakePipe, PressureUnit::Bar);
        let row = debug_status(&car, &units);
        assert_eq!(row[2], "6.2 bar");
        assert_eq!(row[3], "90 psi");
    }

    #[test]
    fn manual_row_shows_applied_percent() {
        let mut car = CarBrakes::new(BrakeSystemKind::Manual, BrakeParams::default());
        car.set_manual_target(100.0);
        car.advance(1.0);
        let row = debug_status(&car, &vacuum_units());
        assert_eq!(row[0], "M");
        assert_eq!(row[1], "2%");
        assert_eq!(row[10], "");
        assert_eq!(row[11], "");
    }

    #[test]
    fn table_rows_are_prefixed_with_car_ids() {
        let lead = LeadPipeInput {
            controller: ControllerState::Lap,
            charging_device_on: false,
            charging_rate_psi_s: 0.0,
            leak_rate_psi_s: 0.0,
            service_time_factor_s: 1.0,
            full_service_reduction_psi: 0.0,
            pressure_band_psi: inhg_to_psi(21.0),
        };
        let brakes = CarBrakes::new(BrakeSystemKind::AutomaticVacuum, BrakeParams::default());
        let cars = vec![
            Car::new("loco", brakes.clone()).with_lead(lead),
            Car::new("van", brakes),
        ];
        let train = Train::new(cars, Some(0)).expect("train");
        let units = UnitPreferences::for_kind(BrakeSystemKind::AutomaticVacuum);

        let header = brake_table_header(BrakeSystemKind::AutomaticVacuum);
        let rows = brake_table(&train, &units);
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), header.len());
        }
        assert_eq!(rows[1][0], "van");
        assert_eq!(rows[1][1], "1V");
        assert_eq!(header[4], "VacRes");

        let volumes = train_volume_status(&train, &units);
        assert_eq!(volumes.len(), 6);
        assert_eq!(volumes[0], "Train Pipe");
        assert_eq!(volumes[1], "3.00 ft³");
        assert_eq!(volumes[3], "3.60 ft³");
        assert_eq!(volumes[5], "6.60 ft³");
    }
}

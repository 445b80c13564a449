use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use env_logger::{Builder, Env};
use railbrake::brakes::status::{
    UnitPreferences, brake_table, brake_table_header, train_volume_status,
};
use railbrake::brakes::{BrakeSystemKind, ControllerState, Train};
use railbrake::config::load_scenario;
use railbrake::export::summary::{Metadata, write_sidecars};
use railbrake::export::trace::{Record, write_header, writer_for_path};
use railbrake::scenario::{RatingsCatalog, build_train, resolve_vehicles, simulate};
use railbrake_core::units::{PressureUnit, VolumeUnit};

/// Run a brake scenario: resolve the consist, build the train, and step the brakes through
/// the controller schedule.
#[derive(Parser, Debug)]
#[command(author, version, about = "Train brake simulator")]
struct Cli {
    /// Scenario file (TOML or YAML)
    scenario: PathBuf,

    /// Per-car trace CSV (use '-' for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write `<stem>_summary.json` (and a per-second digest for long runs) next to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Write a trace row every N ticks
    #[arg(long, default_value_t = 1)]
    every: usize,

    /// Pressure unit of the final brake table (defaults to the brake family's own)
    #[arg(long, value_enum)]
    units: Option<UnitsArg>,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum UnitsArg {
    Psi,
    Inhg,
    Bar,
    Kpa,
    Kgf,
}

impl From<UnitsArg> for PressureUnit {
    fn from(value: UnitsArg) -> Self {
        match value {
            UnitsArg::Psi => PressureUnit::Psi,
            UnitsArg::Inhg => PressureUnit::InHg,
            UnitsArg::Bar => PressureUnit::Bar,
            UnitsArg::Kpa => PressureUnit::KPa,
            UnitsArg::Kgf => PressureUnit::KgfPerCm2,
        }
    }
}

fn main() -> anyhow::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let scenario = load_scenario(&cli.scenario)
        .with_context(|| format!("loading scenario {}", cli.scenario.display()))?;
    let catalog = RatingsCatalog::load(&scenario.ratings, scenario.locomotives.as_deref())?;
    let (consist, vehicles) = resolve_vehicles(&scenario)?;
    let mut train = build_train(&vehicles, &catalog, scenario.start)?;

    let mut writer = match &cli.csv {
        Some(path) => {
            let mut writer = writer_for_path(path)
                .with_context(|| format!("creating {}", path.display()))?;
            write_header(writer.as_mut())?;
            Some(writer)
        }
        None => None,
    };

    let every = cli.every.max(1);
    let mut ticks = 0usize;
    let mut trace_error: Option<io::Error> = None;
    let summary = simulate(
        &mut train,
        &scenario.schedule,
        scenario.tick_s,
        scenario.duration_s,
        |time_s, train, controller| {
            ticks += 1;
            if ticks % every != 0 || trace_error.is_some() {
                return;
            }
            if let Some(writer) = writer.as_deref_mut() {
                if let Err(err) = write_rows(writer, time_s, train, controller) {
                    trace_error = Some(err);
                }
            }
        },
    );
    if let Some(err) = trace_error {
        return Err(err).context("writing trace");
    }
    if let Some(mut writer) = writer {
        writer.flush()?;
    }

    if let Some(path) = &cli.summary {
        let lead = train.lead_car().map(|car| car.id.as_str());
        let scenario_name = cli.scenario.display().to_string();
        let meta = Metadata {
            scenario: &scenario_name,
            consist: &consist.display_name,
            lead,
            seed: scenario.seed,
        };
        for written in write_sidecars(path, &meta, &summary)? {
            log::info!("wrote {}", written.display());
        }
    }

    let to_stdout = cli.csv.as_deref() == Some(Path::new("-"));
    if !to_stdout {
        print_report(&train, cli.units);
    }
    Ok(())
}

fn write_rows(
    writer: &mut dyn Write,
    time_s: f64,
    train: &Train,
    controller: ControllerState,
) -> io::Result<()> {
    for (car, connected) in train.cars().iter().zip(train.connected_to_lead()) {
        let brakes = &car.brakes;
        Record {
            time_s,
            car: &car.id,
            system: brakes.kind().label(),
            controller: controller.label(),
            pipe_psi: brakes.state.pipe_psi,
            cylinder_psi: brakes.state.cylinder_psi,
            reservoir_psi: brakes.reservoir_psi(),
            handbrake_percent: brakes.state.handbrake_percent,
            retard_force_n: brakes.state.retard_force_n,
            brake_force_n: brakes.state.brake_force_n,
            connected,
        }
        .write_to(writer)?;
    }
    Ok(())
}

fn print_report(train: &Train, units: Option<UnitsArg>) {
    let kind = train
        .lead_car()
        .or_else(|| train.cars().first())
        .map(|car| car.brakes.kind())
        .unwrap_or(BrakeSystemKind::Manual);
    let units = match units {
        Some(unit) => UnitPreferences::uniform(unit.into(), VolumeUnit::CubicFoot),
        None => UnitPreferences::for_kind(kind),
    };

    let header = brake_table_header(kind);
    let rows = brake_table(train, &units);
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    for row in std::iter::once(&header).chain(&rows) {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        println!("{}", line.join("  ").trim_end());
    }
    println!("{}", train_volume_status(train, &units).join("  "));
}

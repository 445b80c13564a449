use log::{info, warn};
use railbrake_brakes::status::{UnitPreferences, debug_status};
use railbrake_brakes::{BrakeSystemKind, ControllerState, Train};
use railbrake_config::ScheduleStep;
use railbrake_export::summary::{CarSummary, RunSummary, Sample};

/// Hand a schedule step to the driver's controls of the lead locomotive.
///
/// A straight vacuum ejector follows the controller unless the step says otherwise: it runs
/// in apply and emergency and stops elsewhere.
pub fn apply_step(train: &mut Train, step: &ScheduleStep) {
    let kind = train.lead_car().map(|car| car.brakes.kind());
    let Some(controls) = train.lead_controls_mut() else {
        warn!("no lead locomotive, controller step at {:.1} s ignored", step.at_s);
        return;
    };
    controls.controller = step.controller;
    match step.charging {
        Some(on) => controls.charging_device_on = on,
        None if kind == Some(BrakeSystemKind::StraightVacuum) => {
            controls.charging_device_on =
                matches!(step.controller, ControllerState::Apply | ControllerState::Emergency);
        }
        None => {}
    }
    info!(
        "t={:.1} s: controller {}, charging {}",
        step.at_s,
        step.controller.label(),
        if controls.charging_device_on { "on" } else { "off" }
    );
}

fn controller(train: &Train) -> ControllerState {
    train
        .lead_car()
        .and_then(|car| car.lead)
        .map(|input| input.controller)
        .unwrap_or_default()
}

fn sample(time_s: f64, train: &Train) -> Sample {
    let cars = train.cars();
    Sample {
        time_s,
        lead_pipe_psi: train
            .lead_car()
            .map(|car| car.brakes.state.pipe_psi)
            .unwrap_or(f64::NAN),
        total_retard_force_n: cars.iter().map(|car| car.brakes.state.retard_force_n).sum(),
        total_brake_force_n: cars.iter().map(|car| car.brakes.state.brake_force_n).sum(),
    }
}

/// Run `train` for `duration_s` seconds in steps of `tick_s`, applying each schedule step
/// once its time is reached. `observer` sees the train after every tick together with the
/// controller position in force.
pub fn simulate<F>(
    train: &mut Train,
    schedule: &[ScheduleStep],
    tick_s: f64,
    duration_s: f64,
    mut observer: F,
) -> RunSummary
where
    F: FnMut(f64, &Train, ControllerState),
{
    let ticks = if tick_s.is_finite() && tick_s > 0.0 && duration_s.is_finite() {
        (duration_s / tick_s - 1e-9).ceil().max(0.0) as usize
    } else {
        0
    };
    let mut peaks: Vec<f64> = train
        .cars()
        .iter()
        .map(|car| car.brakes.state.retard_force_n)
        .collect();
    let initial = sample(0.0, train);
    let mut peak_total = initial.total_retard_force_n;
    let mut samples = Vec::with_capacity(ticks + 1);
    samples.push(initial);
    let mut pending = schedule.iter().peekable();

    for n in 0..ticks {
        let start = n as f64 * tick_s;
        while let Some(step) = pending.next_if(|step| step.at_s <= start + 1e-9) {
            apply_step(train, step);
        }
        train.tick(tick_s);

        let time_s = (n + 1) as f64 * tick_s;
        for (peak, car) in peaks.iter_mut().zip(train.cars()) {
            *peak = peak.max(car.brakes.state.retard_force_n);
        }
        let current = sample(time_s, train);
        peak_total = peak_total.max(current.total_retard_force_n);
        samples.push(current);
        observer(time_s, train, controller(train));
    }

    let cars = train
        .cars()
        .iter()
        .zip(peaks)
        .map(|(car, peak)| {
            let brakes = &car.brakes;
            CarSummary {
                id: car.id.clone(),
                system: brakes.kind().label().to_string(),
                final_pipe_psi: brakes.state.pipe_psi,
                final_cylinder_psi: brakes.state.cylinder_psi,
                final_retard_force_n: brakes.state.retard_force_n,
                peak_retard_force_n: peak,
                status: debug_status(brakes, &UnitPreferences::for_kind(brakes.kind())),
            }
        })
        .collect();

    RunSummary {
        duration_s,
        tick_s,
        ticks,
        peak_total_retard_force_n: peak_total,
        cars,
        samples,
    }
}

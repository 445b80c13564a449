use railbrake::brakes::pipe::LeadPipeInput;
use railbrake::brakes::{BrakeParams, BrakeSystemKind, Car, CarBrakes, ControllerState, Train};
use railbrake::config::ScheduleStep;
use railbrake::scenario::simulate;
use railbrake_core::constants::ONE_ATMOSPHERE_PSI;
use railbrake_core::units::{inhg_to_psi, vacuum_to_psia};

fn vacuum_lead() -> LeadPipeInput {
    LeadPipeInput {
        controller: ControllerState::Release,
        charging_device_on: true,
        charging_rate_psi_s: 0.5,
        leak_rate_psi_s: 0.0,
        service_time_factor_s: 10.0,
        full_service_reduction_psi: inhg_to_psi(10.0),
        pressure_band_psi: inhg_to_psi(21.0),
    }
}

fn air_lead() -> LeadPipeInput {
    LeadPipeInput {
        controller: ControllerState::Release,
        charging_device_on: true,
        charging_rate_psi_s: 2.0,
        leak_rate_psi_s: 0.0,
        service_time_factor_s: 8.0,
        full_service_reduction_psi: 26.0,
        pressure_band_psi: 90.0,
    }
}

fn vacuum_train(cars: usize) -> Train {
    let mut list = vec![
        Car::new(
            "loco",
            CarBrakes::new(BrakeSystemKind::AutomaticVacuum, BrakeParams::default()),
        )
        .with_lead(vacuum_lead()),
    ];
    for i in 1..cars {
        list.push(Car::new(
            format!("van{i}"),
            CarBrakes::new(BrakeSystemKind::AutomaticVacuum, BrakeParams::default()),
        ));
    }
    Train::new(list, Some(0)).expect("vacuum train")
}

fn air_train(cars: usize) -> Train {
    let mut list = vec![
        Car::new(
            "loco",
            CarBrakes::new(BrakeSystemKind::AutomaticAir, BrakeParams::air_wagon()),
        )
        .with_lead(air_lead()),
    ];
    for i in 1..cars {
        list.push(Car::new(
            format!("tank{i}"),
            CarBrakes::new(BrakeSystemKind::AutomaticAir, BrakeParams::air_wagon()),
        ));
    }
    Train::new(list, Some(0)).expect("air train")
}

fn step(at_s: f64, controller: ControllerState) -> ScheduleStep {
    ScheduleStep {
        at_s,
        controller,
        charging: None,
    }
}

#[test]
fn released_pipe_vents_an_applied_cylinder() {
    let mut car = CarBrakes::new(BrakeSystemKind::AutomaticAir, BrakeParams::air_wagon());
    car.initialize_moving(70.0);
    let cylinder_before = car.state.cylinder_psi;
    let force_before = car.state.retard_force_n;
    assert!(cylinder_before > 0.0);

    car.state.pipe_psi = car.params.pressure_band_psi;
    car.advance(0.1);
    assert!(car.state.cylinder_psi < cylinder_before);
    assert!(car.state.retard_force_n < force_before);
}

#[test]
fn atmospheric_pipe_releases_a_straight_vacuum_car() {
    let mut car = CarBrakes::new(BrakeSystemKind::StraightVacuum, BrakeParams::default());
    car.initialize_moving(vacuum_to_psia(15.0));
    let force_before = car.state.retard_force_n;
    let cylinder_before = car.state.cylinder_psi;

    car.state.pipe_psi = ONE_ATMOSPHERE_PSI;
    car.advance(0.1);
    assert!(car.state.cylinder_psi > cylinder_before);
    assert!(car.state.cylinder_psi <= ONE_ATMOSPHERE_PSI);
    assert!(car.state.retard_force_n < force_before);
}

#[test]
fn stuck_brake_force_ignores_cylinder_pressure() {
    let params = BrakeParams {
        max_brake_force_n: 10_000.0,
        max_handbrake_force_n: 6_000.0,
        ..BrakeParams::air_wagon()
    };
    let mut car = CarBrakes::new(BrakeSystemKind::AutomaticAir, params);
    car.state.stuck = true;
    for cylinder in [0.0, 20.0, 64.0] {
        car.state.cylinder_psi = cylinder;
        car.refresh_forces();
        assert_eq!(car.state.retard_force_n, 10_000.0, "cylinder at {cylinder} psi");
    }
}

#[test]
fn stuck_brake_falls_back_to_half_the_handbrake() {
    let params = BrakeParams {
        max_brake_force_n: 1_000.0,
        max_handbrake_force_n: 6_000.0,
        ..BrakeParams::air_wagon()
    };
    let mut car = CarBrakes::new(BrakeSystemKind::AutomaticAir, params);
    car.state.stuck = true;
    for cylinder in [0.0, 20.0, 64.0] {
        car.state.cylinder_psi = cylinder;
        car.refresh_forces();
        assert_eq!(car.state.retard_force_n, 3_000.0, "cylinder at {cylinder} psi");
    }
}

#[test]
fn full_release_vents_every_cylinder_with_fast_reservoir_charging() {
    let params = BrakeParams {
        aux_charging_rate_psi_s: 10.0,
        ..BrakeParams::air_wagon()
    };
    let applied = |id: &str| {
        let mut brakes = CarBrakes::new(BrakeSystemKind::AutomaticAir, params.clone());
        brakes.initialize_moving(64.0);
        Car::new(id, brakes)
    };
    let mut train = Train::new(
        vec![applied("loco").with_lead(air_lead()), applied("tank1")],
        Some(0),
    )
    .expect("air train");
    assert!(train.cars().iter().all(|car| car.brakes.state.cylinder_psi > 60.0));

    simulate(&mut train, &[], 0.1, 600.0, |_, _, _| {});
    for car in train.cars() {
        let state = &car.brakes.state;
        assert!((state.pipe_psi - 90.0).abs() < 1e-9, "{} pipe {}", car.id, state.pipe_psi);
        assert_eq!(state.cylinder_psi, 0.0, "{} cylinder", car.id);
        assert_eq!(state.retard_force_n, 0.0, "{} force", car.id);
    }
}

#[test]
fn pressures_stay_inside_the_band_through_a_brake_cycle() {
    let mut train = air_train(4);
    let schedule = [
        step(0.0, ControllerState::Apply),
        step(15.0, ControllerState::Lap),
        step(20.0, ControllerState::Release),
        step(40.0, ControllerState::Emergency),
        step(50.0, ControllerState::Release),
    ];
    let mut violations = Vec::new();
    simulate(&mut train, &schedule, 0.1, 80.0, |time_s, train, _| {
        for car in train.cars() {
            let state = &car.brakes.state;
            let params = &car.brakes.params;
            let pipe_ok = (0.0..=params.pressure_band_psi).contains(&state.pipe_psi);
            let cylinder_ok = (0.0..=params.pressure_band_psi).contains(&state.cylinder_psi);
            let aux_ok = car
                .brakes
                .reservoir_psi()
                .is_none_or(|aux| (0.0..=params.pressure_band_psi).contains(&aux));
            if !(pipe_ok && cylinder_ok && aux_ok) {
                violations.push((time_s, car.id.clone()));
            }
        }
    });
    assert!(violations.is_empty(), "out of band: {violations:?}");
}

#[test]
fn vacuum_pressures_stay_between_full_vacuum_and_atmosphere() {
    let mut train = vacuum_train(3);
    let schedule = [
        step(0.0, ControllerState::Apply),
        step(20.0, ControllerState::Release),
        step(40.0, ControllerState::Emergency),
    ];
    let floor = vacuum_to_psia(21.0);
    let mut worst = (f64::INFINITY, f64::NEG_INFINITY);
    simulate(&mut train, &schedule, 0.1, 60.0, |_, train, _| {
        for car in train.cars() {
            for p in [car.brakes.state.pipe_psi, car.brakes.state.cylinder_psi] {
                worst = (worst.0.min(p), worst.1.max(p));
            }
        }
    });
    assert!(worst.0 >= floor - 1e-9, "lowest {}", worst.0);
    assert!(worst.1 <= ONE_ATMOSPHERE_PSI + 1e-9, "highest {}", worst.1);
}

#[test]
fn identical_trains_evolve_identically() {
    let schedule = [step(0.0, ControllerState::Apply), step(12.0, ControllerState::Release)];
    let mut a = vacuum_train(5);
    let mut b = vacuum_train(5);
    simulate(&mut a, &schedule, 0.05, 25.0, |_, _, _| {});
    simulate(&mut b, &schedule, 0.05, 25.0, |_, _, _| {});
    assert_eq!(a, b);

    let before = a.clone();
    a.tick(0.0);
    a.tick(f64::NAN);
    assert_eq!(a, before);
}

#[test]
fn service_application_converges_monotonically() {
    let mut train = air_train(3);
    let service = 90.0 - 26.0;
    let mut lead_pipe = Vec::new();
    let mut rear_cylinder = Vec::new();
    simulate(
        &mut train,
        &[step(0.0, ControllerState::Apply)],
        0.1,
        30.0,
        |_, train, _| {
            lead_pipe.push(train.cars()[0].brakes.state.pipe_psi);
            rear_cylinder.push(train.cars()[2].brakes.state.cylinder_psi);
        },
    );

    assert!(lead_pipe.windows(2).all(|w| w[1] <= w[0]));
    assert!(lead_pipe.iter().all(|&p| p >= service - 1e-9));
    assert!((lead_pipe[lead_pipe.len() - 1] - service).abs() < 1e-6);
    assert!(rear_cylinder.windows(2).all(|w| w[1] >= w[0] - 1e-12));
    assert!(rear_cylinder[rear_cylinder.len() - 1] > 0.0);
}

#[test]
fn closed_angle_cock_isolates_the_rear_of_the_train() {
    let mut train = vacuum_train(4);
    train.cars_mut()[1].brakes.state.angle_cock_b_open = false;
    simulate(
        &mut train,
        &[step(0.0, ControllerState::Emergency)],
        0.1,
        20.0,
        |_, _, _| {},
    );
    let cars = train.cars();
    assert_eq!(train.connected_to_lead(), vec![true, true, false, false]);
    assert!(cars[1].brakes.state.retard_force_n > 0.0);
    assert_eq!(cars[3].brakes.state.retard_force_n, 0.0);
    assert!(cars[3].brakes.state.pipe_psi < cars[1].brakes.state.pipe_psi);
}

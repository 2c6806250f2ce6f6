//! Long randomized sessions: state stays inside its documented bounds.

use proptest::prelude::*;
use race_dynamics::dynamics::{Commands, SimulationInput, VehicleConfig, VehicleSimulation};

const DT: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy)]
struct Driver {
    throttle: f32,
    brake: f32,
    ers: f32,
    shift_up: bool,
    shift_down: bool,
    v_lat: f32,
}

fn driver() -> impl Strategy<Value = Driver> {
    (
        0.0f32..=1.0,
        prop_oneof![3 => Just(0.0f32), 1 => 0.0f32..=1.0],
        0.0f32..=1.0,
        prop::bool::weighted(0.05),
        prop::bool::weighted(0.02),
        -3.0f32..3.0,
    )
        .prop_map(|(throttle, brake, ers, shift_up, shift_down, v_lat)| Driver {
            throttle,
            brake,
            ers,
            shift_up,
            shift_down,
            v_lat,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn session_state_stays_in_bounds(
        script in prop::collection::vec(driver(), 200..600),
        wetness in 0.0f32..=1.0,
    ) {
        let cfg = VehicleConfig::default();
        let mut sim = VehicleSimulation::new(cfg.clone()).unwrap();
        let mut speed = 0.0f32;
        let mut accel = 0.0f32;
        let mut wear = [0.0f32; 4];

        for d in &script {
            let mut input = SimulationInput::straight(DT, speed, 0.015);
            input.acceleration.x = accel;
            input.throttle = d.throttle;
            input.brake = d.brake;
            input.ers_deploy = d.ers;
            input.wetness = wetness;
            input.commands = Commands { shift_up: d.shift_up, shift_down: d.shift_down, ..Commands::default() };
            for (_, w) in input.wheels.iter_mut() {
                w.v_lat = d.v_lat;
            }

            let out = sim.step(&input);
            let t = &out.telemetry;

            prop_assert!(out.net_force.iter().all(|f| f.is_finite()));
            prop_assert!(out.net_torque.iter().all(|f| f.is_finite()));

            prop_assert!(t.rpm >= cfg.engine.idle_rpm && t.rpm <= cfg.engine.max_rpm);
            prop_assert!(t.ers_energy >= 0.0 && t.ers_energy <= cfg.ers.max_energy_per_lap);
            prop_assert!(t.ers_recovered_lap <= cfg.ers.max_recovery_per_lap + 1.0);
            prop_assert!(t.fuel >= 0.0 && t.fuel <= cfg.engine.fuel_capacity);

            for (c, w) in t.wheels.iter() {
                prop_assert!(w.normal_force >= 0.0);
                prop_assert!(w.longitudinal_force.is_finite() && w.lateral_force.is_finite());
                prop_assert!(w.slip_ratio.abs() <= cfg.tire.max_slip_ratio);
                prop_assert!(!(w.locked && w.abs_active));

                prop_assert!(w.wear >= wear[c.index()]);
                wear[c.index()] = w.wear;

                prop_assert!(w.tire_temp >= cfg.tire.ambient_temp && w.tire_temp <= 300.0);
                prop_assert!(w.brake_temp >= cfg.brakes.ambient_temp && w.brake_temp <= cfg.brakes.max_temp);
                prop_assert!(
                    w.brake_effectiveness >= cfg.brakes.min_effectiveness && w.brake_effectiveness <= 1.0
                );
                prop_assert!(w.flat_spot >= 0.0 && w.flat_spot <= 1.0);
                prop_assert!(w.suspension_force >= 0.0);
            }

            accel = out.net_force.x / cfg.chassis.mass;
            speed = (speed + accel * DT).max(0.0);
        }
    }
}

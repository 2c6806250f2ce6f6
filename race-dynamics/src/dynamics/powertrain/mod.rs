// ==============================================================================
// powertrain — ENGINE + ERS + GEARBOX + FUEL (ONE CONFIG-DRIVEN MODULE)
// ------------------------------------------------------------------------------
// Per tick:
// 1) handle shift requests, advance a running shift
// 2) engine rpm:
//      engaged    -> driven-wheel speed (previous tick) through the ratio
//      disengaged -> free revving towards a throttle target
//    always clamped to [idle_rpm, max_rpm]
// 3) ICE torque from the cubic curve, fuel-flow limited, zero without fuel
// 4) ERS deploy (throttle side) or recovery (lift side) at the crank
// 5) fuel burn
//
// The rpm estimate uses last tick's wheel speed; the tire's kinematic slip
// ratio stays the authoritative wheel-slip measure.
// ==============================================================================

pub mod engine;
pub mod ers;
pub mod gearbox;

use serde::Serialize;

use crate::dynamics::config::VehicleConfig;
use crate::dynamics::types::unit_clamp;

use self::engine::{clamp_rpm, free_rev, ice_output, rpm_to_omega, omega_to_rpm};
use self::gearbox::{advance_shift, engine_speed_from_wheel, request_shift, total_ratio, GearboxState, ShiftRequest};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowertrainState {
    pub rpm: f32,               // [idle_rpm, max_rpm]
    pub engine_torque: f32,     // Nm, ICE only
    pub engine_power: f32,      // W, ICE only
    pub ers_torque: f32,        // Nm at the crank (+ deploy, − harvest)
    pub ers_energy: f32,        // J, [0, max_energy_per_lap]
    pub ers_recovered_lap: f32, // J harvested since the last lap reset
    pub fuel: f32,              // kg, >= 0
    pub fuel_flow: f32,         // kg/s
    pub gearbox: GearboxState,
}

impl PowertrainState {
    pub fn new(cfg: &VehicleConfig) -> Self {
        Self {
            rpm: cfg.engine.idle_rpm,
            engine_torque: 0.0,
            engine_power: 0.0,
            ers_torque: 0.0,
            ers_energy: cfg.ers.initial_energy.clamp(0.0, cfg.ers.max_energy_per_lap),
            ers_recovered_lap: 0.0,
            fuel: cfg.engine.fuel_capacity.max(0.0),
            fuel_flow: 0.0,
            gearbox: GearboxState::default(),
        }
    }

    /// ICE + ERS torque at the crank, before traction control.
    pub fn crank_torque(&self) -> f32 {
        self.engine_torque + self.ers_torque
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PowertrainInput {
    pub throttle: f32,
    pub ers_deploy: f32,
    pub shift: Option<ShiftRequest>,
    /// Mean angular velocity of the driven wheels at the end of last tick.
    pub driven_wheel_omega: f32,
}

pub fn step_powertrain(cfg: &VehicleConfig, state: &mut PowertrainState, input: &PowertrainInput, dt: f32) {
    let throttle = unit_clamp(input.throttle);
    let deploy_demand = unit_clamp(input.ers_deploy);

    // 1) gearbox
    advance_shift(&cfg.gearbox, &mut state.gearbox, dt);
    if let Some(req) = input.shift {
        request_shift(&cfg.gearbox, &mut state.gearbox, req);
    }
    let engaged = state.gearbox.engaged();

    // 2) rpm
    state.rpm = if engaged {
        let omega = engine_speed_from_wheel(&cfg.gearbox, state.gearbox.gear, input.driven_wheel_omega.abs())
            .unwrap_or(0.0);
        clamp_rpm(&cfg.engine, omega_to_rpm(omega))
    } else {
        free_rev(&cfg.engine, state.rpm, throttle, state.fuel, dt)
    };
    let omega = rpm_to_omega(state.rpm);

    // 3) ICE
    let ice = ice_output(&cfg.engine, throttle, state.rpm, state.fuel);
    state.engine_torque = ice.torque;
    state.engine_power = ice.torque * omega;
    state.fuel_flow = ice.fuel_flow;

    // 4) ERS (only with the driveline connected)
    state.ers_torque = 0.0;
    if engaged {
        let deployed = ers::deploy(&cfg.ers, state.ers_energy, deploy_demand, omega, dt);
        state.ers_energy = (state.ers_energy - deployed.energy).max(0.0);
        state.ers_torque += deployed.torque;

        if deployed.energy == 0.0 {
            let harvested = ers::recover(&cfg.ers, state.ers_energy, state.ers_recovered_lap, throttle, state.rpm, dt);
            state.ers_energy = (state.ers_energy + harvested.energy).min(cfg.ers.max_energy_per_lap);
            state.ers_recovered_lap += harvested.energy;
            state.ers_torque += harvested.torque;
        }
    }

    // 5) fuel
    state.fuel = (state.fuel - state.fuel_flow * dt).max(0.0);
}

/// Torque delivered to each of `driven` wheels for a crank torque, or 0 when
/// the driveline is disengaged.
pub fn wheel_drive_torque(cfg: &VehicleConfig, gearbox: &GearboxState, crank_torque: f32, driven: usize) -> f32 {
    if !gearbox.engaged() || driven == 0 {
        return 0.0;
    }
    let ratio = total_ratio(&cfg.gearbox, gearbox.gear).unwrap_or(0.0);
    crank_torque * ratio * cfg.engine.drivetrain_efficiency / driven as f32
}

/// Start a new lap: the per-lap recovery allowance is available again.
pub fn new_lap(state: &mut PowertrainState) {
    state.ers_recovered_lap = 0.0;
}

pub fn refuel(cfg: &VehicleConfig, state: &mut PowertrainState, kg: f32) {
    state.fuel = (state.fuel + kg.max(0.0)).min(cfg.engine.fuel_capacity);
}

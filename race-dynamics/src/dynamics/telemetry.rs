//! Read-only per-tick snapshot for logging / UI collaborators.

use serde::Serialize;

use crate::dynamics::brake::BrakePhase;
use crate::dynamics::step::VehicleSimulationState;
use crate::dynamics::types::{Corner, PerWheel};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WheelTelemetry {
    pub corner: Corner,
    pub active: bool,
    pub normal_force: f32,
    pub slip_ratio: f32,
    pub slip_angle: f32,
    pub angular_velocity: f32,
    pub grip: f32,
    pub tire_temp: f32,
    pub wear: f32,
    pub longitudinal_force: f32,
    pub lateral_force: f32,
    pub brake_phase: BrakePhase,
    pub brake_force: f32,
    pub brake_temp: f32,
    pub brake_effectiveness: f32,
    pub locked: bool,
    pub lock_intensity: f32,
    pub abs_active: bool,
    pub flat_spot: f32,
    pub compression: f32,
    pub suspension_force: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub tick: u64,
    pub time: f64,
    pub speed: f32,             // m/s
    pub rpm: f32,
    pub gear: u8,
    pub shifting: bool,
    pub engine_torque: f32,     // Nm
    pub engine_power: f32,      // W
    pub ers_torque: f32,        // Nm
    pub ers_energy: f32,        // J
    pub ers_recovered_lap: f32, // J
    pub fuel: f32,              // kg
    pub fuel_flow: f32,         // kg/s
    pub traction_active: bool,
    pub abs_enabled: bool,
    pub drs_open: bool,
    pub wheels: PerWheel<WheelTelemetry>,
}

impl TelemetrySnapshot {
    pub fn capture(state: &VehicleSimulationState, active: &PerWheel<bool>) -> Self {
        let pt = &state.powertrain;
        let wheels = PerWheel::from_fn(|c| {
            let w = &state.wheels[c];
            let b = &state.brakes[c];
            let s = &state.suspension[c];
            WheelTelemetry {
                corner: c,
                active: active[c],
                normal_force: w.normal_force,
                slip_ratio: w.slip_ratio,
                slip_angle: w.slip_angle,
                angular_velocity: w.angular_velocity,
                grip: w.grip,
                tire_temp: w.temperature,
                wear: w.wear,
                longitudinal_force: w.longitudinal_force,
                lateral_force: w.lateral_force,
                brake_phase: b.phase,
                brake_force: b.brake_force,
                brake_temp: b.temperature,
                brake_effectiveness: b.effectiveness,
                locked: b.locked,
                lock_intensity: b.lock_intensity,
                abs_active: b.abs_active,
                flat_spot: b.flat_spot,
                compression: s.compression,
                suspension_force: s.force,
            }
        });

        Self {
            tick: state.tick,
            time: state.time,
            speed: state.speed,
            rpm: pt.rpm,
            gear: pt.gearbox.gear,
            shifting: pt.gearbox.shifting,
            engine_torque: pt.engine_torque,
            engine_power: pt.engine_power,
            ers_torque: pt.ers_torque,
            ers_energy: pt.ers_energy,
            ers_recovered_lap: pt.ers_recovered_lap,
            fuel: pt.fuel,
            fuel_flow: pt.fuel_flow,
            traction_active: state.traction_active,
            abs_enabled: state.abs_enabled,
            drs_open: state.drs_open,
            wheels,
        }
    }

    /// One-line headline for periodic logs.
    pub fn summary(&self) -> String {
        let locked = self.wheels.iter().filter(|(_, w)| w.locked).count();
        let abs = self.wheels.iter().filter(|(_, w)| w.abs_active).count();
        format!(
            "t={:.1}s v={:.1}km/h gear={} rpm={:.0} fuel={:.2}kg ers={:.2}MJ locked={} abs={} tc={}",
            self.time,
            self.speed * 3.6,
            self.gear,
            self.rpm,
            self.fuel,
            self.ers_energy / 1.0e6,
            locked,
            abs,
            self.traction_active,
        )
    }
}

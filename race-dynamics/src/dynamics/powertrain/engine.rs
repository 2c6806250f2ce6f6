//! Internal-combustion engine: cubic torque curve, fuel flow, free revving.

use std::f32::consts::PI;

use crate::dynamics::config::EngineConfig;

#[inline]
pub fn rpm_to_omega(rpm: f32) -> f32 { rpm * PI / 30.0 }

#[inline]
pub fn omega_to_rpm(omega: f32) -> f32 { omega * 30.0 / PI }

#[inline]
pub fn clamp_rpm(cfg: &EngineConfig, rpm: f32) -> f32 {
    if rpm.is_finite() { rpm.clamp(cfg.idle_rpm, cfg.max_rpm) } else { cfg.idle_rpm }
}

/// Full-throttle torque `a·rpm³ + b·rpm² + c·rpm + d`, never negative.
pub fn curve_torque(cfg: &EngineConfig, rpm: f32) -> f32 {
    let r = rpm as f64;
    let t = cfg.torque_a as f64 * r * r * r
        + cfg.torque_b as f64 * r * r
        + cfg.torque_c as f64 * r
        + cfg.torque_d as f64;
    (t as f32).max(0.0)
}

/// Demanded fuel flow (kg/s) before the regulatory cap.
#[inline]
pub fn demanded_fuel_flow(cfg: &EngineConfig, throttle: f32, rpm: f32) -> f32 {
    cfg.base_fuel_consumption * throttle * (rpm / cfg.max_rpm)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineOutput {
    pub torque: f32,    // Nm at the crank
    pub fuel_flow: f32, // kg/s actually burned
}

/// Crank torque and fuel burn for this throttle / rpm / fuel level.
///
/// Above `regulated_rpm_fraction` of redline, a demand over `max_fuel_flow`
/// scales torque by permitted/demanded flow.
pub fn ice_output(cfg: &EngineConfig, throttle: f32, rpm: f32, fuel: f32) -> EngineOutput {
    if fuel <= 0.0 || throttle <= 0.0 || rpm >= cfg.max_rpm {
        return EngineOutput::default();
    }

    let demanded = demanded_fuel_flow(cfg, throttle, rpm);
    let fuel_flow = demanded.min(cfg.max_fuel_flow);

    let mut torque = curve_torque(cfg, rpm) * throttle;
    if rpm > cfg.regulated_rpm_fraction * cfg.max_rpm && demanded > cfg.max_fuel_flow {
        torque *= cfg.max_fuel_flow / demanded;
    }

    EngineOutput { torque, fuel_flow }
}

/// Disconnected engine (neutral / mid-shift) chases an idle..redline target set by throttle.
pub fn free_rev(cfg: &EngineConfig, rpm: f32, throttle: f32, fuel: f32, dt: f32) -> f32 {
    let throttle = if fuel > 0.0 { throttle } else { 0.0 };
    let target = cfg.idle_rpm + throttle * (cfg.max_rpm - cfg.idle_rpm);
    let max_step = cfg.free_rev_rate * dt;
    clamp_rpm(cfg, rpm + (target - rpm).clamp(-max_step, max_step))
}

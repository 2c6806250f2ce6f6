//! Sequential gearbox: ratio mapping between crank and wheels, timed shifts.
//!
//! Gear 0 is neutral. During a shift no torque reaches the wheels and further
//! shift requests are dropped.

use serde::{Deserialize, Serialize};

use crate::dynamics::config::GearboxConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftRequest {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GearboxState {
    pub gear: u8,
    pub shifting: bool,
    pub shift_elapsed: f32, // s since the current shift started
}

impl GearboxState {
    /// Torque flows only in gear and outside a shift.
    pub fn engaged(&self) -> bool {
        self.gear > 0 && !self.shifting
    }
}

/// gear · primary · final drive, or None in neutral / for a gear that doesn't exist.
pub fn total_ratio(cfg: &GearboxConfig, gear: u8) -> Option<f32> {
    let idx = (gear as usize).checked_sub(1)?;
    let ratio = cfg.ratios.get(idx)?;
    Some(ratio * cfg.primary_ratio * cfg.final_drive)
}

/// ω_wheel = ω_engine / (gear · primary · final).
pub fn wheel_speed_from_engine(cfg: &GearboxConfig, gear: u8, engine_omega: f32) -> Option<f32> {
    total_ratio(cfg, gear).map(|r| engine_omega / r)
}

pub fn engine_speed_from_wheel(cfg: &GearboxConfig, gear: u8, wheel_omega: f32) -> Option<f32> {
    total_ratio(cfg, gear).map(|r| wheel_omega * r)
}

/// Start a shift if the target gear exists and no shift is running. Returns
/// whether the request was accepted.
pub fn request_shift(cfg: &GearboxConfig, state: &mut GearboxState, request: ShiftRequest) -> bool {
    if state.shifting {
        return false;
    }
    let top = u8::try_from(cfg.ratios.len()).unwrap_or(u8::MAX);
    let target = match request {
        ShiftRequest::Up if state.gear < top => state.gear + 1,
        ShiftRequest::Down if state.gear > 0 => state.gear - 1,
        _ => return false,
    };
    state.gear = target;
    state.shifting = true;
    state.shift_elapsed = 0.0;
    true
}

pub fn advance_shift(cfg: &GearboxConfig, state: &mut GearboxState, dt: f32) {
    if !state.shifting {
        return;
    }
    state.shift_elapsed += dt;
    if state.shift_elapsed >= cfg.shift_time {
        state.shifting = false;
        state.shift_elapsed = 0.0;
    }
}

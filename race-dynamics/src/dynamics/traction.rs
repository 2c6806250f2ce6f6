//! Traction control: trims crank torque from last tick's driven-wheel spin.
//!
//! Current-tick spin depends on current-tick torque, so the feedback is the
//! previous tick's slip ratio (one tick of lag).

use crate::dynamics::config::TractionConfig;

/// Torque multiplier in (0, 1] for a measured spin ratio.
pub fn torque_scale(cfg: &TractionConfig, spin_ratio: f32) -> f32 {
    if !cfg.enabled || !(spin_ratio > cfg.slip_threshold) {
        return 1.0;
    }
    (1.0 - cfg.aggressiveness * spin_ratio.min(1.0)).clamp(0.0, 1.0)
}

/// Apply to positive (driving) torque only; harvesting torque passes through.
pub fn limit_torque(cfg: &TractionConfig, crank_torque: f32, spin_ratio: f32) -> (f32, bool) {
    if crank_torque <= 0.0 {
        return (crank_torque, false);
    }
    let s = torque_scale(cfg, spin_ratio);
    (crank_torque * s, s < 1.0)
}

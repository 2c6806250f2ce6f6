// ==============================================================================
// suspension.rs — SPRING / DAMPER + ANTI-ROLL BAR (VERTICAL FORCES)
// ------------------------------------------------------------------------------
// compression is measured from the spring's free length (+ = bump, − = droop) and is
// supplied by the host each tick; None means the wheel is off the ground.
//
//   spring  F_s = k · x
//   damper  F_d = c · v · (bump | rebound multiplier)   (v > 0 while compressing)
//   ARB     F_arb = k_arb · deg(atan((x_l − x_r) / track))
//           +F_arb on the more compressed side, −F_arb on the other
//
// Anti-roll bars do NOT create net vertical force; they redistribute it across
// the left/right wheels of one axle.
//
// Off-ground wheels sit at full extension and transmit no force. A grounded
// wheel can push the chassis up but never pull it down through the road.
// ==============================================================================

use serde::Serialize;

use crate::dynamics::config::SuspensionConfig;
use crate::dynamics::types::{Axle, Corner, PerWheel, Side};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SuspensionState {
    pub compression: f32,           // m, [−max_extension, max_compression]
    pub compression_velocity: f32,  // m/s
    pub force: f32,                 // N, vertical, >= 0
    pub grounded: bool,
}

#[inline]
pub fn spring_force(k: f32, compression: f32) -> f32 {
    k * compression
}

/// `-c · v_rel · multiplier`, where `v_rel` is the extension rate (−compression velocity).
#[inline]
pub fn damper_force(cfg: &SuspensionConfig, c: f32, compression_velocity: f32) -> f32 {
    let multiplier = if compression_velocity >= 0.0 { cfg.bump_multiplier } else { cfg.rebound_multiplier };
    let v_rel = -compression_velocity;
    -c * v_rel * multiplier
}

/// Anti-roll bar force for the left wheel of a pair; the right wheel gets the negation.
#[inline]
pub fn anti_roll_force(k_arb: f32, left_compression: f32, right_compression: f32, track_width: f32) -> f32 {
    let delta = left_compression - right_compression;
    if delta.abs() < 1e-6 {
        return 0.0;
    }
    k_arb * (delta / track_width).atan().to_degrees()
}

/// Update compression / velocity from the host's measurement.
pub fn update_travel(cfg: &SuspensionConfig, state: &mut SuspensionState, measured: Option<f32>, dt: f32) {
    let (compression, grounded) = match measured {
        Some(x) if x.is_finite() => (x.clamp(-cfg.max_extension, cfg.max_compression), true),
        _ => (-cfg.max_extension, false),
    };

    if dt > 0.0 {
        state.compression_velocity = (compression - state.compression) / dt;
    }
    state.compression = compression;
    state.grounded = grounded;
}

/// Vertical force of every wheel, anti-roll coupling included.
pub fn solve_suspension(
    cfg: &SuspensionConfig,
    track_width: f32,
    states: &mut PerWheel<SuspensionState>,
    active: &PerWheel<bool>,
) {
    let mut arb: PerWheel<f32> = PerWheel::default();
    for axle in [Axle::Front, Axle::Rear] {
        let (l, r) = states.pair(axle);
        // a hanging wheel is at full droop; the bar still loads the other side
        let f = anti_roll_force(cfg.arb_stiffness.get(axle), l.compression, r.compression, track_width);
        arb[Corner::new(axle, Side::Left)] = f;
        arb[Corner::new(axle, Side::Right)] = -f;
    }

    for (corner, s) in states.iter_mut() {
        if !s.grounded || !active[corner] {
            s.force = 0.0;
            continue;
        }
        let axle = corner.axle();
        let spring = spring_force(cfg.spring_rate.get(axle), s.compression);
        let damper = damper_force(cfg, cfg.damping.get(axle), s.compression_velocity);
        s.force = (spring + damper + arb[corner]).max(0.0);
    }
}

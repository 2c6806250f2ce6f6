// ==============================================================================
// load_transfer.rs — PER-WHEEL NORMAL LOAD (STATIC + AERO + WEIGHT TRANSFER)
// ------------------------------------------------------------------------------
// 1) static axle loads from m·g and the static front share
// 2) aero downforce (computed by the host's aero model) split by aero balance
// 3) longitudinal transfer  ΔF = a_x · m · h_cg / wheelbase   (front → rear
//    under acceleration, rear → front under braking)
// 4) lateral transfer per axle ΔF = a_y · m_axle · h_cg / track   (towards the
//    outside of the turn; body frame +y is left)
// 5) each wheel floored at zero
// ==============================================================================

use crate::dynamics::config::ChassisConfig;
use crate::dynamics::types::{Axle, Corner, PerAxle, PerWheel, Side, GRAVITY};

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadInput {
    pub accel_long: f32,    // m/s², + forward
    pub accel_lat: f32,     // m/s², + left
    pub downforce: f32,     // N, >= 0
}

/// Static (zero acceleration, zero aero) axle loads.
pub fn static_axle_loads(cfg: &ChassisConfig) -> PerAxle<f32> {
    let weight = cfg.mass * GRAVITY;
    PerAxle::new(weight * cfg.front_weight_distribution, weight * (1.0 - cfg.front_weight_distribution))
}

/// Axle loads after aero and longitudinal transfer.
pub fn axle_loads(cfg: &ChassisConfig, input: &LoadInput) -> PerAxle<f32> {
    let base = static_axle_loads(cfg);
    let downforce = input.downforce.max(0.0);

    let transfer = input.accel_long * cfg.mass * cfg.cg_height / cfg.wheelbase;

    PerAxle::new(
        base.front + downforce * cfg.downforce_front_share - transfer,
        base.rear + downforce * (1.0 - cfg.downforce_front_share) + transfer,
    )
}

pub fn wheel_loads(cfg: &ChassisConfig, input: &LoadInput) -> PerWheel<f32> {
    let axles = axle_loads(cfg, input);
    let mut out = PerWheel::default();

    for axle in [Axle::Front, Axle::Rear] {
        let load = axles.get(axle).max(0.0);
        let axle_mass = load / GRAVITY;
        let transfer = input.accel_lat * axle_mass * cfg.cg_height / cfg.track_width;

        out[Corner::new(axle, Side::Left)] = (0.5 * load - transfer).max(0.0);
        out[Corner::new(axle, Side::Right)] = (0.5 * load + transfer).max(0.0);
    }

    out
}

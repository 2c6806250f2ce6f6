//! MGU-K style energy recovery / deployment against a stored-energy budget.
//!
//! Stored energy stays within [0, max_energy_per_lap]; recovery is further
//! capped per lap. Both directions act on the crank as torque = power / ω.

use crate::dynamics::config::ErsConfig;
use crate::dynamics::powertrain::engine::rpm_to_omega;
use crate::dynamics::types::OMEGA_EPSILON;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ErsFlow {
    pub torque: f32,    // Nm at the crank (+ deploy, − harvest)
    pub energy: f32,    // J moved this tick (always >= 0)
}

/// Deploy `demand` (0..1) of max power, limited by what is stored.
pub fn deploy(cfg: &ErsConfig, stored: f32, demand: f32, engine_omega: f32, dt: f32) -> ErsFlow {
    if dt <= 0.0 || demand <= 0.0 || stored <= 0.0 || engine_omega < OMEGA_EPSILON {
        return ErsFlow::default();
    }

    let requested = demand * cfg.max_deploy_power;
    let power = requested.min(stored / dt).min(cfg.max_deploy_power);
    let energy = (power * dt).min(stored);

    ErsFlow { torque: power / engine_omega, energy }
}

/// Harvest when off throttle at speed, up to the per-lap and storage caps.
pub fn recover(
    cfg: &ErsConfig,
    stored: f32,
    recovered_this_lap: f32,
    throttle: f32,
    rpm: f32,
    dt: f32,
) -> ErsFlow {
    if dt <= 0.0 || throttle >= cfg.recovery_throttle_threshold || rpm <= cfg.recovery_min_rpm {
        return ErsFlow::default();
    }

    let lap_room = (cfg.max_recovery_per_lap - recovered_this_lap).max(0.0);
    let store_room = (cfg.max_energy_per_lap - stored).max(0.0);
    let energy = (cfg.max_recovery_power * dt).min(lap_room).min(store_room);
    if energy <= 0.0 {
        return ErsFlow::default();
    }

    let omega = rpm_to_omega(rpm);
    ErsFlow { torque: -(energy / dt) / omega, energy }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn cfg() -> ErsConfig {
        ErsConfig::default()
    }

    #[test]
    fn deploy_torque_is_power_over_omega() {
        let c = cfg();
        let f = deploy(&c, 1.0e6, 1.0, 1000.0, 0.01);
        assert_relative_eq!(f.torque, c.max_deploy_power / 1000.0);
        assert_relative_eq!(f.energy, c.max_deploy_power * 0.01);
    }

    #[test]
    fn deploy_is_limited_by_stored_energy() {
        let c = cfg();
        let f = deploy(&c, 100.0, 1.0, 1000.0, 0.01);
        assert_relative_eq!(f.energy, 100.0);
        assert_relative_eq!(f.torque, (100.0 / 0.01) / 1000.0);
        assert_eq!(deploy(&c, 0.0, 1.0, 1000.0, 0.01), ErsFlow::default());
    }

    #[test]
    fn deploy_guards_zero_dt_and_stalled_engine() {
        let c = cfg();
        assert_eq!(deploy(&c, 1.0e6, 1.0, 1000.0, 0.0), ErsFlow::default());
        assert_eq!(deploy(&c, 1.0e6, 1.0, 0.0, 0.01), ErsFlow::default());
    }

    #[test]
    fn recovery_needs_lift_and_revs() {
        let c = cfg();
        assert_eq!(recover(&c, 0.0, 0.0, 0.5, 9000.0, 0.01), ErsFlow::default());
        assert_eq!(recover(&c, 0.0, 0.0, 0.0, c.recovery_min_rpm - 1.0, 0.01), ErsFlow::default());
        let f = recover(&c, 0.0, 0.0, 0.0, 9000.0, 0.01);
        assert_relative_eq!(f.energy, c.max_recovery_power * 0.01);
        assert!(f.torque < 0.0);
    }

    #[test]
    fn recovery_respects_lap_and_storage_caps() {
        let c = cfg();
        let near_lap_cap = recover(&c, 0.0, c.max_recovery_per_lap - 10.0, 0.0, 9000.0, 0.1);
        assert_relative_eq!(near_lap_cap.energy, 10.0, max_relative = 1e-3);
        let full = recover(&c, c.max_energy_per_lap, 0.0, 0.0, 9000.0, 0.1);
        assert_eq!(full, ErsFlow::default());
    }

    proptest! {
        #[test]
        fn stored_energy_stays_in_bounds(
            steps in proptest::collection::vec((0.0f32..1.0, 0.0f32..1.0, 4000.0f32..12500.0, 0.0f32..0.1), 1..300)
        ) {
            let c = cfg();
            let mut stored = c.initial_energy;
            let mut lap = 0.0;
            for (demand, throttle, rpm, dt) in steps {
                let d = deploy(&c, stored, demand, rpm_to_omega(rpm), dt);
                stored = (stored - d.energy).max(0.0);
                let r = recover(&c, stored, lap, throttle, rpm, dt);
                stored = (stored + r.energy).min(c.max_energy_per_lap);
                lap += r.energy;
                prop_assert!(stored >= 0.0);
                prop_assert!(stored <= c.max_energy_per_lap);
                prop_assert!(lap <= c.max_recovery_per_lap * (1.0 + 1e-6));
            }
        }
    }
}

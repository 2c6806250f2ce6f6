// ==============================================================================
// brake.rs — BRAKE FORCE, THERMAL FADE, LOCK-UP + ABS STATE MACHINE
// ------------------------------------------------------------------------------
// Per wheel, per tick (after the tire has produced this tick's slip ratio):
//
//   Released ──pedal──▶ Braking ──slip > lock──▶ Locked
//       ▲                  │  ▲                     │
//       └────no pedal──────┘  └──slip < unlock──────┘
//                          │
//                          └──ABS on, slip > activation/aggr──▶ AbsActive
//                                 (suppresses Locked; exits below release slip)
//
// While AbsActive the force cycles sinusoidally and is trimmed by
// target/slip whenever slip overshoots abs_target_slip.
//
// Brake force = pedal · max_force · axle_balance · effectiveness · abs_multiplier
//
// Thermal:
//   heat  = F_brake · |v_contact| · efficiency_loss · (lock multiplier)
//   cool  = h · A · (T − ambient) · (1 + airflow · speed)
//   T    += (heat − cool) / thermal_mass · dt, clamped to [ambient, max_temp]
// Fade:
//   effectiveness = max(min_eff, 1 − fade_factor · max(0, T − fade_start))
//
// Locked wheels also slide the tire across the road: flat-spot damage grows
// with distance slid and only an explicit reset clears it.
// ==============================================================================

use std::f32::consts::TAU;

use serde::Serialize;

use crate::dynamics::config::{BrakeConfig, TireConfig};
use crate::dynamics::types::{unit_clamp, Axle};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum BrakePhase {
    Released,
    Braking,
    Locked,
    AbsActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BrakeState {
    pub phase: BrakePhase,
    pub temperature: f32,       // °C, [ambient, max_temp]
    pub effectiveness: f32,     // [min_effectiveness, 1]
    pub brake_force: f32,       // N at the contact patch
    pub locked: bool,
    pub lock_intensity: f32,    // 0..1
    pub abs_active: bool,
    pub abs_phase: f32,         // rad, [0, TAU)
    pub flat_spot: f32,         // 0..1, monotonic until reset
}

impl BrakeState {
    pub fn new(cfg: &BrakeConfig) -> Self {
        Self {
            phase: BrakePhase::Released,
            temperature: cfg.ambient_temp,
            effectiveness: 1.0,
            brake_force: 0.0,
            locked: false,
            lock_intensity: 0.0,
            abs_active: false,
            abs_phase: 0.0,
            flat_spot: 0.0,
        }
    }

    fn set_phase(&mut self, phase: BrakePhase) {
        self.phase = phase;
        self.locked = phase == BrakePhase::Locked;
        self.abs_active = phase == BrakePhase::AbsActive;
    }
}

/// Per-tick inputs for one wheel's brake.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrakeInput {
    pub pedal: f32,
    pub slip_ratio: f32,        // this tick, from the tire
    pub contact_speed: f32,     // m/s, |v_long| at the contact patch
    pub vehicle_speed: f32,     // m/s, for airflow cooling
    pub abs_enabled: bool,      // runtime toggle (host ABS switch)
}

// ====================================================================
// Pure pieces
// ====================================================================

pub fn fade_effectiveness(cfg: &BrakeConfig, temperature: f32) -> f32 {
    let over = (temperature - cfg.fade_start_temp).max(0.0);
    (1.0 - cfg.fade_factor * over).max(cfg.min_effectiveness)
}

/// Front/rear split of the pedal demand for one wheel on `axle`.
#[inline]
pub fn axle_balance(cfg: &BrakeConfig, axle: Axle) -> f32 {
    match axle {
        Axle::Front => cfg.front_bias,
        Axle::Rear => 1.0 - cfg.front_bias,
    }
}

/// ABS force multiplier in [`abs_min_multiplier`, 1]: a sinusoid between the
/// two, scaled down by `target / slip` while braking slip overshoots the target.
#[inline]
pub fn abs_multiplier(cfg: &BrakeConfig, phase: f32, slip: f32) -> f32 {
    let lo = cfg.abs_min_multiplier;
    let cycle = lo + (1.0 - lo) * 0.5 * (1.0 + phase.sin());
    let slip = (-slip).max(0.0);
    let trim = if slip > cfg.abs_target_slip { cfg.abs_target_slip / slip } else { 1.0 };
    (cycle * trim).clamp(lo, 1.0)
}

pub fn update_temperature(cfg: &BrakeConfig, state: &BrakeState, contact_speed: f32, vehicle_speed: f32, dt: f32) -> f32 {
    let lock_mult = if state.locked { cfg.lock_heat_multiplier } else { 1.0 };
    let heat = state.brake_force * contact_speed.abs() * cfg.efficiency_loss * lock_mult;

    let airflow = 1.0 + cfg.airflow_factor * vehicle_speed.abs();
    let cool = cfg.heat_transfer_coeff * cfg.cooling_area * (state.temperature - cfg.ambient_temp) * airflow;

    let t = state.temperature + (heat - cool) / cfg.thermal_mass * dt;
    t.clamp(cfg.ambient_temp, cfg.max_temp)
}

// ====================================================================
// State machine
// ====================================================================

fn next_phase(cfg: &BrakeConfig, axle: Axle, prev: BrakePhase, input: &BrakeInput) -> BrakePhase {
    if input.pedal < cfg.min_pedal {
        return BrakePhase::Released;
    }

    // braking slip is negative; only its magnitude matters here
    let slip = (-input.slip_ratio).max(0.0);

    if input.abs_enabled {
        let activation = cfg.abs_activation_slip / cfg.abs_aggressiveness.get(axle);
        match prev {
            BrakePhase::AbsActive if slip >= cfg.abs_release_slip => return BrakePhase::AbsActive,
            _ if slip > activation => return BrakePhase::AbsActive,
            _ => {}
        }
    }

    if cfg.lockup_enabled {
        match prev {
            BrakePhase::Locked if slip >= cfg.unlock_slip => return BrakePhase::Locked,
            BrakePhase::Braking if slip > cfg.lock_slip => return BrakePhase::Locked,
            _ => {}
        }
    }

    BrakePhase::Braking
}

/// Advance one wheel's brake by one tick. Returns the brake force (N) to apply
/// at the contact patch, opposing wheel rotation.
pub fn step_brake(
    cfg: &BrakeConfig,
    tire: &TireConfig,
    axle: Axle,
    state: &mut BrakeState,
    input: &BrakeInput,
    dt: f32,
) -> f32 {
    let pedal = unit_clamp(input.pedal);
    let input = BrakeInput { pedal, ..*input };

    let phase = next_phase(cfg, axle, state.phase, &input);
    if phase != BrakePhase::AbsActive {
        state.abs_phase = 0.0;
    }
    state.set_phase(phase);

    // ABS cycling
    let multiplier = if state.abs_active {
        state.abs_phase = (state.abs_phase + TAU * cfg.abs_frequency * dt).rem_euclid(TAU);
        abs_multiplier(cfg, state.abs_phase, input.slip_ratio)
    } else {
        1.0
    };

    state.lock_intensity = if state.locked {
        let slip = (-input.slip_ratio).max(0.0);
        ((slip - cfg.unlock_slip) / (1.0 - cfg.unlock_slip).max(1e-3)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    state.brake_force = if phase == BrakePhase::Released {
        0.0
    } else {
        pedal * cfg.max_force * axle_balance(cfg, axle) * state.effectiveness * multiplier
    };

    // thermal, then fade for the next tick's force
    state.temperature = update_temperature(cfg, state, input.contact_speed, input.vehicle_speed, dt);
    state.effectiveness = fade_effectiveness(cfg, state.temperature);

    if state.locked {
        let slid = input.contact_speed.abs() * dt;
        state.flat_spot = (state.flat_spot + tire.flat_spot_rate * state.lock_intensity.max(0.25) * slid).clamp(0.0, 1.0);
    }

    state.brake_force
}

/// Pit / new session: cool the brakes and fit undamaged tires.
pub fn reset_brake(cfg: &BrakeConfig, state: &mut BrakeState) {
    *state = BrakeState::new(cfg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn cfg() -> BrakeConfig {
        BrakeConfig::default()
    }

    fn input(pedal: f32, slip: f32) -> BrakeInput {
        BrakeInput { pedal, slip_ratio: slip, contact_speed: 40.0, vehicle_speed: 40.0, abs_enabled: false }
    }

    #[test]
    fn full_effectiveness_below_fade_start() {
        let c = cfg();
        for t in [25.0, 300.0, 799.0, 800.0] {
            assert_eq!(fade_effectiveness(&c, t), 1.0);
        }
    }

    #[test]
    fn fade_decreases_and_floors() {
        let c = cfg();
        assert_relative_eq!(fade_effectiveness(&c, 900.0), 0.8, max_relative = 1e-5);
        let mut prev = 1.0;
        for t in (801..1200).step_by(20) {
            let e = fade_effectiveness(&c, t as f32);
            assert!(e <= prev);
            assert!(e >= c.min_effectiveness);
            prev = e;
        }
        assert_eq!(fade_effectiveness(&c, 1200.0), c.min_effectiveness);
    }

    #[test]
    fn force_follows_pedal_and_balance() {
        let c = cfg();
        let t = TireConfig::default();
        let mut s = BrakeState::new(&c);
        let f = step_brake(&c, &t, Axle::Front, &mut s, &input(0.5, 0.0), DT);
        assert_relative_eq!(f, 0.5 * c.max_force * c.front_bias);
        let mut s = BrakeState::new(&c);
        let r = step_brake(&c, &t, Axle::Rear, &mut s, &input(0.5, 0.0), DT);
        assert_relative_eq!(r, 0.5 * c.max_force * (1.0 - c.front_bias));
    }

    #[test]
    fn released_pedal_means_no_force() {
        let c = cfg();
        let t = TireConfig::default();
        let mut s = BrakeState::new(&c);
        assert_eq!(step_brake(&c, &t, Axle::Front, &mut s, &input(0.01, -0.5), DT), 0.0);
        assert_eq!(s.phase, BrakePhase::Released);
    }

    #[test]
    fn lock_up_has_hysteresis() {
        let c = BrakeConfig { abs_enabled: false, ..cfg() };
        let t = TireConfig::default();
        let mut s = BrakeState::new(&c);

        step_brake(&c, &t, Axle::Front, &mut s, &input(1.0, -0.05), DT);
        assert_eq!(s.phase, BrakePhase::Braking);

        step_brake(&c, &t, Axle::Front, &mut s, &input(1.0, -0.3), DT);
        assert!(s.locked);

        // inside the band: stays locked
        step_brake(&c, &t, Axle::Front, &mut s, &input(1.0, -0.15), DT);
        assert!(s.locked);

        step_brake(&c, &t, Axle::Front, &mut s, &input(1.0, -0.05), DT);
        assert!(!s.locked);
        assert_eq!(s.phase, BrakePhase::Braking);
    }

    #[test]
    fn pedal_release_unlocks() {
        let c = cfg();
        let t = TireConfig::default();
        let mut s = BrakeState::new(&c);
        step_brake(&c, &t, Axle::Front, &mut s, &input(1.0, 0.0), DT);
        step_brake(&c, &t, Axle::Front, &mut s, &input(1.0, -0.9), DT);
        assert!(s.locked);
        step_brake(&c, &t, Axle::Front, &mut s, &input(0.0, -0.9), DT);
        assert!(!s.locked);
        assert_eq!(s.lock_intensity, 0.0);
    }

    #[test]
    fn abs_suppresses_lock_and_cycles_force() {
        let c = cfg();
        let t = TireConfig::default();
        let mut s = BrakeState::new(&c);
        let abs = |slip| BrakeInput { abs_enabled: true, ..input(1.0, slip) };

        step_brake(&c, &t, Axle::Front, &mut s, &abs(0.0), DT);
        step_brake(&c, &t, Axle::Front, &mut s, &abs(-0.2), DT);
        assert!(s.abs_active);
        assert!(!s.locked);

        let mut forces = Vec::new();
        for _ in 0..10 {
            forces.push(step_brake(&c, &t, Axle::Front, &mut s, &abs(-0.2), DT));
            assert!(!s.locked);
        }
        let full = c.max_force * c.front_bias;
        let lo = forces.iter().cloned().fold(f32::INFINITY, f32::min);
        let hi = forces.iter().cloned().fold(0.0, f32::max);
        assert!(lo < hi);
        assert!(hi <= full + 1e-3);
        assert!(lo >= full * c.abs_min_multiplier - 1e-3);

        step_brake(&c, &t, Axle::Front, &mut s, &abs(-0.01), DT);
        assert!(!s.abs_active);
    }

    #[test]
    fn abs_trims_force_while_slip_overshoots_target() {
        let c = cfg();
        let peak = std::f32::consts::FRAC_PI_2;
        assert_relative_eq!(abs_multiplier(&c, peak, -c.abs_target_slip), 1.0);
        assert_relative_eq!(abs_multiplier(&c, peak, -0.05), 1.0);
        assert_relative_eq!(abs_multiplier(&c, peak, -0.2), c.abs_target_slip / 0.2);
        assert_relative_eq!(abs_multiplier(&c, peak, -1.0), c.abs_min_multiplier);

        let mut prev = f32::INFINITY;
        for i in 0..20 {
            let m = abs_multiplier(&c, peak, -(c.abs_target_slip + 0.05 * i as f32));
            assert!(m <= prev);
            assert!(m >= c.abs_min_multiplier);
            prev = m;
        }
    }

    #[test]
    fn lockup_disabled_never_locks() {
        let c = BrakeConfig { abs_enabled: false, lockup_enabled: false, ..cfg() };
        let t = TireConfig::default();
        let mut s = BrakeState::new(&c);
        step_brake(&c, &t, Axle::Front, &mut s, &input(1.0, 0.0), DT);
        for _ in 0..60 {
            let f = step_brake(&c, &t, Axle::Front, &mut s, &input(1.0, -1.0), DT);
            assert_eq!(s.phase, BrakePhase::Braking);
            assert!(!s.locked);
            assert!(!s.abs_active);
            assert_eq!(s.lock_intensity, 0.0);
            assert!(f > 0.0);
        }
        assert_eq!(s.flat_spot, 0.0);
    }

    #[test]
    fn abs_clears_an_existing_lock() {
        let c = cfg();
        let t = TireConfig::default();
        let mut s = BrakeState::new(&c);
        step_brake(&c, &t, Axle::Rear, &mut s, &input(1.0, 0.0), DT);
        step_brake(&c, &t, Axle::Rear, &mut s, &input(1.0, -0.6), DT);
        assert!(s.locked);
        let on = BrakeInput { abs_enabled: true, ..input(1.0, -0.6) };
        step_brake(&c, &t, Axle::Rear, &mut s, &on, DT);
        assert!(s.abs_active);
        assert!(!s.locked);
    }

    #[test]
    fn rear_abs_triggers_earlier_with_higher_aggressiveness() {
        let c = cfg();
        let t = TireConfig::default();
        // between rear threshold (0.125) and front threshold (0.15)
        let on = BrakeInput { abs_enabled: true, ..input(1.0, -0.14) };
        let mut front = BrakeState::new(&c);
        let mut rear = BrakeState::new(&c);
        step_brake(&c, &t, Axle::Front, &mut front, &on, DT);
        step_brake(&c, &t, Axle::Rear, &mut rear, &on, DT);
        assert!(!front.abs_active);
        assert!(rear.abs_active);
    }

    #[test]
    fn sustained_braking_heats_and_fades() {
        let c = cfg();
        let t = TireConfig::default();
        let mut s = BrakeState::new(&c);
        let hard = BrakeInput { pedal: 1.0, slip_ratio: -0.05, contact_speed: 80.0, vehicle_speed: 80.0, abs_enabled: false };
        for _ in 0..(60 * 20) {
            step_brake(&c, &t, Axle::Front, &mut s, &hard, DT);
            assert!(s.temperature <= c.max_temp);
        }
        assert!(s.temperature > c.fade_start_temp);
        assert!(s.effectiveness < 1.0);
        assert!(s.effectiveness >= c.min_effectiveness);
    }

    #[test]
    fn locked_sliding_builds_flat_spot_until_reset() {
        let c = BrakeConfig { abs_enabled: false, ..cfg() };
        let t = TireConfig::default();
        let mut s = BrakeState::new(&c);
        step_brake(&c, &t, Axle::Front, &mut s, &input(1.0, 0.0), DT);
        let mut prev = 0.0;
        for _ in 0..30 {
            step_brake(&c, &t, Axle::Front, &mut s, &input(1.0, -1.0), DT);
            assert!(s.flat_spot >= prev);
            prev = s.flat_spot;
        }
        assert!(s.flat_spot > 0.0);
        reset_brake(&c, &mut s);
        assert_eq!(s.flat_spot, 0.0);
        assert_eq!(s.temperature, c.ambient_temp);
    }

    proptest! {
        #[test]
        fn never_locked_and_abs_at_once(
            steps in proptest::collection::vec((0.0f32..1.0, -1.0f32..0.2, any::<bool>()), 1..200)
        ) {
            let c = cfg();
            let t = TireConfig::default();
            let mut s = BrakeState::new(&c);
            for (pedal, slip, abs) in steps {
                let inp = BrakeInput { pedal, slip_ratio: slip, contact_speed: 30.0, vehicle_speed: 30.0, abs_enabled: abs };
                step_brake(&c, &t, Axle::Front, &mut s, &inp, DT);
                prop_assert!(!(s.locked && s.abs_active));
                prop_assert!(s.temperature >= c.ambient_temp && s.temperature <= c.max_temp);
                prop_assert!(s.effectiveness >= c.min_effectiveness && s.effectiveness <= 1.0);
                prop_assert!(s.brake_force >= 0.0);
            }
        }
    }
}

// ==============================================================================
// tire.rs — PACEJKA TIRE MODEL WITH THERMAL + WEAR STATE
// ------------------------------------------------------------------------------
// Per wheel, per tick:
// 1) slip ratio from wheel circumferential speed vs contact-patch speed
//    (kinematic definition, authoritative for the whole vehicle)
// 2) slip angle from contact-patch velocity
// 3) grip coefficient:
//      lerp(dry, wet, wetness) · gaussian(T) · (1 - wear/100) · flat-spot loss
// 4) lateral force (magic formula) and longitudinal force (linear in slip,
//    capped by grip · Fz), then a combined-slip friction ellipse
// 5) explicit Euler thermal + wear update; the heat term's speed is
//    max(|v_long|, |ω·r|), the same reference the slip ratio divides by
//
// Signs:
// - slip ratio > 0 under drive, < 0 under braking
// - lateral force opposes lateral sliding (v_lat > 0 => Fy < 0)
// ==============================================================================

use serde::Serialize;

use crate::dynamics::config::TireConfig;
use crate::dynamics::types::{lerp, unit_clamp, SLIP_SPEED_EPSILON};

/// Upper sanity bound for tread temperature.
pub const TIRE_MAX_TEMP: f32 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WheelState {
    pub slip_ratio: f32,        // signed, |s| <= max_slip_ratio
    pub slip_angle: f32,        // rad
    pub normal_force: f32,      // N, >= 0
    pub angular_velocity: f32,  // rad/s
    pub temperature: f32,       // °C
    pub wear: f32,              // 0..100 %
    pub grip: f32,              // current friction coefficient
    pub lateral_force: f32,     // N
    pub longitudinal_force: f32,// N
}

impl WheelState {
    pub fn new(cfg: &TireConfig) -> Self {
        Self {
            slip_ratio: 0.0,
            slip_angle: 0.0,
            normal_force: 0.0,
            angular_velocity: 0.0,
            temperature: cfg.blanket_temp.clamp(cfg.ambient_temp, TIRE_MAX_TEMP),
            wear: 0.0,
            grip: cfg.dry_grip,
            lateral_force: 0.0,
            longitudinal_force: 0.0,
        }
    }

    /// Fresh set of tires: thermal + wear state back to new, motion state kept.
    pub fn fit_new_tire(&mut self, cfg: &TireConfig) {
        self.temperature = cfg.blanket_temp.clamp(cfg.ambient_temp, TIRE_MAX_TEMP);
        self.wear = 0.0;
    }
}

/// Per-tick contact conditions for one wheel.
#[derive(Debug, Clone, Copy, Default)]
pub struct TireInput {
    pub v_long: f32,        // m/s, contact-patch velocity along the wheel heading
    pub v_lat: f32,         // m/s, across the wheel heading
    pub normal_force: f32,  // N
    pub wetness: f32,       // 0 dry .. 1 wet
    pub flat_spot: f32,     // 0..1 accumulated lock-up damage
}

// ====================================================================
// Slip
// ====================================================================

/// (ω·r − v) / max(|v|, |ω·r|), zero below [`SLIP_SPEED_EPSILON`].
#[inline]
pub fn slip_ratio(wheel_surface_speed: f32, v_long: f32, max_slip: f32) -> f32 {
    let denom = v_long.abs().max(wheel_surface_speed.abs());
    if denom < SLIP_SPEED_EPSILON {
        return 0.0;
    }
    ((wheel_surface_speed - v_long) / denom).clamp(-max_slip, max_slip)
}

#[inline]
pub fn slip_angle(v_lat: f32, v_long: f32) -> f32 {
    if v_lat.abs() < 1e-6 {
        return 0.0;
    }
    v_lat.atan2(v_long.abs().max(SLIP_SPEED_EPSILON))
}

// ====================================================================
// Force curves
// ====================================================================

/// Magic formula `D·sin(C·atan(Bα − E·(Bα − atan(Bα))))`, before any scaling.
#[inline]
pub fn pacejka(cfg: &TireConfig, alpha: f32) -> f32 {
    let ba = cfg.pacejka_b * alpha;
    let inner = ba - cfg.pacejka_e * (ba - ba.atan());
    cfg.pacejka_d * (cfg.pacejka_c * inner.atan()).sin()
}

/// Gaussian temperature window: exactly 1.0 at the optimum.
#[inline]
pub fn thermal_grip(cfg: &TireConfig, temperature: f32) -> f32 {
    let x = (temperature - cfg.optimal_temp) / cfg.temp_window;
    (-0.5 * x * x).exp()
}

/// Current friction coefficient of the tire on this surface.
pub fn grip_coefficient(cfg: &TireConfig, temperature: f32, wear: f32, wetness: f32, flat_spot: f32) -> f32 {
    let surface = lerp(cfg.dry_grip, cfg.wet_grip, unit_clamp(wetness));
    let worn = 1.0 - wear.clamp(0.0, 100.0) / 100.0;
    let flat = 1.0 - unit_clamp(flat_spot) * cfg.flat_spot_grip_loss;
    (surface * thermal_grip(cfg, temperature) * worn * flat).max(0.0)
}

/// Lateral force, opposing the slip angle, scaled by grip and load.
pub fn lateral_force(cfg: &TireConfig, alpha: f32, normal_force: f32, grip: f32) -> f32 {
    let grip_scale = grip / cfg.dry_grip;
    let load_scale = normal_force / cfg.reference_load;
    -pacejka(cfg, alpha) * grip_scale * load_scale
}

/// Linear in slip, capped at `grip · Fz`.
pub fn longitudinal_force(cfg: &TireConfig, slip: f32, normal_force: f32, grip: f32) -> f32 {
    let cap = grip * normal_force;
    (cfg.longitudinal_stiffness * slip * normal_force).clamp(-cap, cap)
}

/// Scale (fx, fy) onto the friction ellipse of radius `cap` if they exceed it.
pub fn friction_ellipse(fx: f32, fy: f32, cap: f32) -> (f32, f32) {
    if cap <= 0.0 {
        return (0.0, 0.0);
    }
    let nx = fx / cap;
    let ny = fy / cap;
    let ellipse = nx * nx + ny * ny;
    if ellipse > 1.0 {
        let s = 1.0 / ellipse.sqrt();
        (fx * s, fy * s)
    } else {
        (fx, fy)
    }
}

// ====================================================================
// Thermal + wear
// ====================================================================

pub fn update_temperature(
    cfg: &TireConfig,
    temperature: f32,
    slip: f32,
    normal_force: f32,
    wheel_speed: f32,
    dt: f32,
) -> f32 {
    let heating = cfg.heat_generation * slip.abs() * normal_force * wheel_speed.abs();
    let cooling = cfg.cooling_rate * (temperature - cfg.ambient_temp);
    (temperature + (heating - cooling) * dt).clamp(cfg.ambient_temp, TIRE_MAX_TEMP)
}

pub fn update_wear(
    cfg: &TireConfig,
    wear: f32,
    slip: f32,
    temperature: f32,
    normal_force: f32,
    dt: f32,
) -> f32 {
    let slip_term = 1.0 + cfg.wear_slip_factor * slip.abs();
    let temp_term = 1.0 + cfg.wear_temp_factor * (temperature - cfg.optimal_temp).max(0.0);
    let load_term = (normal_force.max(0.0) / cfg.reference_load).powf(cfg.wear_load_exponent);
    let rate = cfg.wear_base_rate * slip_term * temp_term * load_term;
    (wear + rate.max(0.0) * dt).clamp(0.0, 100.0)
}

// ====================================================================
// Tire step
// ====================================================================

/// Compute forces from the current wheel spin and contact conditions, then
/// integrate temperature and wear. `angular_velocity` is read, not written.
pub fn solve_tire(cfg: &TireConfig, radius: f32, state: &mut WheelState, input: &TireInput, dt: f32) {
    let fz = input.normal_force.max(0.0);
    let surface_speed = state.angular_velocity * radius;

    state.normal_force = fz;
    state.slip_ratio = slip_ratio(surface_speed, input.v_long, cfg.max_slip_ratio);
    state.slip_angle = slip_angle(input.v_lat, input.v_long);
    state.grip = grip_coefficient(cfg, state.temperature, state.wear, input.wetness, input.flat_spot);

    if fz <= 0.0 {
        state.longitudinal_force = 0.0;
        state.lateral_force = 0.0;
    } else {
        let fx = longitudinal_force(cfg, state.slip_ratio, fz, state.grip);
        let fy = lateral_force(cfg, state.slip_angle, fz, state.grip);
        let (fx, fy) = friction_ellipse(fx, fy, state.grip * fz);
        state.longitudinal_force = fx;
        state.lateral_force = fy;
    }

    // tread slides at the faster of road and wheel surface, so a locked wheel still heats
    let sliding_speed = input.v_long.abs().max(surface_speed.abs());
    state.temperature = update_temperature(cfg, state.temperature, state.slip_ratio, fz, sliding_speed, dt);
    state.wear = update_wear(cfg, state.wear, state.slip_ratio, state.temperature, fz, dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn cfg() -> TireConfig {
        TireConfig::default()
    }

    #[test]
    fn zero_slip_angle_gives_zero_lateral_force() {
        let c = cfg();
        assert_eq!(pacejka(&c, 0.0), 0.0);
        assert_eq!(lateral_force(&c, 0.0, 4000.0, 1.3), 0.0);
    }

    #[test]
    fn magic_formula_reference_point() {
        let c = TireConfig { pacejka_b: 10.0, pacejka_c: 1.5, pacejka_d: 3000.0, pacejka_e: 0.0, ..cfg() };
        // Bα = 0.5, atan = 0.4636, sin(0.6954) = 0.6408
        assert_relative_eq!(pacejka(&c, 0.05), 1922.5, max_relative = 1e-3);
    }

    #[test]
    fn lateral_force_opposes_slip() {
        let c = cfg();
        assert!(lateral_force(&c, 0.05, 3000.0, c.dry_grip) < 0.0);
        assert!(lateral_force(&c, -0.05, 3000.0, c.dry_grip) > 0.0);
    }

    #[test]
    fn thermal_grip_peaks_at_optimum_and_falls_off() {
        let c = cfg();
        assert_eq!(thermal_grip(&c, c.optimal_temp), 1.0);
        let mut prev = 1.0;
        for d in 1..60 {
            let hot = thermal_grip(&c, c.optimal_temp + d as f32);
            let cold = thermal_grip(&c, c.optimal_temp - d as f32);
            assert!(hot < prev);
            assert_abs_diff_eq!(hot, cold, epsilon = 1e-6);
            prev = hot;
        }
    }

    #[test]
    fn grip_blends_wetness_wear_and_flat_spots() {
        let c = cfg();
        let t = c.optimal_temp;
        assert_relative_eq!(grip_coefficient(&c, t, 0.0, 0.0, 0.0), c.dry_grip);
        assert_relative_eq!(grip_coefficient(&c, t, 0.0, 1.0, 0.0), c.wet_grip);
        assert_relative_eq!(grip_coefficient(&c, t, 50.0, 0.0, 0.0), c.dry_grip * 0.5);
        assert_relative_eq!(
            grip_coefficient(&c, t, 0.0, 0.0, 1.0),
            c.dry_grip * (1.0 - c.flat_spot_grip_loss)
        );
    }

    #[test]
    fn equal_speeds_mean_zero_slip() {
        for v in [0.0_f32, 0.3, 5.0, 42.0, 90.0] {
            assert_eq!(slip_ratio(v, v, 1.0), 0.0);
        }
    }

    #[test]
    fn slip_is_zero_near_standstill_and_bounded() {
        assert_eq!(slip_ratio(0.2, 0.1, 1.0), 0.0);
        assert_eq!(slip_ratio(0.0, 30.0, 0.8), -0.8);
        assert_relative_eq!(slip_ratio(33.0, 30.0, 1.0), 3.0 / 33.0);
        assert_eq!(slip_angle(0.0, 0.0), 0.0);
    }

    #[test]
    fn longitudinal_force_is_capped_by_grip() {
        let c = cfg();
        assert_relative_eq!(longitudinal_force(&c, 0.01, 3000.0, 1.5), c.longitudinal_stiffness * 0.01 * 3000.0);
        assert_relative_eq!(longitudinal_force(&c, 0.9, 3000.0, 1.5), 4500.0);
        assert_relative_eq!(longitudinal_force(&c, -0.9, 3000.0, 1.5), -4500.0);
    }

    #[test]
    fn friction_ellipse_scales_combined_demand() {
        let (fx, fy) = friction_ellipse(3000.0, 4000.0, 2500.0);
        assert_relative_eq!((fx * fx + fy * fy).sqrt(), 2500.0, max_relative = 1e-5);
        assert_eq!(friction_ellipse(100.0, 100.0, 2500.0), (100.0, 100.0));
    }

    #[test]
    fn temperature_heats_with_slip_and_cools_to_ambient() {
        let c = cfg();
        let hot = update_temperature(&c, 80.0, 0.1, 3000.0, 50.0, 0.1);
        assert!(hot > 80.0);
        let cool = update_temperature(&c, 80.0, 0.0, 3000.0, 50.0, 0.1);
        assert!(cool < 80.0);
        assert_eq!(update_temperature(&c, c.ambient_temp, 0.0, 0.0, 0.0, 10.0), c.ambient_temp);
        assert_eq!(update_temperature(&c, 80.0, 0.1, 3000.0, 50.0, 0.0), 80.0);
    }

    #[test]
    fn wear_grows_faster_with_slip_and_heat() {
        let c = cfg();
        let base = update_wear(&c, 10.0, 0.0, c.optimal_temp, c.reference_load, 1.0);
        assert_relative_eq!(base, 10.0 + c.wear_base_rate);
        let slipping = update_wear(&c, 10.0, 0.2, c.optimal_temp, c.reference_load, 1.0);
        let overheated = update_wear(&c, 10.0, 0.0, c.optimal_temp + 40.0, c.reference_load, 1.0);
        assert!(slipping > base);
        assert!(overheated > base);
        assert_eq!(update_wear(&c, 99.999, 1.0, 250.0, 9000.0, 100.0), 100.0);
    }

    #[test]
    fn airborne_wheel_makes_no_force() {
        let c = cfg();
        let mut s = WheelState::new(&c);
        s.angular_velocity = 100.0;
        solve_tire(&c, 0.33, &mut s, &TireInput { v_long: 20.0, v_lat: 3.0, ..Default::default() }, 0.01);
        assert_eq!(s.longitudinal_force, 0.0);
        assert_eq!(s.lateral_force, 0.0);
        assert!(s.slip_ratio > 0.0);
    }

    #[test]
    fn locked_slide_heats_the_tread() {
        let c = cfg();
        let mut s = WheelState::new(&c);
        s.temperature = c.optimal_temp;
        s.angular_velocity = 0.0;
        let input = TireInput { v_long: 40.0, v_lat: 0.0, normal_force: 3000.0, wetness: 0.0, flat_spot: 0.0 };
        for _ in 0..60 {
            solve_tire(&c, 0.33, &mut s, &input, 1.0 / 60.0);
        }
        assert_eq!(s.slip_ratio, -c.max_slip_ratio);
        assert!(s.temperature > c.optimal_temp + 10.0, "tread at {}", s.temperature);
    }

    #[test]
    fn braking_wheel_pushes_backwards() {
        let c = cfg();
        let mut s = WheelState::new(&c);
        s.temperature = c.optimal_temp;
        s.angular_velocity = 25.0 / 0.33 * 0.9;
        let input = TireInput { v_long: 25.0, v_lat: 0.0, normal_force: 3000.0, wetness: 0.0, flat_spot: 0.0 };
        solve_tire(&c, 0.33, &mut s, &input, 1.0 / 60.0);
        assert!(s.slip_ratio < 0.0);
        assert!(s.longitudinal_force < 0.0);
        assert_eq!(s.lateral_force, 0.0);
    }
}

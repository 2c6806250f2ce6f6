//! Session configuration: one flat record of named numeric fields per module.
//!
//! Every module record is `#[serde(default)]`, so a JSON file only needs the
//! fields it overrides. `wheels` is required: a corner with no entry is reported
//! at initialization and that wheel contributes no force for the session.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dynamics::error::{ConfigError, SimError};
use crate::dynamics::tire::TIRE_MAX_TEMP;
use crate::dynamics::types::{Corner, PerAxle, PerWheel};

pub const CONFIG_VERSION: u32 = 1;

/// Accepted ambient (air / track) temperatures, °C.
pub const AMBIENT_TEMP_RANGE: (f32, f32) = (-50.0, 80.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub chassis: ChassisConfig,
    #[serde(default)]
    pub tire: TireConfig,
    #[serde(default)]
    pub brakes: BrakeConfig,
    #[serde(default)]
    pub suspension: SuspensionConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub gearbox: GearboxConfig,
    #[serde(default)]
    pub ers: ErsConfig,
    #[serde(default)]
    pub traction: TractionConfig,
    pub wheels: Vec<WheelConfig>,
}

fn default_version() -> u32 { CONFIG_VERSION }

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChassisConfig {
    pub mass: f32,                      // kg (car + driver)
    pub front_weight_distribution: f32, // 0..1 static share on the front axle
    pub cg_height: f32,                 // m
    pub wheelbase: f32,                 // m
    pub track_width: f32,               // m
    pub downforce_front_share: f32,     // 0..1 aero balance
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            mass: 798.0,
            front_weight_distribution: 0.45,
            cg_height: 0.30,
            wheelbase: 3.6,
            track_width: 1.6,
            downforce_front_share: 0.42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireConfig {
    // Pacejka lateral coefficients (D is the peak force at `reference_load`)
    pub pacejka_b: f32,
    pub pacejka_c: f32,
    pub pacejka_d: f32,
    pub pacejka_e: f32,
    pub reference_load: f32,        // N

    pub dry_grip: f32,              // peak friction coefficient, dry
    pub wet_grip: f32,              // peak friction coefficient, fully wet
    pub longitudinal_stiffness: f32,// force per unit slip per N of load
    pub max_slip_ratio: f32,

    // thermal
    pub optimal_temp: f32,          // °C
    pub temp_window: f32,           // °C, sigma of the grip gaussian
    pub ambient_temp: f32,          // °C
    pub blanket_temp: f32,          // °C, new tires come off the warmers at this
    pub heat_generation: f32,       // k_gen
    pub cooling_rate: f32,          // k_cool, 1/s

    // wear (percent per second at reference conditions)
    pub wear_base_rate: f32,
    pub wear_slip_factor: f32,
    pub wear_temp_factor: f32,
    pub wear_load_exponent: f32,

    // lock-up flat spots
    pub flat_spot_rate: f32,        // damage per metre slid while locked
    pub flat_spot_grip_loss: f32,   // grip lost at full damage (0..1)
}

impl Default for TireConfig {
    fn default() -> Self {
        Self {
            pacejka_b: 10.0,
            pacejka_c: 1.5,
            pacejka_d: 3000.0,
            pacejka_e: 0.0,
            reference_load: 2000.0,

            dry_grip: 1.5,
            wet_grip: 1.0,
            longitudinal_stiffness: 15.0,
            max_slip_ratio: 1.0,

            optimal_temp: 100.0,
            temp_window: 25.0,
            ambient_temp: 25.0,
            blanket_temp: 90.0,
            heat_generation: 1.6e-4,
            cooling_rate: 0.02,

            wear_base_rate: 0.002,
            wear_slip_factor: 5.0,
            wear_temp_factor: 0.02,
            wear_load_exponent: 1.2,

            flat_spot_rate: 5.0e-4,
            flat_spot_grip_loss: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrakeConfig {
    pub max_force: f32,             // N at the contact patch, per wheel, full pedal
    pub front_bias: f32,            // 0..1
    pub min_pedal: f32,             // pedal below this counts as released

    // lock-up (hysteresis band)
    pub lockup_enabled: bool,
    pub lock_slip: f32,
    pub unlock_slip: f32,

    // anti-lock
    pub abs_enabled: bool,
    pub abs_activation_slip: f32,
    pub abs_release_slip: f32,
    pub abs_target_slip: f32,       // force is trimmed while slip is above this
    pub abs_aggressiveness: PerAxle<f32>,
    pub abs_frequency: f32,         // Hz
    pub abs_min_multiplier: f32,    // 0..1

    // thermal
    pub ambient_temp: f32,          // °C
    pub max_temp: f32,              // °C
    pub thermal_mass: f32,          // J/°C
    pub efficiency_loss: f32,       // share of braking power that heats the disc
    pub lock_heat_multiplier: f32,
    pub heat_transfer_coeff: f32,   // W/(m²·°C)
    pub cooling_area: f32,          // m²
    pub airflow_factor: f32,        // cooling gain per m/s

    // fade
    pub fade_start_temp: f32,       // °C
    pub fade_factor: f32,           // effectiveness lost per °C
    pub min_effectiveness: f32,
}

impl Default for BrakeConfig {
    fn default() -> Self {
        Self {
            max_force: 9000.0,
            front_bias: 0.58,
            min_pedal: 0.05,

            lockup_enabled: true,
            lock_slip: 0.20,
            unlock_slip: 0.10,

            abs_enabled: true,
            abs_activation_slip: 0.15,
            abs_release_slip: 0.05,
            abs_target_slip: 0.10,
            abs_aggressiveness: PerAxle::new(1.0, 1.2),
            abs_frequency: 12.0,
            abs_min_multiplier: 0.4,

            ambient_temp: 25.0,
            max_temp: 1200.0,
            thermal_mass: 1500.0,
            efficiency_loss: 0.9,
            lock_heat_multiplier: 1.5,
            heat_transfer_coeff: 60.0,
            cooling_area: 0.15,
            airflow_factor: 0.05,

            fade_start_temp: 800.0,
            fade_factor: 0.002,
            min_effectiveness: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspensionConfig {
    pub spring_rate: PerAxle<f32>,  // N/m
    pub damping: PerAxle<f32>,      // N·s/m
    pub bump_multiplier: f32,
    pub rebound_multiplier: f32,
    pub max_compression: f32,       // m
    pub max_extension: f32,         // m
    pub arb_stiffness: PerAxle<f32>,// N per degree of roll across the track
}

impl Default for SuspensionConfig {
    fn default() -> Self {
        Self {
            spring_rate: PerAxle::new(120_000.0, 100_000.0),
            damping: PerAxle::new(8_000.0, 7_000.0),
            bump_multiplier: 1.0,
            rebound_multiplier: 1.4,
            max_compression: 0.04,
            max_extension: 0.03,
            arb_stiffness: PerAxle::new(1_500.0, 1_000.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub idle_rpm: f32,
    pub max_rpm: f32,

    // torque(rpm) = a·rpm³ + b·rpm² + c·rpm + d   (Nm at full throttle)
    pub torque_a: f32,
    pub torque_b: f32,
    pub torque_c: f32,
    pub torque_d: f32,

    pub free_rev_rate: f32,         // rpm/s when disconnected from the wheels
    pub drivetrain_efficiency: f32,

    // fuel
    pub fuel_capacity: f32,         // kg
    pub base_fuel_consumption: f32, // kg/s at full throttle, max rpm
    pub max_fuel_flow: f32,         // kg/s regulatory cap
    pub regulated_rpm_fraction: f32,// fuel-flow torque limit applies above this share of redline
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_rpm: 4000.0,
            max_rpm: 12500.0,

            torque_a: -6.4857e-10,
            torque_b: 1.34389e-5,
            torque_c: -0.0711275,
            torque_d: 350.995,

            free_rev_rate: 8000.0,
            drivetrain_efficiency: 0.92,

            fuel_capacity: 110.0,
            base_fuel_consumption: 0.032,
            max_fuel_flow: 0.0278,
            regulated_rpm_fraction: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearboxConfig {
    pub ratios: Vec<f32>,           // forward gears, 1st first
    pub primary_ratio: f32,
    pub final_drive: f32,
    pub shift_time: f32,            // s with no torque transfer
}

impl Default for GearboxConfig {
    fn default() -> Self {
        Self {
            ratios: vec![5.6, 4.2, 3.3, 2.7, 2.2, 1.85, 1.55, 1.32],
            primary_ratio: 1.2,
            final_drive: 2.9,
            shift_time: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErsConfig {
    pub max_deploy_power: f32,      // W
    pub max_recovery_power: f32,    // W
    pub max_energy_per_lap: f32,    // J, also the storage cap
    pub max_recovery_per_lap: f32,  // J
    pub initial_energy: f32,        // J
    pub recovery_throttle_threshold: f32,
    pub recovery_min_rpm: f32,
}

impl Default for ErsConfig {
    fn default() -> Self {
        Self {
            max_deploy_power: 120_000.0,
            max_recovery_power: 120_000.0,
            max_energy_per_lap: 4.0e6,
            max_recovery_per_lap: 2.0e6,
            initial_energy: 4.0e6,
            recovery_throttle_threshold: 0.1,
            recovery_min_rpm: 5000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TractionConfig {
    pub enabled: bool,
    pub slip_threshold: f32,
    pub aggressiveness: f32,        // 0..1
}

impl Default for TractionConfig {
    fn default() -> Self {
        Self { enabled: true, slip_threshold: 0.08, aggressiveness: 0.6 }
    }
}

/// Physical parameters of one corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelConfig {
    pub corner: Corner,
    pub radius: f32,                // m
    pub inertia: f32,               // kg·m² (wheel + tire + driveline share)
    pub driven: bool,
}

impl WheelConfig {
    pub fn standard(corner: Corner) -> Self {
        Self { corner, radius: 0.33, inertia: 1.2, driven: corner.is_rear() }
    }
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            chassis: ChassisConfig::default(),
            tire: TireConfig::default(),
            brakes: BrakeConfig::default(),
            suspension: SuspensionConfig::default(),
            engine: EngineConfig::default(),
            gearbox: GearboxConfig::default(),
            ers: ErsConfig::default(),
            traction: TractionConfig::default(),
            wheels: Corner::ALL.into_iter().map(WheelConfig::standard).collect(),
        }
    }
}

impl VehicleConfig {
    pub fn from_json_str(s: &str) -> Result<Self, SimError> {
        let cfg: VehicleConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Vehicle-level checks. Per-wheel problems are reported by [`Self::wheel_slots`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion { found: self.version, expected: CONFIG_VERSION });
        }

        positive("chassis.mass", self.chassis.mass)?;
        positive("chassis.wheelbase", self.chassis.wheelbase)?;
        positive("chassis.track_width", self.chassis.track_width)?;
        within("chassis.front_weight_distribution", self.chassis.front_weight_distribution, 0.0, 1.0)?;
        within("chassis.downforce_front_share", self.chassis.downforce_front_share, 0.0, 1.0)?;

        positive("tire.reference_load", self.tire.reference_load)?;
        positive("tire.temp_window", self.tire.temp_window)?;
        positive("tire.dry_grip", self.tire.dry_grip)?;
        positive("tire.max_slip_ratio", self.tire.max_slip_ratio)?;
        within("tire.ambient_temp", self.tire.ambient_temp, AMBIENT_TEMP_RANGE.0, AMBIENT_TEMP_RANGE.1)?;
        within("tire.blanket_temp", self.tire.blanket_temp, self.tire.ambient_temp, TIRE_MAX_TEMP)?;

        within("brakes.front_bias", self.brakes.front_bias, 0.0, 1.0)?;
        within("brakes.min_effectiveness", self.brakes.min_effectiveness, 0.1, 1.0)?;
        within("brakes.abs_min_multiplier", self.brakes.abs_min_multiplier, 0.0, 1.0)?;
        positive("brakes.thermal_mass", self.brakes.thermal_mass)?;
        within("brakes.ambient_temp", self.brakes.ambient_temp, AMBIENT_TEMP_RANGE.0, AMBIENT_TEMP_RANGE.1)?;
        if !(self.brakes.max_temp > self.brakes.ambient_temp) {
            return Err(ConfigError::OutOfRange {
                field: "brakes.max_temp",
                value: self.brakes.max_temp,
                min: self.brakes.ambient_temp,
                max: f32::INFINITY,
            });
        }
        within("brakes.abs_target_slip", self.brakes.abs_target_slip, 0.01, 1.0)?;
        positive("brakes.abs_aggressiveness.front", self.brakes.abs_aggressiveness.front)?;
        positive("brakes.abs_aggressiveness.rear", self.brakes.abs_aggressiveness.rear)?;
        if self.brakes.unlock_slip > self.brakes.lock_slip {
            return Err(ConfigError::OutOfRange {
                field: "brakes.unlock_slip",
                value: self.brakes.unlock_slip,
                min: 0.0,
                max: self.brakes.lock_slip,
            });
        }

        positive("suspension.max_compression", self.suspension.max_compression)?;
        positive("suspension.max_extension", self.suspension.max_extension)?;

        if !(self.engine.idle_rpm > 0.0 && self.engine.idle_rpm < self.engine.max_rpm) {
            return Err(ConfigError::RpmBounds { idle: self.engine.idle_rpm, max: self.engine.max_rpm });
        }
        positive("engine.max_fuel_flow", self.engine.max_fuel_flow)?;

        if self.gearbox.ratios.is_empty() {
            return Err(ConfigError::NoGears);
        }
        if self.gearbox.ratios.len() > usize::from(u8::MAX) {
            return Err(ConfigError::TooManyGears { count: self.gearbox.ratios.len(), max: u8::MAX });
        }
        for &r in &self.gearbox.ratios {
            positive("gearbox.ratios", r)?;
        }
        positive("gearbox.primary_ratio", self.gearbox.primary_ratio)?;
        positive("gearbox.final_drive", self.gearbox.final_drive)?;

        positive("ers.max_energy_per_lap", self.ers.max_energy_per_lap)?;

        within("traction.aggressiveness", self.traction.aggressiveness, 0.0, 1.0)?;

        self.wheel_slots().map(|_| ())
    }

    /// Assign each configured wheel to its corner.
    ///
    /// Returns the slots plus non-fatal issues (missing / invalid wheels, which
    /// stay `None`). A corner configured twice is fatal.
    pub fn wheel_slots(&self) -> Result<(PerWheel<Option<WheelConfig>>, Vec<ConfigError>), ConfigError> {
        let mut slots: PerWheel<Option<WheelConfig>> = PerWheel::default();
        let mut seen: PerWheel<bool> = PerWheel::default();
        let mut issues = Vec::new();

        for w in &self.wheels {
            if seen[w.corner] {
                return Err(ConfigError::DuplicateWheel(w.corner));
            }
            seen[w.corner] = true;
            let reason = if !(w.radius > 0.0) {
                Some("radius must be positive")
            } else if !(w.inertia > 0.0) {
                Some("inertia must be positive")
            } else {
                None
            };
            match reason {
                Some(reason) => issues.push(ConfigError::InvalidWheel { corner: w.corner, reason }),
                None => slots[w.corner] = Some(*w),
            }
        }

        for c in Corner::ALL {
            if !seen[c] {
                issues.push(ConfigError::MissingWheel(c));
            }
        }

        Ok((slots, issues))
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 { Ok(()) } else { Err(ConfigError::NonPositive { field, value }) }
}

fn within(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = VehicleConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        let (slots, issues) = cfg.wheel_slots().unwrap();
        assert!(issues.is_empty());
        assert!(slots.0.iter().all(Option::is_some));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "chassis": { "mass": 740.0 },
            "wheels": [
                { "corner": "FL", "radius": 0.33, "inertia": 1.2, "driven": false },
                { "corner": "FR", "radius": 0.33, "inertia": 1.2, "driven": false },
                { "corner": "RL", "radius": 0.33, "inertia": 1.2, "driven": true },
                { "corner": "RR", "radius": 0.33, "inertia": 1.2, "driven": true }
            ]
        }"#;
        let cfg = VehicleConfig::from_json_str(json).unwrap();
        assert_eq!(cfg.chassis.mass, 740.0);
        assert_eq!(cfg.chassis.wheelbase, ChassisConfig::default().wheelbase);
        assert_eq!(cfg.gearbox.ratios.len(), 8);
        assert_eq!(cfg.version, CONFIG_VERSION);
    }

    #[test]
    fn missing_wheel_is_reported_not_fatal() {
        let mut cfg = VehicleConfig::default();
        cfg.wheels.retain(|w| w.corner != Corner::RR);
        assert_eq!(cfg.validate(), Ok(()));
        let (slots, issues) = cfg.wheel_slots().unwrap();
        assert!(slots[Corner::RR].is_none());
        assert_eq!(issues, vec![ConfigError::MissingWheel(Corner::RR)]);
        assert!(!issues[0].is_fatal());
    }

    #[test]
    fn invalid_wheel_is_reported_once() {
        let mut cfg = VehicleConfig::default();
        cfg.wheels[0].radius = 0.0;
        let (slots, issues) = cfg.wheel_slots().unwrap();
        assert!(slots[Corner::FL].is_none());
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0], ConfigError::InvalidWheel { corner: Corner::FL, .. }));
    }

    #[test]
    fn duplicate_wheel_is_fatal() {
        let mut cfg = VehicleConfig::default();
        cfg.wheels.push(WheelConfig::standard(Corner::FL));
        assert_eq!(cfg.validate(), Err(ConfigError::DuplicateWheel(Corner::FL)));
    }

    #[test]
    fn vehicle_level_faults_are_rejected() {
        let mut cfg = VehicleConfig::default();
        cfg.gearbox.ratios.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::NoGears));

        let mut cfg = VehicleConfig::default();
        cfg.engine.idle_rpm = 13_000.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::RpmBounds { .. })));

        let mut cfg = VehicleConfig::default();
        cfg.version = 99;
        assert!(matches!(cfg.validate(), Err(ConfigError::UnsupportedVersion { found: 99, .. })));

        let mut cfg = VehicleConfig::default();
        cfg.chassis.mass = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::NonPositive { field: "chassis.mass", .. })));
    }

    #[test]
    fn temperature_bounds_are_checked_before_anything_clamps_with_them() {
        let mut cfg = VehicleConfig::default();
        cfg.brakes.max_temp = 20.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::OutOfRange { field: "brakes.max_temp", .. })));

        let mut cfg = VehicleConfig::default();
        cfg.brakes.ambient_temp = f32::NAN;
        assert!(matches!(cfg.validate(), Err(ConfigError::OutOfRange { field: "brakes.ambient_temp", .. })));

        let mut cfg = VehicleConfig::default();
        cfg.tire.ambient_temp = 320.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::OutOfRange { field: "tire.ambient_temp", .. })));

        let mut cfg = VehicleConfig::default();
        cfg.tire.blanket_temp = 10.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::OutOfRange { field: "tire.blanket_temp", .. })));

        let mut cfg = VehicleConfig::default();
        cfg.tire.blanket_temp = TIRE_MAX_TEMP + 1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::OutOfRange { field: "tire.blanket_temp", .. })));

        let mut cfg = VehicleConfig::default();
        cfg.engine.idle_rpm = f32::NAN;
        assert!(matches!(cfg.validate(), Err(ConfigError::RpmBounds { .. })));
    }

    #[test]
    fn gear_count_must_fit_the_gear_index() {
        let mut cfg = VehicleConfig::default();
        cfg.gearbox.ratios = vec![1.0; 256];
        assert_eq!(cfg.validate(), Err(ConfigError::TooManyGears { count: 256, max: u8::MAX }));
        cfg.gearbox.ratios.pop();
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn bad_json_is_a_sim_error() {
        assert!(matches!(VehicleConfig::from_json_str("{ nope"), Err(SimError::Json(_))));
    }
}

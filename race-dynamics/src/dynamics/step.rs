// ==============================================================================
// step.rs — VEHICLE SIMULATION STEP (ONE FIXED TICK, ALL SUBSYSTEMS)
// ------------------------------------------------------------------------------
// The orchestrator owns every per-wheel and per-vehicle state array and passes
// it by exclusive reference into each module for the duration of a tick.
//
// Order per tick:
// 1) load transfer     -> per-wheel normal load (static + aero + transfer)
// 2) powertrain        -> shifts, rpm, ICE + ERS crank torque, fuel
// 3) traction control  -> crank torque trimmed by LAST tick's driven-wheel spin
// 4) gear mapping      -> drive torque per driven wheel
// 5) tire              -> slip, Fx / Fy, temperature, wear
// 6) brake             -> brake force, temperature, fade, lock-up / ABS
// 7) wheel spin        -> ω for the next tick
// 8) suspension        -> vertical spring / damper / ARB forces
// 9) aggregate         -> per-wheel body-frame forces, net force + torque at CG
//
// Inactive wheels (missing / invalid in the config) contribute nothing. A tick
// with dt <= 0 (or non-finite) is evaluated on a scratch copy: the output is
// computed but no state changes.
// ==============================================================================

use crate::dynamics::brake::{step_brake, BrakeInput, BrakeState};
use crate::dynamics::config::{ChassisConfig, VehicleConfig, WheelConfig};
use crate::dynamics::error::ConfigError;
use crate::dynamics::load_transfer::{wheel_loads, LoadInput};
use crate::dynamics::powertrain::gearbox::ShiftRequest;
use crate::dynamics::powertrain::{self, step_powertrain, wheel_drive_torque, PowertrainInput, PowertrainState};
use crate::dynamics::suspension::{solve_suspension, update_travel, SuspensionState};
use crate::dynamics::telemetry::TelemetrySnapshot;
use crate::dynamics::tire::{solve_tire, TireInput, WheelState};
use crate::dynamics::traction::limit_torque;
use crate::dynamics::types::{finite_or_zero, unit_clamp, Corner, PerWheel, Point3, Side, Vec3};
use crate::dynamics::wheel::{integrate_spin, SpinInput};

// ============================================
// Inputs
// ============================================

/// Host measurements for one wheel, in the wheel's own heading frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelInput {
    pub compression: Option<f32>,   // m from free length; None = off the ground
    pub v_long: f32,                // m/s contact-patch velocity along the heading
    pub v_lat: f32,                 // m/s across the heading (+ left)
    pub steer_angle: f32,           // rad, + turns the wheel left
}

impl WheelInput {
    pub fn rolling(v_long: f32, compression: f32) -> Self {
        Self { compression: Some(compression), v_long, v_lat: 0.0, steer_angle: 0.0 }
    }

    pub fn airborne() -> Self {
        Self { compression: None, v_long: 0.0, v_lat: 0.0, steer_angle: 0.0 }
    }
}

/// Discrete driver commands latched for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Commands {
    pub shift_up: bool,
    pub shift_down: bool,
    pub toggle_drs: bool,
    pub toggle_abs: bool,
}

impl Commands {
    /// Up and down in the same tick cancel out.
    pub fn shift(&self) -> Option<ShiftRequest> {
        match (self.shift_up, self.shift_down) {
            (true, false) => Some(ShiftRequest::Up),
            (false, true) => Some(ShiftRequest::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationInput {
    pub dt: f32,                    // s
    pub velocity: Vec3,             // body frame, m/s
    pub acceleration: Vec3,         // body frame, m/s² (host's previous step)
    pub throttle: f32,              // 0..1
    pub brake: f32,                 // 0..1
    pub ers_deploy: f32,            // 0..1
    pub commands: Commands,
    pub wetness: f32,               // 0 dry .. 1 wet
    pub downforce: f32,             // N, from the host's aero model
    pub wheels: PerWheel<WheelInput>,
}

impl SimulationInput {
    /// Straight-line rolling at `speed`, every wheel at `compression`, no pedals.
    pub fn straight(dt: f32, speed: f32, compression: f32) -> Self {
        Self {
            dt,
            velocity: Vec3::new(speed, 0.0, 0.0),
            acceleration: Vec3::zeros(),
            throttle: 0.0,
            brake: 0.0,
            ers_deploy: 0.0,
            commands: Commands::default(),
            wetness: 0.0,
            downforce: 0.0,
            wheels: PerWheel::from_fn(|_| WheelInput::rolling(speed, compression)),
        }
    }
}

/// What the pit crew does during a stop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PitService {
    pub refuel: f32,        // kg added (capped at tank capacity)
    pub new_tires: bool,    // fresh rubber: temperature, wear and flat spots reset
    pub cool_brakes: bool,  // discs back to ambient
}

// ============================================
// Outputs
// ============================================

/// Combined tire + suspension force of one wheel, body frame, and where to apply it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelForce {
    pub corner: Corner,
    pub force: Vec3,
    pub point: Point3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub wheels: PerWheel<WheelForce>,
    pub net_force: Vec3,
    pub net_torque: Vec3,   // about the CG
    pub telemetry: TelemetrySnapshot,
}

// ============================================
// State
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSimulationState {
    pub wheels: PerWheel<WheelState>,
    pub brakes: PerWheel<BrakeState>,
    pub suspension: PerWheel<SuspensionState>,
    pub powertrain: PowertrainState,
    pub driven_spin: f32,       // max driven-wheel slip of the previous tick
    pub traction_active: bool,
    pub abs_enabled: bool,
    pub drs_open: bool,
    pub speed: f32,             // m/s
    pub tick: u64,
    pub time: f64,              // s
}

impl VehicleSimulationState {
    pub fn new(cfg: &VehicleConfig) -> Self {
        Self {
            wheels: PerWheel::from_fn(|_| WheelState::new(&cfg.tire)),
            brakes: PerWheel::from_fn(|_| BrakeState::new(&cfg.brakes)),
            suspension: PerWheel::default(),
            powertrain: PowertrainState::new(cfg),
            driven_spin: 0.0,
            traction_active: false,
            abs_enabled: cfg.brakes.abs_enabled,
            drs_open: false,
            speed: 0.0,
            tick: 0,
            time: 0.0,
        }
    }
}

/// Contact points in the body frame (origin at the CG).
pub fn contact_points(chassis: &ChassisConfig) -> PerWheel<Point3> {
    let front_x = chassis.wheelbase * (1.0 - chassis.front_weight_distribution);
    let rear_x = -chassis.wheelbase * chassis.front_weight_distribution;
    let half_track = 0.5 * chassis.track_width;

    PerWheel::from_fn(|c| {
        let x = if c.is_front() { front_x } else { rear_x };
        let y = match c.side() {
            Side::Left => half_track,
            Side::Right => -half_track,
        };
        Point3::new(x, y, -chassis.cg_height)
    })
}

/// Rotate a wheel-frame tire force into the body frame.
#[inline]
fn wheel_to_body(fx: f32, fy: f32, steer: f32) -> (f32, f32) {
    let (s, c) = steer.sin_cos();
    (fx * c - fy * s, fx * s + fy * c)
}

// ============================================
// Simulation
// ============================================

pub struct VehicleSimulation {
    config: VehicleConfig,
    slots: PerWheel<Option<WheelConfig>>,
    issues: Vec<ConfigError>,
    state: VehicleSimulationState,
}

impl VehicleSimulation {
    /// Validate the config and build session state. Per-wheel problems are
    /// kept in [`Self::config_issues`]; the affected wheel stays inactive.
    pub fn new(config: VehicleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (slots, issues) = config.wheel_slots()?;
        let state = VehicleSimulationState::new(&config);
        Ok(Self { config, slots, issues, state })
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn state(&self) -> &VehicleSimulationState {
        &self.state
    }

    pub fn config_issues(&self) -> &[ConfigError] {
        &self.issues
    }

    pub fn wheel(&self, corner: Corner) -> Option<&WheelConfig> {
        self.slots[corner].as_ref()
    }

    pub fn active_wheels(&self) -> PerWheel<bool> {
        PerWheel::from_fn(|c| self.slots[c].is_some())
    }

    pub fn abs_enabled(&self) -> bool {
        self.state.abs_enabled
    }

    pub fn set_abs_enabled(&mut self, enabled: bool) {
        self.state.abs_enabled = enabled;
    }

    pub fn drs_open(&self) -> bool {
        self.state.drs_open
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::capture(&self.state, &self.active_wheels())
    }

    /// Advance one fixed tick.
    pub fn step(&mut self, input: &SimulationInput) -> StepOutput {
        let active = self.active_wheels();
        if input.dt.is_finite() && input.dt > 0.0 {
            run_tick(&self.config, &self.slots, &active, &mut self.state, input, input.dt)
        } else {
            let mut scratch = self.state.clone();
            run_tick(&self.config, &self.slots, &active, &mut scratch, input, 0.0)
        }
    }

    pub fn new_lap(&mut self) {
        powertrain::new_lap(&mut self.state.powertrain);
    }

    /// Fresh session: everything back to the config's initial values.
    pub fn reset_session(&mut self) {
        self.state = VehicleSimulationState::new(&self.config);
    }

    pub fn pit_stop(&mut self, service: &PitService) {
        powertrain::refuel(&self.config, &mut self.state.powertrain, finite_or_zero(service.refuel));

        if service.new_tires {
            for (c, wheel) in self.state.wheels.iter_mut() {
                wheel.fit_new_tire(&self.config.tire);
                self.state.brakes[c].flat_spot = 0.0;
            }
        }

        if service.cool_brakes {
            for (_, brake) in self.state.brakes.iter_mut() {
                brake.temperature = self.config.brakes.ambient_temp;
                brake.effectiveness = 1.0;
            }
        }
    }
}

fn run_tick(
    cfg: &VehicleConfig,
    slots: &PerWheel<Option<WheelConfig>>,
    active: &PerWheel<bool>,
    state: &mut VehicleSimulationState,
    input: &SimulationInput,
    dt: f32,
) -> StepOutput {
    let throttle = unit_clamp(input.throttle);
    let pedal = unit_clamp(input.brake);
    let deploy = unit_clamp(input.ers_deploy);
    let wetness = unit_clamp(input.wetness);
    let velocity = input.velocity.map(finite_or_zero);
    let accel = input.acceleration.map(finite_or_zero);
    let downforce = finite_or_zero(input.downforce).max(0.0);

    if input.commands.toggle_abs {
        state.abs_enabled = !state.abs_enabled;
    }
    if input.commands.toggle_drs {
        state.drs_open = !state.drs_open;
    }
    state.speed = velocity.norm();

    let grounded = PerWheel::from_fn(|c| {
        active[c] && input.wheels[c].compression.is_some_and(|x| x.is_finite())
    });
    let driven = PerWheel::from_fn(|c| slots[c].is_some_and(|w| w.driven));
    let driven_count = driven.iter().filter(|(_, d)| **d).count();

    // 1) load transfer
    let loads = wheel_loads(
        &cfg.chassis,
        &LoadInput { accel_long: accel.x, accel_lat: accel.y, downforce },
    );

    // 2) powertrain (rpm from last tick's driven-wheel speed)
    let driven_omega = if driven_count > 0 {
        driven
            .iter()
            .filter(|(_, d)| **d)
            .map(|(c, _)| state.wheels[c].angular_velocity)
            .sum::<f32>()
            / driven_count as f32
    } else {
        0.0
    };
    step_powertrain(
        cfg,
        &mut state.powertrain,
        &PowertrainInput {
            throttle,
            ers_deploy: deploy,
            shift: input.commands.shift(),
            driven_wheel_omega: driven_omega,
        },
        dt,
    );

    // 3) traction control
    let (crank, tc_active) = limit_torque(&cfg.traction, state.powertrain.crank_torque(), state.driven_spin);
    state.traction_active = tc_active;

    // 4) gear mapping
    let drive = wheel_drive_torque(cfg, &state.powertrain.gearbox, crank, driven_count);

    // 5) - 7) tire, brake, wheel spin
    for c in Corner::ALL {
        let Some(wheel) = slots[c] else {
            let w = &mut state.wheels[c];
            w.normal_force = 0.0;
            w.longitudinal_force = 0.0;
            w.lateral_force = 0.0;
            continue;
        };

        let w_in = &input.wheels[c];
        let v_long = finite_or_zero(w_in.v_long);
        let v_lat = finite_or_zero(w_in.v_lat);
        let normal_force = if grounded[c] { loads[c] } else { 0.0 };

        let tire_in = TireInput {
            v_long,
            v_lat,
            normal_force,
            wetness,
            flat_spot: state.brakes[c].flat_spot,
        };
        solve_tire(&cfg.tire, wheel.radius, &mut state.wheels[c], &tire_in, dt);

        let brake_in = BrakeInput {
            pedal,
            slip_ratio: state.wheels[c].slip_ratio,
            contact_speed: v_long.abs(),
            vehicle_speed: state.speed,
            abs_enabled: state.abs_enabled,
        };
        let brake_force = step_brake(&cfg.brakes, &cfg.tire, c.axle(), &mut state.brakes[c], &brake_in, dt);

        let spin_in = SpinInput {
            radius: wheel.radius,
            inertia: wheel.inertia,
            drive_torque: if driven[c] { drive } else { 0.0 },
            brake_force,
            v_long,
        };
        state.wheels[c].angular_velocity = integrate_spin(&cfg.tire, &state.wheels[c], &spin_in, dt);
    }

    // traction feedback for the next tick
    state.driven_spin = driven
        .iter()
        .filter(|(c, d)| **d && grounded[*c])
        .map(|(c, _)| state.wheels[c].slip_ratio)
        .fold(0.0, f32::max);

    // 8) suspension
    for (c, s) in state.suspension.iter_mut() {
        let measured = if active[c] { input.wheels[c].compression } else { None };
        update_travel(&cfg.suspension, s, measured, dt);
    }
    solve_suspension(&cfg.suspension, cfg.chassis.track_width, &mut state.suspension, active);

    // 9) aggregate
    let points = contact_points(&cfg.chassis);
    let wheels = PerWheel::from_fn(|c| {
        let w = &state.wheels[c];
        let steer = finite_or_zero(input.wheels[c].steer_angle);
        let (fx, fy) = wheel_to_body(w.longitudinal_force, w.lateral_force, steer);
        WheelForce {
            corner: c,
            force: Vec3::new(fx, fy, state.suspension[c].force),
            point: points[c],
        }
    });

    let mut net_force = Vec3::zeros();
    let mut net_torque = Vec3::zeros();
    for (_, wf) in wheels.iter() {
        net_force += wf.force;
        net_torque += wf.point.coords.cross(&wf.force);
    }

    if dt > 0.0 {
        state.tick += 1;
        state.time += dt as f64;
    }

    StepOutput {
        wheels,
        net_force,
        net_torque,
        telemetry: TelemetrySnapshot::capture(state, active),
    }
}

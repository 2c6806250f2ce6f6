// ==============================================================================
// host.rs — RAPIER HOST WORLD (CHASSIS RIGID BODY FEEDING THE DYNAMICS CORE)
// ------------------------------------------------------------------------------
// The world is Z-up, so the chassis local frame is the dynamics body frame:
//   +x forward, +y left, +z up, origin at the centre of gravity.
//
// Per tick:
// 1) measure
//    - body-frame velocity, acceleration (finite difference of world linvel)
//    - per-wheel suspension compression: downward raycast from the wheel mount,
//      compression = rest_length − (toi − radius), plus optional road noise
//    - contact-point velocity  v = linvel + ω × r, rotated into the steered
//      wheel frame (Ackermann on the front axle)
// 2) aero (host side): downforce + drag ∝ v², DRS trims both
// 3) VehicleSimulation::step
// 4) apply per-wheel forces at their contact points, aero at the CG (impulses)
// 5) low-speed stabilisation, then pipeline.step
//
// Lateral tire impulses are capped to what cancels the contact's sideways
// velocity in one tick; below walking pace the slip-angle curve is far too
// stiff for a 60 Hz explicit step.
// ==============================================================================

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rapier3d::prelude::*;
use serde::Deserialize;

use race_dynamics::dynamics::step::contact_points;
use race_dynamics::dynamics::{
    Commands, Corner, PerWheel, PitService, SimulationInput, StepOutput, Vec3, VehicleSimulation, WheelInput,
    GRAVITY,
};

const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

/// Latest analog inputs from the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriverControls {
    pub throttle: f32,  // 0..1
    pub brake: f32,     // 0..1
    pub ers: f32,       // 0..1
    pub steer: f32,     // -1 (right) .. 1 (left)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverCommand {
    ShiftUp,
    ShiftDown,
    Drs,
    Abs,
    Pit,
    NewLap,
}

#[derive(Debug, Clone, Copy)]
pub struct HostConfig {
    pub mount_height: f32,      // m, wheel mounts above the CG
    pub rest_length: f32,       // m, spring free length below the mount
    pub max_steer_angle: f32,   // rad
    pub ackermann: f32,         // 0 = parallel, 1 = full Ackermann
    pub downforce_coeff: f32,   // N per (m/s)²
    pub drag_coeff: f32,        // N per (m/s)²
    pub drs_downforce: f32,     // multiplier while DRS is open
    pub drs_drag: f32,          // multiplier while DRS is open
    pub road_roughness: f32,    // m, peak compression noise
    pub seed: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            mount_height: 0.30,
            rest_length: 0.29,
            max_steer_angle: 0.35,
            ackermann: 0.8,
            downforce_coeff: 3.0,
            drag_coeff: 0.9,
            drs_downforce: 0.85,
            drs_drag: 0.75,
            road_roughness: 0.0015,
            seed: 7,
        }
    }
}

// --------------------------------------------------
// ackermann steering angles (stateless)
// --------------------------------------------------
fn ackermann_angles(base: f32, wheelbase: f32, track: f32) -> (f32, f32) {
    // base is the bicycle-model angle at the centreline; returns (left, right)
    if base.abs() < 1e-4 {
        return (0.0, 0.0);
    }

    let sign = base.signum();
    let r = wheelbase / base.abs().tan();

    let r_in = (r - track * 0.5).max(0.01);
    let r_out = (r + track * 0.5).max(0.01);

    let inner = (wheelbase / r_in).atan() * sign;
    let outer = (wheelbase / r_out).atan() * sign;

    // turning left (base > 0): left wheel is the inner one
    if sign > 0.0 { (inner, outer) } else { (outer, inner) }
}

/// Front-wheel steer angles for a centreline angle, blended towards Ackermann.
fn steer_angles(cfg: &HostConfig, base: f32, wheelbase: f32, track: f32) -> PerWheel<f32> {
    let (ack_l, ack_r) = ackermann_angles(base, wheelbase, track);
    let blend = |a: f32| (1.0 - cfg.ackermann) * base + cfg.ackermann * a;
    PerWheel::from_fn(|c| match c {
        Corner::FL => blend(ack_l),
        Corner::FR => blend(ack_r),
        Corner::RL | Corner::RR => 0.0,
    })
}

#[inline]
fn to_rapier(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

pub struct HostWorld {
    pub gravity: Vector<Real>,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline,

    pub chassis: RigidBodyHandle,
    pub sim: VehicleSimulation,
    pub cfg: HostConfig,
    pub controls: DriverControls,
    pub wetness: f32,

    mounts: PerWheel<Point<Real>>,  // chassis local
    pending: Commands,              // latched until the next tick
    prev_linvel: Vector<Real>,
    rng: StdRng,
}

impl HostWorld {
    pub fn new(sim: VehicleSimulation, cfg: HostConfig) -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // === ground: big static box, top surface at z = 0 ===
        let ground = bodies.insert(RigidBodyBuilder::fixed().translation(vector![0.0, 0.0, -1.0]).build());
        let ground_collider = ColliderBuilder::cuboid(2000.0, 2000.0, 1.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.0)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground, &mut bodies);

        // === chassis ===
        let chassis_cfg = sim.config().chassis;
        let (hx, hy, hz) = (0.5 * chassis_cfg.wheelbase + 0.5, 0.45 * chassis_cfg.track_width, 0.12);
        let density = chassis_cfg.mass / (8.0 * hx * hy * hz);

        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![0.0, 0.0, chassis_cfg.cg_height + 0.02])
            .ccd_enabled(true)
            .build();
        let chassis = bodies.insert(rb);
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .density(density)
            .friction(0.0)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(collider, chassis, &mut bodies);

        let mounts = {
            let contacts = contact_points(&chassis_cfg);
            PerWheel::from_fn(|c| point![contacts[c].x, contacts[c].y, cfg.mount_height])
        };

        println!("🌎 Ground + chassis inserted. Bodies = {}, Colliders = {}", bodies.len(), colliders.len());

        Self {
            gravity: vector![0.0, 0.0, -GRAVITY],
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            chassis,
            sim,
            cfg,
            controls: DriverControls::default(),
            wetness: 0.0,
            mounts,
            pending: Commands::default(),
            prev_linvel: vector![0.0, 0.0, 0.0],
            rng: StdRng::seed_from_u64(cfg.seed),
        }
    }

    pub fn chassis_position(&self) -> [f32; 3] {
        self.bodies
            .get(self.chassis)
            .map(|b| {
                let t = b.translation();
                [t.x, t.y, t.z]
            })
            .unwrap_or([0.0; 3])
    }

    pub fn set_wetness(&mut self, wetness: f32) {
        self.wetness = if wetness.is_finite() { wetness.clamp(0.0, 1.0) } else { 0.0 };
    }

    pub fn command(&mut self, cmd: DriverCommand) {
        match cmd {
            DriverCommand::ShiftUp => self.pending.shift_up = true,
            DriverCommand::ShiftDown => self.pending.shift_down = true,
            DriverCommand::Drs => self.pending.toggle_drs = true,
            DriverCommand::Abs => self.pending.toggle_abs = true,
            DriverCommand::Pit => {
                let capacity = self.sim.config().engine.fuel_capacity;
                self.sim.pit_stop(&PitService { refuel: capacity, new_tires: true, cool_brakes: true });
                println!("🔧 Pit stop: refuelled, fresh tires, brakes cooled");
            }
            DriverCommand::NewLap => {
                self.sim.new_lap();
                println!("🏁 New lap: ERS recovery allowance reset");
            }
        }
    }

    /// Build this tick's core input from the chassis pose.
    fn measure(&mut self, dt: Real) -> Option<(SimulationInput, Isometry<Real>, Point<Real>)> {
        let body = self.bodies.get(self.chassis)?;
        let pos = *body.position();
        let rot = pos.rotation;
        let linvel = *body.linvel();
        let angvel = *body.angvel();
        let com = pos * body.mass_properties().local_mprops.local_com;

        let v_local = rot.inverse_transform_vector(&linvel);
        let a_local = rot.inverse_transform_vector(&((linvel - self.prev_linvel) / dt));
        self.prev_linvel = linvel;

        let chassis_cfg = self.sim.config().chassis;
        let max_extension = self.sim.config().suspension.max_extension;
        let base = self.controls.steer.clamp(-1.0, 1.0) * self.cfg.max_steer_angle;
        let steer = steer_angles(&self.cfg, base, chassis_cfg.wheelbase, chassis_cfg.track_width);

        let filter = QueryFilter::default().exclude_rigid_body(self.chassis);
        let down = rot * vector![0.0, 0.0, -1.0];
        let rough = self.cfg.road_roughness > 0.0 && v_local.x.abs() > 1.0;

        let mut wheels = PerWheel::from_fn(|_| WheelInput::airborne());
        for c in Corner::ALL {
            let Some(wheel) = self.sim.wheel(c).copied() else { continue };

            let origin = pos * self.mounts[c];
            let max_toi = self.cfg.rest_length + max_extension + wheel.radius;
            let ray = Ray::new(origin, down);
            let hit = self
                .query_pipeline
                .cast_ray(&self.bodies, &self.colliders, &ray, max_toi, true, filter);

            let toi = hit.map(|(_, toi)| toi).unwrap_or(max_toi);
            let compression = match hit {
                Some((_, toi)) => {
                    let noise = if rough {
                        self.rng.gen_range(-self.cfg.road_roughness..=self.cfg.road_roughness)
                    } else {
                        0.0
                    };
                    let x = self.cfg.rest_length - (toi - wheel.radius) + noise;
                    (x >= -max_extension).then_some(x)
                }
                None => None,
            };

            let contact = origin + down * toi;
            let r = contact - com;
            let v_pt = rot.inverse_transform_vector(&(linvel + angvel.cross(&r)));
            let (s, co) = steer[c].sin_cos();

            wheels[c] = WheelInput {
                compression,
                v_long: v_pt.x * co + v_pt.y * s,
                v_lat: -v_pt.x * s + v_pt.y * co,
                steer_angle: steer[c],
            };
        }

        let aero_scale = if self.sim.drs_open() { self.cfg.drs_downforce } else { 1.0 };
        let downforce = self.cfg.downforce_coeff * v_local.x * v_local.x * aero_scale;

        let input = SimulationInput {
            dt,
            velocity: Vec3::new(v_local.x, v_local.y, v_local.z),
            acceleration: Vec3::new(a_local.x, a_local.y, a_local.z),
            throttle: self.controls.throttle,
            brake: self.controls.brake,
            ers_deploy: self.controls.ers,
            commands: std::mem::take(&mut self.pending),
            wetness: self.wetness,
            downforce,
            wheels,
        };
        Some((input, pos, com))
    }

    fn apply_forces(&mut self, input: &SimulationInput, out: &StepOutput, pos: &Isometry<Real>, com: Point<Real>, dt: Real) {
        let rot = pos.rotation;
        let quarter_mass = 0.25 * self.sim.config().chassis.mass;
        let Some(body) = self.bodies.get_mut(self.chassis) else { return };

        for (c, wf) in out.wheels.iter() {
            let w = &out.telemetry.wheels[c];
            let lat_cap = quarter_mass * input.wheels[c].v_lat.abs() / dt;
            let fy = w.lateral_force.clamp(-lat_cap, lat_cap);
            let (s, co) = input.wheels[c].steer_angle.sin_cos();
            let local = vector![
                w.longitudinal_force * co - fy * s,
                w.longitudinal_force * s + fy * co,
                wf.force.z
            ];

            let point = com + rot * to_rapier(wf.point.coords);
            body.apply_impulse_at_point(rot * local * dt, point, true);
        }

        let v_fwd = input.velocity.x;
        let drag_scale = if self.sim.drs_open() { self.cfg.drs_drag } else { 1.0 };
        let drag = self.cfg.drag_coeff * v_fwd * v_fwd * drag_scale * v_fwd.signum();
        let aero = vector![-drag, 0.0, -input.downforce];
        body.apply_impulse(rot * aero * dt, true);
    }

    /// Kills creep and roll/yaw ringing near standstill.
    fn apply_velocity_damping(&mut self, dt: Real) {
        let braking = self.controls.brake > 0.05;
        let Some(body) = self.bodies.get_mut(self.chassis) else { return };

        let speed = body.linvel().magnitude();
        if speed < 0.5 && braking {
            let factor = (-6.0 * dt).exp();
            let v = *body.linvel();
            body.set_linvel(vector![v.x * factor, v.y * factor, v.z], true);
        }
        if speed < 1.0 {
            let factor = (-6.0 * dt).exp();
            body.set_angvel(*body.angvel() * factor, true);
        }
    }

    pub fn step(&mut self, dt: Real) -> Option<StepOutput> {
        self.query_pipeline.update(&self.colliders);

        let (input, pos, com) = self.measure(dt)?;
        let out = self.sim.step(&input);
        self.apply_forces(&input, &out, &pos, com, dt);
        self.apply_velocity_damping(dt);

        let hooks = ();
        let events = ();
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters { dt, ..IntegrationParameters::default() },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &hooks,
            &events,
        );

        // Safety: a chassis that left the map goes back to the start line
        if let Some(body) = self.bodies.get_mut(self.chassis) {
            let p = *body.translation();
            let bad = !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
                || p.x.abs() > 1_900.0
                || p.y.abs() > 1_900.0
                || p.z.abs() > 500.0;
            if bad {
                let start = vector![0.0, 0.0, self.sim.config().chassis.cg_height + 0.02];
                body.set_translation(start, true);
                body.set_linvel(vector![0.0, 0.0, 0.0], true);
                body.set_angvel(vector![0.0, 0.0, 0.0], true);
                self.prev_linvel = vector![0.0, 0.0, 0.0];
                println!("⚠️ Reset runaway chassis back to {:?}", start);
            }
        }

        Some(out)
    }
}

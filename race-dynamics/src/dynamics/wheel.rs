// ==============================================================================
// wheel.rs — WHEEL SPIN INTEGRATION (DRIVE / TIRE / BRAKE TORQUE BALANCE)
// ------------------------------------------------------------------------------
//   I · dω/dt = T_drive − F_x · r − T_brake
//
// The tire term is stiff (F_x grows with ω through the slip ratio), so it is
// integrated linearly-implicitly:
//
//   ω' = ω + dt · (T_drive − F_x·r) / I  /  (1 + dt · r · ∂F_x/∂ω / I)
//
// with ∂F_x/∂ω = C_s · F_z · r / max(|v|, |ω·r|) while the tire is below its
// grip cap (0 once saturated). Brake torque is applied last and can at most
// bring the wheel to rest; it never spins it backwards.
// ==============================================================================

use crate::dynamics::config::TireConfig;
use crate::dynamics::tire::WheelState;
use crate::dynamics::types::SLIP_SPEED_EPSILON;

#[derive(Debug, Clone, Copy)]
pub struct SpinInput {
    pub radius: f32,
    pub inertia: f32,
    pub drive_torque: f32,  // Nm
    pub brake_force: f32,   // N at the contact patch, >= 0
    pub v_long: f32,        // m/s
}

/// ∂F_x/∂ω of the linear (unsaturated) part of the tire curve.
fn tire_stiffness(cfg: &TireConfig, wheel: &WheelState, radius: f32, v_long: f32) -> f32 {
    let cap = wheel.grip * wheel.normal_force;
    let saturated = wheel.longitudinal_force.abs() >= cap * 0.999
        || wheel.slip_ratio.abs() >= cfg.max_slip_ratio;
    if saturated || wheel.normal_force <= 0.0 {
        return 0.0;
    }
    let denom = v_long.abs().max((wheel.angular_velocity * radius).abs()).max(SLIP_SPEED_EPSILON);
    cfg.longitudinal_stiffness * wheel.normal_force * radius / denom
}

/// New angular velocity after `dt`.
pub fn integrate_spin(cfg: &TireConfig, wheel: &WheelState, input: &SpinInput, dt: f32) -> f32 {
    let r = input.radius;
    let inertia = input.inertia;
    let omega = wheel.angular_velocity;

    let k = tire_stiffness(cfg, wheel, r, input.v_long);
    let net = input.drive_torque - wheel.longitudinal_force * r;
    let mut next = omega + dt * net / inertia / (1.0 + dt * r * k / inertia);

    // brake: opposes rotation, saturates at standstill
    let brake_dw = input.brake_force.max(0.0) * r * dt / inertia;
    if brake_dw >= next.abs() {
        next = 0.0;
    } else {
        next -= next.signum() * brake_dw;
    }

    if next.is_finite() { next } else { 0.0 }
}

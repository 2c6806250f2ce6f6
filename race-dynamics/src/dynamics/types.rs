//! Core shared types for `dynamics` (engine-agnostic).
// dynamics/types.rs
use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

pub type Vec3 = nalgebra::Vector3<f32>;
pub type Point3 = nalgebra::Point3<f32>;

pub const GRAVITY: f32 = 9.81;

/// Below this speed (m/s) slip quantities are defined as zero.
pub const SLIP_SPEED_EPSILON: f32 = 0.5;

/// Below this angular velocity (rad/s) power -> torque conversions yield zero.
pub const OMEGA_EPSILON: f32 = 1.0;

// ============================================
// Wheel identification
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Axle { Front, Rear }

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Side { Left, Right }

/// `{Front, Rear} x {Left, Right}`; the discriminant is the array index.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Corner { FL = 0, FR = 1, RL = 2, RR = 3 }

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::FL, Corner::FR, Corner::RL, Corner::RR];

    pub fn new(axle: Axle, side: Side) -> Self {
        match (axle, side) {
            (Axle::Front, Side::Left)  => Corner::FL,
            (Axle::Front, Side::Right) => Corner::FR,
            (Axle::Rear,  Side::Left)  => Corner::RL,
            (Axle::Rear,  Side::Right) => Corner::RR,
        }
    }

    #[inline]
    pub fn index(self) -> usize { self as usize }

    pub fn axle(self) -> Axle {
        match self {
            Corner::FL | Corner::FR => Axle::Front,
            Corner::RL | Corner::RR => Axle::Rear,
        }
    }

    pub fn side(self) -> Side {
        match self {
            Corner::FL | Corner::RL => Side::Left,
            Corner::FR | Corner::RR => Side::Right,
        }
    }

    pub fn is_front(self) -> bool { self.axle() == Axle::Front }

    pub fn is_rear(self) -> bool { self.axle() == Axle::Rear }

    pub fn as_str(self) -> &'static str {
        match self {
            Corner::FL => "FL",
            Corner::FR => "FR",
            Corner::RL => "RL",
            Corner::RR => "RR",
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// Fixed-size per-wheel / per-axle storage
// ============================================

/// Four values indexed by [`Corner`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerWheel<T>(pub [T; 4]);

impl<T> PerWheel<T> {
    pub fn from_fn(mut f: impl FnMut(Corner) -> T) -> Self {
        PerWheel([f(Corner::FL), f(Corner::FR), f(Corner::RL), f(Corner::RR)])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Corner, &T)> {
        Corner::ALL.into_iter().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Corner, &mut T)> {
        Corner::ALL.into_iter().zip(self.0.iter_mut())
    }

    /// (left, right) of one axle.
    pub fn pair(&self, axle: Axle) -> (&T, &T) {
        (&self[Corner::new(axle, Side::Left)], &self[Corner::new(axle, Side::Right)])
    }
}

impl<T> Index<Corner> for PerWheel<T> {
    type Output = T;
    fn index(&self, c: Corner) -> &T { &self.0[c.index()] }
}

impl<T> IndexMut<Corner> for PerWheel<T> {
    fn index_mut(&mut self, c: Corner) -> &mut T { &mut self.0[c.index()] }
}

/// A front/rear pair of settings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerAxle<T> {
    pub front: T,
    pub rear: T,
}

impl<T: Copy> PerAxle<T> {
    pub fn new(front: T, rear: T) -> Self { Self { front, rear } }

    pub fn get(&self, axle: Axle) -> T {
        match axle {
            Axle::Front => self.front,
            Axle::Rear => self.rear,
        }
    }
}

// ============================================
// ----- small numeric helpers ----------------
// ============================================

/// Clamp to [0, 1], mapping NaN to 0.
#[inline]
pub fn unit_clamp(x: f32) -> f32 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}

/// Replace non-finite values with 0.
#[inline]
pub fn finite_or_zero(x: f32) -> f32 {
    if x.is_finite() { x } else { 0.0 }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 { a + (b - a) * t }

//! Swarm Consensus - collective decision making for a 2-D point swarm
//!
//! Core modules:
//! - `sim`: Deterministic simulation (kinematics, flocking forces, consensus protocols)
//! - `settings`: Environment and swarm parameter groups
//! - `metrics`: Per-checkpoint and per-tick performance measurements
//! - `error`: Initialization errors

pub mod error;
pub mod metrics;
pub mod settings;
pub mod sim;

pub use error::SimError;
pub use metrics::MetricsSink;
pub use settings::{EnvParams, Settings, SwarmParams};

use glam::Vec2;

/// Simulation tuning constants that are not part of the external configuration
pub mod consts {
    /// Denominator clamp for zero-distance normalization
    pub const EPSILON: f32 = 1e-6;

    /// Goal bias: gain applied to the centroid-to-goal vector
    pub const GOAL_PULL_GAIN: f32 = 0.04;
    /// Goal bias: weight of the centroid-to-goal component
    pub const GOAL_PULL_WEIGHT: f32 = 0.05;
    /// Goal bias: gain applied to the heading correction toward the goal
    pub const GOAL_TURN_GAIN: f32 = 0.02;
    /// Goal bias: weight of the heading correction component
    pub const GOAL_TURN_WEIGHT: f32 = 0.03;

    /// Kuramoto phase step (small to avoid overshoot)
    pub const PHASE_STEP: f32 = 0.2;
    /// Upper bound for the Kuramoto coupling strength
    pub const MAX_COUPLING: f32 = 1.0;

    /// Obstacle rectangle dimensions
    pub const OBSTACLE_WIDTH: f32 = 20.0;
    pub const OBSTACLE_HEIGHT: f32 = 30.0;
}

/// Wrap an angle into (-π, π]
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

/// Circular mean of a set of angles, `None` when the set is empty
pub fn circular_mean<I>(angles: I) -> Option<f32>
where
    I: IntoIterator<Item = f32>,
{
    let mut sum = Vec2::ZERO;
    let mut count = 0usize;
    for angle in angles {
        sum += Vec2::new(angle.cos(), angle.sin());
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(wrap_angle(sum.y.atan2(sum.x)))
}

/// Absolute angular difference, as recorded by the direction-mismatch metric
#[inline]
pub fn angle_mismatch(a: f32, b: f32) -> f32 {
    (a - b).abs()
}

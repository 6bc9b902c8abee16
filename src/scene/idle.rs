//! Idle animations played by overlay objects while their marker is visible.
//!
//! The behaviour is a plain value; the render loop advances the per-object
//! clock (see [`ObjectPool::advance`](super::ObjectPool::advance)) and asks
//! the behaviour for the local offset at that time.

use std::f64::consts::TAU;

use nalgebra::{UnitQuaternion, Vector3};

use crate::geometry::Pose;

/// Per-object idle animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdleBehavior {
    /// No animation.
    Still,
    /// Spin about the object's local +Y axis.
    Rotate { radians_per_sec: f64 },
    /// Uniform scale oscillating around 1.
    Pulse { amplitude: f64, frequency_hz: f64 },
    /// Vertical bobbing along local +Y.
    Bob { amplitude_m: f64, frequency_hz: f64 },
}

/// Local transform contributed by an idle animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdleOffset {
    pub local: Pose,
    pub scale: f64,
}

impl IdleOffset {
    pub fn none() -> Self {
        Self {
            local: Pose::identity(),
            scale: 1.0,
        }
    }
}

impl IdleBehavior {
    /// Offset after `elapsed_secs` of visible time.
    pub fn offset_at(&self, elapsed_secs: f64) -> IdleOffset {
        match *self {
            IdleBehavior::Still => IdleOffset::none(),
            IdleBehavior::Rotate { radians_per_sec } => IdleOffset {
                local: Pose::new(
                    Vector3::zeros(),
                    UnitQuaternion::from_axis_angle(
                        &Vector3::y_axis(),
                        (radians_per_sec * elapsed_secs) % TAU,
                    ),
                ),
                scale: 1.0,
            },
            IdleBehavior::Pulse {
                amplitude,
                frequency_hz,
            } => IdleOffset {
                local: Pose::identity(),
                scale: 1.0 + amplitude * (TAU * frequency_hz * elapsed_secs).sin(),
            },
            IdleBehavior::Bob {
                amplitude_m,
                frequency_hz,
            } => IdleOffset {
                local: Pose::from_position(Vector3::new(
                    0.0,
                    amplitude_m * (TAU * frequency_hz * elapsed_secs).sin(),
                    0.0,
                )),
                scale: 1.0,
            },
        }
    }
}

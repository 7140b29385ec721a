//! Anchored angular motion: an angle that rotates at a constant rate.
//!
//! A rotating body never stores its current orientation. It stores the angle
//! it had at one instant (the anchor) and how fast it turns; any later (or
//! earlier) orientation is a linear extrapolation from there. This keeps the
//! replicated state tiny and lets observers evaluate orientation every frame
//! without hearing from the authority.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

/// Reduce an angle (radians) into the canonical range `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let reduced = angle.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly TAU.
    if reduced >= TAU {
        0.0
    } else {
        reduced
    }
}

/// Signed shortest difference `to - from`, in `(-π, π]`.
pub fn angle_delta(from: f64, to: f64) -> f64 {
    let d = normalize_angle(to - from);
    if d > std::f64::consts::PI {
        d - TAU
    } else {
        d
    }
}

/// Anchor angle + anchor time + constant angular velocity.
///
/// `anchor_angle` is kept in `[0, 2π)`: every constructor and every mutator
/// normalizes, and deserialization goes through the same path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "AngularStateWire", into = "AngularStateWire")]
pub struct AngularState {
    anchor_angle: f64,
    anchor_time: f64,
    angular_velocity: f64,
}

/// Raw wire/storage layout of an [`AngularState`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct AngularStateWire {
    anchor_angle: f64,
    angular_velocity: f64,
    anchor_time: f64,
}

impl From<AngularStateWire> for AngularState {
    fn from(wire: AngularStateWire) -> Self {
        AngularState::new(wire.anchor_angle, wire.angular_velocity, wire.anchor_time)
    }
}

impl From<AngularState> for AngularStateWire {
    fn from(state: AngularState) -> Self {
        AngularStateWire {
            anchor_angle: state.anchor_angle,
            angular_velocity: state.angular_velocity,
            anchor_time: state.anchor_time,
        }
    }
}

impl AngularState {
    /// Anchor `angle` (radians) at `anchor_time` (sim seconds), turning at
    /// `angular_velocity` (radians per second).
    pub fn new(angle: f64, angular_velocity: f64, anchor_time: f64) -> Self {
        Self {
            anchor_angle: normalize_angle(angle),
            anchor_time,
            angular_velocity,
        }
    }

    /// A body that does not rotate.
    pub fn fixed(angle: f64, anchor_time: f64) -> Self {
        Self::new(angle, 0.0, anchor_time)
    }

    pub fn anchor_angle(&self) -> f64 {
        self.anchor_angle
    }

    pub fn anchor_time(&self) -> f64 {
        self.anchor_time
    }

    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    /// Orientation at sim time `t`. Defined for any `t`, including times
    /// before the anchor (extrapolates backward).
    pub fn angle_at(&self, t: f64) -> f64 {
        normalize_angle(self.anchor_angle + self.angular_velocity * (t - self.anchor_time))
    }

    /// Replace the anchor wholesale: from `now` on the body turns from
    /// `angle` at `angular_velocity`.
    pub fn reanchor(&mut self, angle: f64, angular_velocity: f64, now: f64) {
        *self = Self::new(angle, angular_velocity, now);
    }

    /// Push the anchor forward by a paused interval so the paused time never
    /// contributes to rotation.
    pub fn shift_anchor_time(&mut self, paused_secs: f64) {
        self.anchor_time += paused_secs;
    }

    /// A restored anchor may not lie in the past: if `anchor_time < now` it is
    /// raised to `now`, keeping the anchor angle and velocity.
    pub fn restored_at(self, now: f64) -> Self {
        if self.anchor_time < now {
            Self {
                anchor_time: now,
                ..self
            }
        } else {
            self
        }
    }
}

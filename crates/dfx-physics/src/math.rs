//! Math primitives shared by every backend.
//!
//! Vectors and orientations are plain `glam` f64 types. The only extra rule
//! this crate layers on top is finiteness: any value that crosses into a
//! world must be free of NaN and infinities.

pub use glam::{DQuat as Quat, DVec3 as Vec3};

/// Fallback normal reported when a direction cannot be derived.
pub const UP: Vec3 = Vec3::Y;

/// Finiteness check for values accepted by a world.
pub trait Finite {
    fn is_all_finite(&self) -> bool;
}

impl Finite for f64 {
    fn is_all_finite(&self) -> bool {
        self.is_finite()
    }
}

impl Finite for Vec3 {
    fn is_all_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Finite for Quat {
    /// Only finiteness is checked. A non-unit quaternion passes.
    fn is_all_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

/// Normalize a ray direction, rejecting lengths too small to normalize.
pub fn ray_direction(direction: Vec3) -> Option<Vec3> {
    let len = direction.length();
    if len.is_finite() && len > f64::EPSILON {
        Some(direction / len)
    } else {
        None
    }
}

/// Unit vector pointing from `from` toward `to`, or [`UP`] if they coincide.
pub fn unit_toward(from: Vec3, to: Vec3) -> Vec3 {
    let delta = to - from;
    let len = delta.length();
    if len > 0.0 {
        delta / len
    } else {
        UP
    }
}

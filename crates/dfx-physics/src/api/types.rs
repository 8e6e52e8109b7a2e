use serde::{Deserialize, Serialize};

use crate::error::{ensure, PhysicsResult};
use crate::math::{Finite, Quat, Vec3};

/// Opaque identifier for a body within one world.
///
/// Handles are minted from 1 upwards and never reused by the world that
/// minted them. 0 is reserved and never names a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BodyHandle(pub u64);

impl BodyHandle {
    /// The reserved "no body" handle.
    pub const INVALID: BodyHandle = BodyHandle(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves under integration.
    Static,
    /// Moves only by its own velocity or by explicit state writes. Ignores gravity.
    Kinematic,
    /// Subject to gravity and, with a full solver, collision response.
    Dynamic,
}

/// Collision shape family. Dimensions come from [`BodyDesc::shape_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// `size.x` is the radius.
    Sphere,
    /// `size` holds full extents along each axis.
    Box,
    /// `size.x` is the radius, `size.y` the half-height of the core segment (Y axis).
    Capsule,
}

/// Complete externally observable kinematic state of a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl Default for BodyState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

impl BodyState {
    /// Rest state at `position`.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_linear_velocity(mut self, vel: Vec3) -> Self {
        self.linear_velocity = vel;
        self
    }

    pub fn with_angular_velocity(mut self, vel: Vec3) -> Self {
        self.angular_velocity = vel;
        self
    }
}

impl Finite for BodyState {
    fn is_all_finite(&self) -> bool {
        self.position.is_all_finite()
            && self.orientation.is_all_finite()
            && self.linear_velocity.is_all_finite()
            && self.angular_velocity.is_all_finite()
    }
}

/// Everything needed to create a body. Immutable once the body exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyDesc {
    pub shape_kind: ShapeKind,
    pub shape_size: Vec3,
    pub body_kind: BodyKind,
    /// Mass in kilograms. 0 lets a full solver derive mass from the shape.
    pub mass_kg: f64,
    pub initial_state: BodyState,
}

impl BodyDesc {
    /// Dynamic sphere of the given radius at the origin.
    pub fn sphere(radius: f64) -> Self {
        Self::new(ShapeKind::Sphere, Vec3::new(radius, 0.0, 0.0))
    }

    /// Dynamic box with the given full extents at the origin.
    pub fn cuboid(extents: Vec3) -> Self {
        Self::new(ShapeKind::Box, extents)
    }

    /// Dynamic Y-aligned capsule at the origin.
    pub fn capsule(radius: f64, half_height: f64) -> Self {
        Self::new(ShapeKind::Capsule, Vec3::new(radius, half_height, 0.0))
    }

    fn new(shape_kind: ShapeKind, shape_size: Vec3) -> Self {
        Self {
            shape_kind,
            shape_size,
            body_kind: BodyKind::Dynamic,
            mass_kg: 1.0,
            initial_state: BodyState::default(),
        }
    }

    pub fn with_kind(mut self, kind: BodyKind) -> Self {
        self.body_kind = kind;
        self
    }

    pub fn with_mass(mut self, mass_kg: f64) -> Self {
        self.mass_kg = mass_kg;
        self
    }

    pub fn with_position(mut self, pos: Vec3) -> Self {
        self.initial_state.position = pos;
        self
    }

    pub fn with_velocity(mut self, vel: Vec3) -> Self {
        self.initial_state.linear_velocity = vel;
        self
    }

    pub fn with_state(mut self, state: BodyState) -> Self {
        self.initial_state = state;
        self
    }

    /// Check every numeric field a world relies on.
    pub fn validate(&self) -> PhysicsResult<()> {
        ensure(self.initial_state.is_all_finite(), "initial state must be finite")?;
        ensure(self.shape_size.is_all_finite(), "shape size must be finite")?;
        ensure(
            self.mass_kg.is_finite() && self.mass_kg >= 0.0,
            "mass must be finite and non-negative",
        )
    }

    /// Radius of a sphere enclosing the shape, centered on the body.
    ///
    /// Negative sizes clamp to zero.
    pub fn bounding_radius(&self) -> f64 {
        match self.shape_kind {
            ShapeKind::Sphere => self.shape_size.x.max(0.0),
            ShapeKind::Capsule => (self.shape_size.x + self.shape_size.y).max(0.0),
            ShapeKind::Box => self.shape_size.length() * 0.5,
        }
    }
}

/// A handle paired with the state read for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyStateRow {
    pub handle: BodyHandle,
    pub state: BodyState,
}

/// A ray query. `direction` need not be unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub max_distance: f64,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f64) -> Self {
        Self {
            origin,
            direction,
            max_distance,
        }
    }
}

/// Nearest body hit by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub handle: BodyHandle,
    /// Distance along the normalized ray direction.
    pub distance: f64,
    /// World-space point at `distance` along the ray.
    pub point: Vec3,
    /// Unit surface normal (reference backend: center toward ray origin).
    pub normal: Vec3,
}

/// One contact produced during the most recent step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// World-space contact point.
    pub point: Vec3,
    /// World-space unit normal pointing from `body_a` toward `body_b`.
    pub normal: Vec3,
    /// Penetration depth, positive when overlapping.
    pub depth: f64,
}

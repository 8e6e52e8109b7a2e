use serde::{Deserialize, Serialize};

use crate::error::{ensure, PhysicsResult};
use crate::math::{Finite, Vec3};

/// Solver knobs. Backends honor the ones they have a counterpart for; the
/// reference integrator ignores all of them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverTuning {
    /// Collision sub-steps per `step` call for a full solver. Values below 1 mean 1.
    pub solver_iterations: i32,
    /// Coulomb friction coefficient applied to new colliders.
    pub friction: f64,
    /// Bounciness applied to new colliders.
    pub restitution: f64,
    /// Constraint force mixing (softness).
    pub cfm: f64,
    /// Relative speed below which contacts do not bounce.
    pub restitution_threshold: f64,
}

impl Default for SolverTuning {
    fn default() -> Self {
        Self {
            solver_iterations: 1,
            friction: 0.5,
            restitution: 0.0,
            cfm: 1e-5,
            restitution_threshold: 1.0,
        }
    }
}

impl SolverTuning {
    pub fn validate(&self) -> PhysicsResult<()> {
        ensure(
            self.friction.is_all_finite()
                && self.restitution.is_all_finite()
                && self.cfm.is_all_finite()
                && self.restitution_threshold.is_all_finite(),
            "tuning values must be finite",
        )
    }

    /// Sub-step count a full solver should run, never below 1.
    pub fn substeps(&self) -> u32 {
        self.solver_iterations.max(1) as u32
    }
}

/// Configuration for a world, fixed at creation except where a setter exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Gravity acceleration in m/s². Default: Earth gravity along -Y.
    pub gravity: Vec3,
    /// Nominal step used by [`crate::World::advance`] (default: 1/60).
    pub fixed_step_seconds: f64,
    pub tuning: SolverTuning,
    /// Maximum number of contacts kept from one step (default: 1024).
    pub max_contacts: usize,
    /// Most fixed steps one [`crate::World::advance`] call may run (default: 10).
    pub max_steps_per_advance: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_step_seconds: 1.0 / 60.0,
            tuning: SolverTuning::default(),
            max_contacts: 1024,
            max_steps_per_advance: 10,
        }
    }
}

impl WorldConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_fixed_step(mut self, seconds: f64) -> Self {
        self.fixed_step_seconds = seconds;
        self
    }

    pub fn with_tuning(mut self, tuning: SolverTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_max_contacts(mut self, max_contacts: usize) -> Self {
        self.max_contacts = max_contacts;
        self
    }

    pub fn with_max_steps_per_advance(mut self, steps: u32) -> Self {
        self.max_steps_per_advance = steps;
        self
    }

    pub fn validate(&self) -> PhysicsResult<()> {
        ensure(self.gravity.is_all_finite(), "gravity must be finite")?;
        ensure(
            self.fixed_step_seconds.is_finite() && self.fixed_step_seconds > 0.0,
            "fixed step must be finite and positive",
        )?;
        ensure(self.max_steps_per_advance >= 1, "max steps per advance must be at least 1")?;
        self.tuning.validate()
    }
}

//! Simulated time for one world.

use crate::api::config::WorldConfig;
use crate::error::{ensure, PhysicsResult};

/// Tracks simulated seconds, completed steps and the frame time banked for
/// [`crate::World::advance`].
///
/// Banked time is only spent as fixed steps complete, so a step that fails
/// leaves its share (and that of every step after it) in the bank for the
/// next call.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    fixed_dt: f64,
    max_steps: u32,
    /// Frame time not yet simulated, at most `fixed_dt * max_steps`.
    banked: f64,
    elapsed: f64,
    steps: u64,
}

impl SimulationClock {
    /// `fixed_dt` must be finite and positive; `max_steps` is raised to 1.
    pub fn new(fixed_dt: f64, max_steps: u32) -> Self {
        Self {
            fixed_dt,
            max_steps: max_steps.max(1),
            banked: 0.0,
            elapsed: 0.0,
            steps: 0,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.fixed_step_seconds, config.max_steps_per_advance)
    }

    /// Bank frame time and return how many fixed steps are now due.
    ///
    /// Time beyond `max_steps` fixed steps is discarded so a long stall cannot
    /// queue an unbounded backlog.
    pub fn bank(&mut self, frame_dt: f64) -> PhysicsResult<u32> {
        ensure(
            frame_dt.is_finite() && frame_dt >= 0.0,
            "frame dt must be finite and non-negative",
        )?;
        let ceiling = self.fixed_dt * self.max_steps as f64;
        self.banked = (self.banked + frame_dt).min(ceiling);
        Ok(self.due_steps())
    }

    /// Whole fixed steps covered by the bank.
    pub fn due_steps(&self) -> u32 {
        ((self.banked / self.fixed_dt) as u32).min(self.max_steps)
    }

    /// Record a completed step of arbitrary length. The bank is untouched.
    pub fn record_step(&mut self, dt: f64) {
        self.elapsed += dt;
        self.steps += 1;
    }

    /// Record a completed fixed step and spend its time from the bank.
    pub fn record_fixed_step(&mut self) {
        self.banked = (self.banked - self.fixed_dt).max(0.0);
        self.record_step(self.fixed_dt);
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    /// Banked time not yet simulated, in seconds.
    pub fn banked(&self) -> f64 {
        self.banked
    }

    /// Banked time as a fraction of one fixed step.
    pub fn alpha(&self) -> f64 {
        self.banked / self.fixed_dt
    }

    /// Simulated seconds across completed steps.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}

//! The world: one backend, its contact sink and its clock behind one lock.

use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use crate::api::config::{SolverTuning, WorldConfig};
use crate::api::types::{
    BodyDesc, BodyHandle, BodyState, BodyStateRow, ContactEvent, Ray, RaycastHit,
};
use crate::backend::{self, BackendKind, Capabilities, PhysicsBackend, StepParams};
use crate::core::contacts::ContactBuffer;
use crate::core::clock::SimulationClock;
use crate::core::runtime::{EngineRuntime, RuntimeLease, ENGINE};
use crate::error::{ensure, PhysicsError, PhysicsResult};
use crate::math::{self, Finite, Vec3};

struct WorldInner {
    config: WorldConfig,
    backend: Box<dyn PhysicsBackend>,
    contacts: ContactBuffer,
    clock: SimulationClock,
}

/// A simulation world.
///
/// All methods take `&self`; each locks the world for its whole duration, so
/// a `World` can be shared between threads behind an `Arc`. Dropping it
/// destroys every body it owns.
pub struct World {
    inner: Mutex<WorldInner>,
    _lease: RuntimeLease,
}

impl World {
    /// Create a world on the reference backend.
    pub fn new(config: WorldConfig) -> PhysicsResult<Self> {
        Self::with_backend(config, BackendKind::Reference)
    }

    /// Create a world on the given backend.
    pub fn with_backend(config: WorldConfig, kind: BackendKind) -> PhysicsResult<Self> {
        Self::with_runtime(config, kind, &ENGINE)
    }

    /// Create a world leasing `runtime`. The lease is taken before the backend
    /// is built and released again if construction fails.
    pub(crate) fn with_runtime(
        config: WorldConfig,
        kind: BackendKind,
        runtime: &'static EngineRuntime,
    ) -> PhysicsResult<Self> {
        config.validate()?;
        let lease = runtime.acquire();
        let backend = backend::create(kind, &config)?;

        info!(
            "World created: backend={} gravity={:?} fixed_step={}s",
            kind.name(),
            config.gravity,
            config.fixed_step_seconds
        );

        Ok(Self {
            inner: Mutex::new(WorldInner {
                contacts: ContactBuffer::with_capacity(config.max_contacts),
                clock: SimulationClock::from_config(&config),
                config,
                backend,
            }),
            _lease: lease,
        })
    }

    // -- Bodies --

    /// Register a body. It is visible to steps, reads and raycasts at once.
    pub fn create_body(&self, desc: &BodyDesc) -> PhysicsResult<BodyHandle> {
        desc.validate()?;
        let mut inner = self.inner.lock();
        let WorldInner {
            config, backend, ..
        } = &mut *inner;
        let handle = backend.create_body(desc, config)?;
        debug!(
            "Body {} created: {:?} {:?} mass={}",
            handle.0, desc.body_kind, desc.shape_kind, desc.mass_kg
        );
        Ok(handle)
    }

    pub fn destroy_body(&self, handle: BodyHandle) -> PhysicsResult<()> {
        check_handle(handle)?;
        let mut inner = self.inner.lock();
        if !inner.backend.destroy_body(handle) {
            return Err(PhysicsError::NotFound(handle.0));
        }
        debug!("Body {} destroyed", handle.0);
        Ok(())
    }

    pub fn body_state(&self, handle: BodyHandle) -> PhysicsResult<BodyState> {
        check_handle(handle)?;
        self.inner
            .lock()
            .backend
            .body_state(handle)
            .ok_or(PhysicsError::NotFound(handle.0))
    }

    /// Overwrite a body's state. Kind, shape and mass are untouched.
    ///
    /// Non-finite input is rejected before the handle is looked up.
    pub fn set_body_state(&self, handle: BodyHandle, state: &BodyState) -> PhysicsResult<()> {
        ensure(state.is_all_finite(), "body state must be finite")?;
        check_handle(handle)?;
        if self.inner.lock().backend.set_body_state(handle, state) {
            Ok(())
        } else {
            Err(PhysicsError::NotFound(handle.0))
        }
    }

    /// Read several states at once. Any unknown handle fails the whole batch.
    pub fn body_states(&self, handles: &[BodyHandle]) -> PhysicsResult<Vec<BodyStateRow>> {
        let inner = self.inner.lock();
        handles
            .iter()
            .map(|&handle| {
                check_handle(handle)?;
                let state = inner
                    .backend
                    .body_state(handle)
                    .ok_or(PhysicsError::NotFound(handle.0))?;
                Ok(BodyStateRow { handle, state })
            })
            .collect()
    }

    /// The descriptor a body was created with.
    pub fn body_desc(&self, handle: BodyHandle) -> PhysicsResult<BodyDesc> {
        check_handle(handle)?;
        self.inner
            .lock()
            .backend
            .body_desc(handle)
            .ok_or(PhysicsError::NotFound(handle.0))
    }

    /// Live handles in ascending order.
    pub fn bodies(&self) -> Vec<BodyHandle> {
        self.inner.lock().backend.handles()
    }

    pub fn body_count(&self) -> usize {
        self.inner.lock().backend.body_count()
    }

    // -- Simulation --

    /// Advance the world by `dt` seconds.
    pub fn step(&self, dt: f64) -> PhysicsResult<()> {
        ensure(dt.is_finite() && dt > 0.0, "dt must be finite and positive")?;
        let mut inner = self.inner.lock();
        inner.run_step(dt)?;
        inner.clock.record_step(dt);
        Ok(())
    }

    /// Bank frame time and run the fixed steps it covers, at most
    /// `max_steps_per_advance` per call. Returns the number of steps run.
    ///
    /// If a step fails, the time of that step and of the ones after it stays
    /// banked for the next call.
    pub fn advance(&self, frame_dt: f64) -> PhysicsResult<u32> {
        let mut inner = self.inner.lock();
        let due = inner.clock.bank(frame_dt)?;
        let dt = inner.clock.fixed_dt();
        for _ in 0..due {
            inner.run_step(dt)?;
            inner.clock.record_fixed_step();
        }
        Ok(due)
    }

    /// Fraction of a fixed step still banked after [`World::advance`].
    pub fn interpolation_alpha(&self) -> f64 {
        self.inner.lock().clock.alpha()
    }

    /// Frame time banked by [`World::advance`] but not yet simulated.
    pub fn banked_time(&self) -> f64 {
        self.inner.lock().clock.banked()
    }

    /// Total simulated seconds across successful steps.
    pub fn simulation_time(&self) -> f64 {
        self.inner.lock().clock.elapsed()
    }

    // -- Queries --

    /// Nearest body along a ray, if any lies within `max_distance`.
    pub fn raycast(&self, ray: &Ray) -> PhysicsResult<Option<RaycastHit>> {
        ensure(ray.origin.is_all_finite(), "ray origin must be finite")?;
        ensure(ray.direction.is_all_finite(), "ray direction must be finite")?;
        ensure(
            ray.max_distance.is_finite() && ray.max_distance > 0.0,
            "max distance must be finite and positive",
        )?;
        let direction = math::ray_direction(ray.direction)
            .ok_or(PhysicsError::Validation("ray direction has zero length"))?;

        let normalized = Ray::new(ray.origin, direction, ray.max_distance);
        Ok(self.inner.lock().backend.raycast(&normalized))
    }

    /// Remove and return up to `capacity` contacts from the most recent step.
    pub fn drain_contacts(&self, capacity: usize) -> Vec<ContactEvent> {
        self.inner.lock().contacts.drain(capacity)
    }

    // -- Configuration --

    pub fn gravity(&self) -> Vec3 {
        self.inner.lock().config.gravity
    }

    pub fn set_gravity(&self, gravity: Vec3) -> PhysicsResult<()> {
        ensure(gravity.is_all_finite(), "gravity must be finite")?;
        self.inner.lock().config.gravity = gravity;
        Ok(())
    }

    pub fn tuning(&self) -> SolverTuning {
        self.inner.lock().config.tuning
    }

    /// Replace the solver tuning. Friction and restitution apply to bodies
    /// created afterwards.
    pub fn set_tuning(&self, tuning: SolverTuning) -> PhysicsResult<()> {
        tuning.validate()?;
        self.inner.lock().config.tuning = tuning;
        Ok(())
    }

    pub fn config(&self) -> WorldConfig {
        self.inner.lock().config.clone()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.inner.lock().backend.kind()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.lock().backend.capabilities()
    }
}

impl WorldInner {
    /// Run one backend step. The clock is left to the caller.
    fn run_step(&mut self, dt: f64) -> PhysicsResult<()> {
        let params = StepParams {
            dt,
            gravity: self.config.gravity,
            config: &self.config,
        };
        if let Err(err) = self.backend.step(params, &mut self.contacts) {
            warn!("Step {} failed: {}", self.clock.steps() + 1, err);
            return Err(err);
        }

        if self.contacts.dropped() > 0 {
            warn!(
                "Contact buffer full ({}), dropped {} contacts",
                self.contacts.capacity(),
                self.contacts.dropped()
            );
        }

        trace!(
            "Step {} dt={} bodies={} contacts={}",
            self.clock.steps() + 1,
            dt,
            self.backend.body_count(),
            self.contacts.len()
        );
        Ok(())
    }
}

impl Drop for World {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        let count = inner.backend.body_count();
        inner.backend.clear();
        info!(
            "World destroyed: backend={} bodies={} steps={}",
            inner.backend.kind().name(),
            count,
            inner.clock.steps()
        );
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("World")
            .field("backend", &inner.backend.kind())
            .field("bodies", &inner.backend.body_count())
            .field("simulation_time", &inner.clock.elapsed())
            .finish()
    }
}

fn check_handle(handle: BodyHandle) -> PhysicsResult<()> {
    if handle.is_valid() {
        Ok(())
    } else {
        Err(PhysicsError::InvalidArgument("body handle 0 is reserved"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

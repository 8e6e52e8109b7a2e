//! Simulation backends.
//!
//! A [`crate::World`] validates input, serializes access and keeps the clock;
//! everything that touches bodies goes through [`PhysicsBackend`]. Inputs
//! reaching a backend have already passed validation.

pub mod reference;
#[cfg(feature = "rapier")]
pub mod rapier;

use serde::{Deserialize, Serialize};

use crate::api::config::WorldConfig;
use crate::api::types::{BodyDesc, BodyHandle, BodyState, Ray, RaycastHit};
use crate::core::contacts::ContactBuffer;
use crate::error::PhysicsResult;
use crate::math::Vec3;

/// Which backend a world runs on. Chosen once, at world creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// Analytic integrator without collision response.
    Reference,
    /// Full rigid-body solver built on rapier.
    Rapier,
}

impl BackendKind {
    /// Numeric mode reported across the C boundary.
    pub fn mode(self) -> u32 {
        match self {
            BackendKind::Reference => 0,
            BackendKind::Rapier => 1,
        }
    }

    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode {
            0 => Some(BackendKind::Reference),
            1 => Some(BackendKind::Rapier),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Reference => "reference",
            BackendKind::Rapier => "rapier",
        }
    }

    /// Whether this build can create worlds of this kind.
    pub fn is_available(self) -> bool {
        match self {
            BackendKind::Reference => true,
            BackendKind::Rapier => cfg!(feature = "rapier"),
        }
    }

    /// The most capable backend compiled in.
    pub fn preferred() -> Self {
        if BackendKind::Rapier.is_available() {
            BackendKind::Rapier
        } else {
            BackendKind::Reference
        }
    }
}

/// What a backend can do beyond the common contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub rigid_bodies: bool,
    pub constraints: bool,
    /// Raycasts hit exact shape surfaces rather than bounding spheres.
    pub exact_queries: bool,
    /// Steps can produce contacts.
    pub contact_reports: bool,
    pub kinematic_bodies: bool,
}

/// Per-step inputs a backend needs from its world.
#[derive(Debug, Clone, Copy)]
pub struct StepParams<'a> {
    pub dt: f64,
    pub gravity: Vec3,
    pub config: &'a WorldConfig,
}

/// The contract both backends implement.
pub trait PhysicsBackend: Send {
    fn kind(&self) -> BackendKind;

    fn capabilities(&self) -> Capabilities;

    /// Register a validated body under a new handle.
    fn create_body(&mut self, desc: &BodyDesc, config: &WorldConfig) -> PhysicsResult<BodyHandle>;

    /// Remove a body. Returns `false` if the handle was not live.
    fn destroy_body(&mut self, handle: BodyHandle) -> bool;

    fn body_state(&self, handle: BodyHandle) -> Option<BodyState>;

    fn body_desc(&self, handle: BodyHandle) -> Option<BodyDesc>;

    /// Overwrite a body's state. Returns `false` if the handle was not live.
    fn set_body_state(&mut self, handle: BodyHandle, state: &BodyState) -> bool;

    /// Advance every body by `params.dt`.
    ///
    /// On success `contacts` holds exactly this step's contacts. On failure
    /// every body is back at its pre-step state and `contacts` is untouched.
    fn step(&mut self, params: StepParams<'_>, contacts: &mut ContactBuffer) -> PhysicsResult<()>;

    /// Nearest hit along a ray whose direction is already unit length.
    fn raycast(&mut self, ray: &Ray) -> Option<RaycastHit>;

    /// Live handles in ascending order.
    fn handles(&self) -> Vec<BodyHandle>;

    fn body_count(&self) -> usize;

    /// Remove every body.
    fn clear(&mut self);
}

/// Build a backend of the requested kind.
pub fn create(kind: BackendKind, config: &WorldConfig) -> PhysicsResult<Box<dyn PhysicsBackend>> {
    match kind {
        BackendKind::Reference => Ok(Box::new(reference::ReferenceBackend::new())),
        #[cfg(feature = "rapier")]
        BackendKind::Rapier => Ok(Box::new(rapier::RapierBackend::new(config))),
        #[cfg(not(feature = "rapier"))]
        BackendKind::Rapier => {
            let _ = config;
            Err(crate::error::PhysicsError::BackendUnavailable(kind.name()))
        }
    }
}

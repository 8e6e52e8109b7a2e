pub mod math;
pub mod error;
pub mod api;
pub mod core;
pub mod backend;
pub mod bridge;

// Re-export key types at crate root for convenience
pub use api::config::{SolverTuning, WorldConfig};
pub use api::types::{
    BodyDesc, BodyHandle, BodyKind, BodyState, BodyStateRow, ContactEvent, Ray, RaycastHit,
    ShapeKind,
};
pub use backend::{BackendKind, Capabilities, PhysicsBackend};
pub use bridge::protocol::{API_VERSION, STATE_DOUBLES};
pub use core::world::World;
pub use error::{PhysicsError, PhysicsResult};
pub use math::{Quat, Vec3};

/// Wire format shared with foreign callers.
/// Must stay in sync with the C header consumers compile against.
///
/// Body state layout (all values f64 / 8 bytes):
/// ```text
/// [position: 3][orientation x y z w: 4][linear velocity: 3][angular velocity: 3]
/// ```
///
/// Batches of states are rows of this layout laid end to end.

use bytemuck::{Pod, Zeroable};

use crate::api::types::{BodyKind, BodyState, BodyStateRow, ShapeKind};
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Quat, Vec3};

/// ABI revision reported by `dfx_api_version`.
pub const API_VERSION: u32 = 1;

/// Doubles per body state (wire format, never changes).
pub const STATE_DOUBLES: usize = 13;

/// State field offsets.
pub const STATE_POSITION: usize = 0;
pub const STATE_ORIENTATION: usize = 3;
pub const STATE_LINEAR_VELOCITY: usize = 7;
pub const STATE_ANGULAR_VELOCITY: usize = 10;

/// Status codes returned across the boundary.
pub const STATUS_OK: i32 = 0;
pub const STATUS_INVALID_ARGUMENT: i32 = -1;
pub const STATUS_NOT_FOUND: i32 = -2;
pub const STATUS_VALIDATION_FAILURE: i32 = -3;
pub const STATUS_INTERNAL_ERROR: i32 = -4;

/// One body state in wire layout.
///
/// Field order and the absence of padding make this exactly
/// [`STATE_DOUBLES`] doubles, so it casts to and from `f64` slices.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct FlatState {
    pub position: Vec3,
    /// x y z w
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl From<&BodyState> for FlatState {
    fn from(state: &BodyState) -> Self {
        Self {
            position: state.position,
            orientation: state.orientation,
            linear_velocity: state.linear_velocity,
            angular_velocity: state.angular_velocity,
        }
    }
}

impl FlatState {
    pub fn to_state(&self) -> BodyState {
        BodyState {
            position: self.position,
            orientation: self.orientation,
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
        }
    }

    pub fn as_doubles(&self) -> &[f64] {
        bytemuck::cast_slice(std::slice::from_ref(self))
    }
}

/// Write a state into the first [`STATE_DOUBLES`] slots of `out`.
pub fn write_state(state: &BodyState, out: &mut [f64]) -> PhysicsResult<()> {
    let dst = out
        .get_mut(..STATE_DOUBLES)
        .ok_or(PhysicsError::InvalidArgument("state buffer shorter than 13 doubles"))?;
    dst.copy_from_slice(FlatState::from(state).as_doubles());
    Ok(())
}

/// Read a state from the first [`STATE_DOUBLES`] slots of `src`.
pub fn read_state(src: &[f64]) -> PhysicsResult<BodyState> {
    let src = src
        .get(..STATE_DOUBLES)
        .ok_or(PhysicsError::InvalidArgument("state buffer shorter than 13 doubles"))?;
    let flat: FlatState = bytemuck::pod_read_unaligned(bytemuck::cast_slice(src));
    Ok(flat.to_state())
}

/// Pack rows into one contiguous buffer of `rows.len() * 13` doubles.
pub fn pack_states(rows: &[BodyStateRow]) -> Vec<f64> {
    let flat: Vec<FlatState> = rows.iter().map(|row| FlatState::from(&row.state)).collect();
    bytemuck::cast_slice::<FlatState, f64>(&flat).to_vec()
}

pub fn shape_kind_from_code(code: i32) -> Option<ShapeKind> {
    match code {
        0 => Some(ShapeKind::Sphere),
        1 => Some(ShapeKind::Box),
        2 => Some(ShapeKind::Capsule),
        _ => None,
    }
}

pub fn shape_kind_code(kind: ShapeKind) -> i32 {
    match kind {
        ShapeKind::Sphere => 0,
        ShapeKind::Box => 1,
        ShapeKind::Capsule => 2,
    }
}

pub fn body_kind_from_code(code: i32) -> Option<BodyKind> {
    match code {
        0 => Some(BodyKind::Static),
        1 => Some(BodyKind::Kinematic),
        2 => Some(BodyKind::Dynamic),
        _ => None,
    }
}

pub fn body_kind_code(kind: BodyKind) -> i32 {
    match kind {
        BodyKind::Static => 0,
        BodyKind::Kinematic => 1,
        BodyKind::Dynamic => 2,
    }
}

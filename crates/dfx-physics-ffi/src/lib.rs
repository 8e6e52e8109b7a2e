//! C ABI for dfx-physics worlds.
//!
//! Worlds cross the boundary as opaque pointers and bodies as `u64` handles
//! (0 is never a valid handle). Functions return the status codes from
//! [`dfx_physics::bridge::protocol`]; panics are caught and reported as
//! `STATUS_INTERNAL_ERROR`.
//!
//! # Safety
//!
//! Pointer arguments must be null or valid for the access the function
//! documents. A world pointer must come from `dfx_world_create*` and must not
//! be used after `dfx_world_destroy`. A world may be used from several threads
//! at once; calls are serialized internally.

use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;

use dfx_physics::bridge::protocol::{
    self, API_VERSION, STATE_DOUBLES, STATUS_INTERNAL_ERROR, STATUS_NOT_FOUND, STATUS_OK,
};
use dfx_physics::{
    BackendKind, BodyDesc, BodyHandle, BodyState, PhysicsError, PhysicsResult, Quat, Ray,
    SolverTuning, Vec3, World, WorldConfig,
};

// ============================================================================
// C-compatible types
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DfxVec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation, scalar part last.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DfxQuat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for DfxQuat {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }
}

/// Full kinematic state: 13 doubles in wire order.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DfxBodyState {
    pub position: DfxVec3,
    pub orientation: DfxQuat,
    pub linear_velocity: DfxVec3,
    pub angular_velocity: DfxVec3,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DfxSolverTuning {
    /// Collision sub-steps per step (full backend only)
    pub solver_iterations: i32,
    pub friction: f64,
    pub restitution: f64,
    /// Constraint softness
    pub cfm: f64,
    pub restitution_threshold: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DfxWorldConfig {
    /// Gravity acceleration (m/s^2)
    pub gravity: DfxVec3,
    /// Nominal step, must be > 0
    pub fixed_step_seconds: f64,
    pub tuning: DfxSolverTuning,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DfxBodyDesc {
    /// 0 sphere, 1 box, 2 capsule
    pub shape_kind: i32,
    /// 0 static, 1 kinematic, 2 dynamic
    pub body_kind: i32,
    pub mass_kg: f64,
    /// Sphere: x = radius. Capsule: x = radius, y = half-height. Box: full extents.
    pub shape_size: DfxVec3,
    pub initial_state: DfxBodyState,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DfxBodyStateRow {
    pub body_id: u64,
    pub state: DfxBodyState,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DfxRaycastRequest {
    pub origin: DfxVec3,
    /// Need not be unit length
    pub direction: DfxVec3,
    pub max_distance: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DfxRaycastHit {
    pub body_id: u64,
    pub distance: f64,
    pub point: DfxVec3,
    pub normal: DfxVec3,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DfxContactRow {
    pub body_a: u64,
    pub body_b: u64,
    pub point: DfxVec3,
    pub normal: DfxVec3,
    pub depth: f64,
}

// ============================================================================
// Helper conversions
// ============================================================================

impl DfxVec3 {
    fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    fn from_vec3(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl DfxQuat {
    fn to_quat(self) -> Quat {
        Quat::from_xyzw(self.x, self.y, self.z, self.w)
    }

    fn from_quat(q: Quat) -> Self {
        Self { x: q.x, y: q.y, z: q.z, w: q.w }
    }
}

impl DfxBodyState {
    fn to_state(self) -> BodyState {
        BodyState {
            position: self.position.to_vec3(),
            orientation: self.orientation.to_quat(),
            linear_velocity: self.linear_velocity.to_vec3(),
            angular_velocity: self.angular_velocity.to_vec3(),
        }
    }

    fn from_state(state: &BodyState) -> Self {
        Self {
            position: DfxVec3::from_vec3(state.position),
            orientation: DfxQuat::from_quat(state.orientation),
            linear_velocity: DfxVec3::from_vec3(state.linear_velocity),
            angular_velocity: DfxVec3::from_vec3(state.angular_velocity),
        }
    }
}

impl DfxWorldConfig {
    fn to_config(self) -> WorldConfig {
        let t = self.tuning;
        WorldConfig::default()
            .with_gravity(self.gravity.to_vec3())
            .with_fixed_step(self.fixed_step_seconds)
            .with_tuning(SolverTuning {
                solver_iterations: t.solver_iterations,
                friction: t.friction,
                restitution: t.restitution,
                cfm: t.cfm,
                restitution_threshold: t.restitution_threshold,
            })
    }
}

impl Default for DfxWorldConfig {
    fn default() -> Self {
        let config = WorldConfig::default();
        let t = config.tuning;
        Self {
            gravity: DfxVec3::from_vec3(config.gravity),
            fixed_step_seconds: config.fixed_step_seconds,
            tuning: DfxSolverTuning {
                solver_iterations: t.solver_iterations,
                friction: t.friction,
                restitution: t.restitution,
                cfm: t.cfm,
                restitution_threshold: t.restitution_threshold,
            },
        }
    }
}

impl DfxBodyDesc {
    fn to_desc(self) -> PhysicsResult<BodyDesc> {
        let shape_kind = protocol::shape_kind_from_code(self.shape_kind)
            .ok_or(PhysicsError::InvalidArgument("unknown shape kind"))?;
        let body_kind = protocol::body_kind_from_code(self.body_kind)
            .ok_or(PhysicsError::InvalidArgument("unknown body kind"))?;
        Ok(BodyDesc {
            shape_kind,
            shape_size: self.shape_size.to_vec3(),
            body_kind,
            mass_kg: self.mass_kg,
            initial_state: self.initial_state.to_state(),
        })
    }
}

// ============================================================================
// Boundary plumbing
// ============================================================================

/// Run `f`, mapping errors to their status code and panics to
/// `STATUS_INTERNAL_ERROR`.
fn guard(f: impl FnOnce() -> PhysicsResult<i32>) -> i32 {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(code)) => code,
        Ok(Err(err)) => {
            log::debug!("dfx call failed: {}", err);
            err.status()
        }
        Err(_) => {
            log::error!("panic caught at the C boundary");
            STATUS_INTERNAL_ERROR
        }
    }
}

/// # Safety
/// `world` must be null or a live pointer from `dfx_world_create*`.
unsafe fn world_ref<'a>(world: *const World) -> PhysicsResult<&'a World> {
    world
        .as_ref()
        .ok_or(PhysicsError::InvalidArgument("world is null"))
}

/// # Safety
/// `ptr` must be null or valid for reads of `T`.
unsafe fn read_arg<T: Copy>(ptr: *const T, what: &'static str) -> PhysicsResult<T> {
    ptr.as_ref().copied().ok_or(PhysicsError::InvalidArgument(what))
}

/// # Safety
/// `ptr` must be null or valid for writes of `T`.
unsafe fn write_arg<T>(ptr: *mut T, value: T, what: &'static str) -> PhysicsResult<()> {
    if ptr.is_null() {
        return Err(PhysicsError::InvalidArgument(what));
    }
    ptr.write(value);
    Ok(())
}

// ============================================================================
// Version and logging
// ============================================================================

/// ABI revision of this library.
#[no_mangle]
pub extern "C" fn dfx_api_version() -> u32 {
    API_VERSION
}

/// Backend `dfx_world_create` uses: 0 reference, 1 rapier.
#[no_mangle]
pub extern "C" fn dfx_backend_mode() -> u32 {
    BackendKind::preferred().mode()
}

/// Install a stderr logger driven by `RUST_LOG`. Safe to call repeatedly.
#[no_mangle]
pub extern "C" fn dfx_init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .try_init();
}

// ============================================================================
// World lifecycle
// ============================================================================

/// Create a world on the most capable backend compiled in.
/// Returns null if `config` is null or invalid. Free with `dfx_world_destroy`.
///
/// # Safety
/// `config` must be null or point to a valid `DfxWorldConfig`.
#[no_mangle]
pub unsafe extern "C" fn dfx_world_create(config: *const DfxWorldConfig) -> *mut World {
    dfx_world_create_with_backend(config, dfx_backend_mode())
}

/// Create a world on a specific backend (0 reference, 1 rapier).
/// Returns null on a null or invalid config or an unavailable backend.
///
/// # Safety
/// `config` must be null or point to a valid `DfxWorldConfig`.
#[no_mangle]
pub unsafe extern "C" fn dfx_world_create_with_backend(
    config: *const DfxWorldConfig,
    mode: u32,
) -> *mut World {
    let result = panic::catch_unwind(AssertUnwindSafe(|| -> PhysicsResult<World> {
        let config = read_arg(config, "config is null")?.to_config();
        let kind = BackendKind::from_mode(mode)
            .ok_or(PhysicsError::InvalidArgument("unknown backend mode"))?;
        World::with_backend(config, kind)
    }));
    match result {
        Ok(Ok(world)) => Box::into_raw(Box::new(world)),
        Ok(Err(err)) => {
            log::warn!("dfx_world_create failed: {}", err);
            ptr::null_mut()
        }
        Err(_) => {
            log::error!("panic caught in dfx_world_create");
            ptr::null_mut()
        }
    }
}

/// Destroy a world and every body in it. Null is a no-op.
///
/// # Safety
/// `world` must be null or a pointer from `dfx_world_create*` not yet destroyed,
/// with no other thread using it.
#[no_mangle]
pub unsafe extern "C" fn dfx_world_destroy(world: *mut World) {
    if !world.is_null() {
        drop(Box::from_raw(world));
    }
}

/// Number of live bodies, 0 for a null world.
///
/// # Safety
/// `world` must be null or a live world pointer.
#[no_mangle]
pub unsafe extern "C" fn dfx_world_body_count(world: *const World) -> u64 {
    match world.as_ref() {
        Some(w) => w.body_count() as u64,
        None => 0,
    }
}

/// Advance the world by `dt` seconds.
///
/// # Safety
/// `world` must be null or a live world pointer.
#[no_mangle]
pub unsafe extern "C" fn dfx_world_step(world: *const World, dt: f64) -> i32 {
    guard(|| {
        world_ref(world)?.step(dt)?;
        Ok(STATUS_OK)
    })
}

// ============================================================================
// Bodies
// ============================================================================

/// Create a body. Returns its handle, or 0 on any failure.
///
/// # Safety
/// `world` must be null or a live world pointer; `desc` must be null or point
/// to a valid `DfxBodyDesc`.
#[no_mangle]
pub unsafe extern "C" fn dfx_body_create(world: *const World, desc: *const DfxBodyDesc) -> u64 {
    let result = panic::catch_unwind(AssertUnwindSafe(|| -> PhysicsResult<BodyHandle> {
        let world = world_ref(world)?;
        let desc = read_arg(desc, "body descriptor is null")?.to_desc()?;
        world.create_body(&desc)
    }));
    match result {
        Ok(Ok(handle)) => handle.0,
        Ok(Err(err)) => {
            log::debug!("dfx_body_create failed: {}", err);
            BodyHandle::INVALID.0
        }
        Err(_) => {
            log::error!("panic caught in dfx_body_create");
            BodyHandle::INVALID.0
        }
    }
}

/// Destroy a body. Stale handles report not-found.
///
/// # Safety
/// `world` must be null or a live world pointer.
#[no_mangle]
pub unsafe extern "C" fn dfx_body_destroy(world: *const World, body_id: u64) -> i32 {
    guard(|| {
        world_ref(world)?.destroy_body(BodyHandle(body_id))?;
        Ok(STATUS_OK)
    })
}

/// # Safety
/// `world` must be null or a live world pointer; `out` must be null or valid
/// for a write of `DfxBodyState`.
#[no_mangle]
pub unsafe extern "C" fn dfx_body_get_state(
    world: *const World,
    body_id: u64,
    out: *mut DfxBodyState,
) -> i32 {
    guard(|| {
        let world = world_ref(world)?;
        let state = world.body_state(BodyHandle(body_id))?;
        write_arg(out, DfxBodyState::from_state(&state), "output state is null")?;
        Ok(STATUS_OK)
    })
}

/// # Safety
/// `world` must be null or a live world pointer; `state` must be null or point
/// to a valid `DfxBodyState`.
#[no_mangle]
pub unsafe extern "C" fn dfx_body_set_state(
    world: *const World,
    body_id: u64,
    state: *const DfxBodyState,
) -> i32 {
    guard(|| {
        let world = world_ref(world)?;
        let state = read_arg(state, "state is null")?.to_state();
        world.set_body_state(BodyHandle(body_id), &state)?;
        Ok(STATUS_OK)
    })
}

/// Write a body's state as 13 doubles into `out` (`len >= 13`).
///
/// # Safety
/// `out` must be null or valid for writes of `len` doubles.
#[no_mangle]
pub unsafe extern "C" fn dfx_body_get_state_flat(
    world: *const World,
    body_id: u64,
    out: *mut f64,
    len: usize,
) -> i32 {
    guard(|| {
        let world = world_ref(world)?;
        if out.is_null() || len < STATE_DOUBLES {
            return Err(PhysicsError::InvalidArgument("flat state buffer too small"));
        }
        let state = world.body_state(BodyHandle(body_id))?;
        protocol::write_state(&state, slice::from_raw_parts_mut(out, len))?;
        Ok(STATUS_OK)
    })
}

/// Replace a body's state from 13 doubles at `data` (`len >= 13`).
///
/// # Safety
/// `data` must be null or valid for reads of `len` doubles.
#[no_mangle]
pub unsafe extern "C" fn dfx_body_set_state_flat(
    world: *const World,
    body_id: u64,
    data: *const f64,
    len: usize,
) -> i32 {
    guard(|| {
        let world = world_ref(world)?;
        if data.is_null() {
            return Err(PhysicsError::InvalidArgument("flat state buffer is null"));
        }
        let state = protocol::read_state(slice::from_raw_parts(data, len))?;
        world.set_body_state(BodyHandle(body_id), &state)?;
        Ok(STATUS_OK)
    })
}

/// Read `count` states in one call. On any unknown handle the call fails with
/// not-found and `out` is left untouched.
///
/// # Safety
/// `ids` must be valid for reads and `out` for writes of `count` elements.
/// Both may be null when `count` is 0.
#[no_mangle]
pub unsafe extern "C" fn dfx_world_get_body_states(
    world: *const World,
    ids: *const u64,
    count: usize,
    out: *mut DfxBodyStateRow,
) -> i32 {
    guard(|| {
        let world = world_ref(world)?;
        if count == 0 {
            return Ok(STATUS_OK);
        }
        if ids.is_null() || out.is_null() {
            return Err(PhysicsError::InvalidArgument("batch buffers are null"));
        }
        let handles: Vec<BodyHandle> = slice::from_raw_parts(ids, count)
            .iter()
            .map(|&id| BodyHandle(id))
            .collect();
        let rows = world.body_states(&handles)?;

        let out = slice::from_raw_parts_mut(out, count);
        for (dst, row) in out.iter_mut().zip(&rows) {
            *dst = DfxBodyStateRow {
                body_id: row.handle.0,
                state: DfxBodyState::from_state(&row.state),
            };
        }
        Ok(STATUS_OK)
    })
}

// ============================================================================
// Queries
// ============================================================================

/// Cast a ray. On a hit, fills `out_hit` and returns `STATUS_OK`. A miss
/// returns `STATUS_NOT_FOUND` and leaves `out_hit` untouched.
///
/// # Safety
/// `request` must be null or valid for reads; `out_hit` null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn dfx_world_raycast(
    world: *const World,
    request: *const DfxRaycastRequest,
    out_hit: *mut DfxRaycastHit,
) -> i32 {
    guard(|| {
        let world = world_ref(world)?;
        let req = read_arg(request, "raycast request is null")?;
        if out_hit.is_null() {
            return Err(PhysicsError::InvalidArgument("raycast output is null"));
        }
        let ray = Ray::new(req.origin.to_vec3(), req.direction.to_vec3(), req.max_distance);
        match world.raycast(&ray)? {
            Some(hit) => {
                let row = DfxRaycastHit {
                    body_id: hit.handle.0,
                    distance: hit.distance,
                    point: DfxVec3::from_vec3(hit.point),
                    normal: DfxVec3::from_vec3(hit.normal),
                };
                write_arg(out_hit, row, "raycast output is null")?;
                Ok(STATUS_OK)
            }
            None => Ok(STATUS_NOT_FOUND),
        }
    })
}

/// Drain up to `capacity` contacts from the last step into `out` and store
/// how many were written in `out_count`.
///
/// # Safety
/// `out` must be valid for writes of `capacity` rows (may be null when
/// `capacity` is 0); `out_count` must be valid for a write.
#[no_mangle]
pub unsafe extern "C" fn dfx_world_read_contacts(
    world: *const World,
    out: *mut DfxContactRow,
    capacity: usize,
    out_count: *mut usize,
) -> i32 {
    guard(|| {
        let world = world_ref(world)?;
        if out_count.is_null() || (out.is_null() && capacity > 0) {
            return Err(PhysicsError::InvalidArgument("contact buffers are null"));
        }
        let contacts = world.drain_contacts(capacity);
        if !contacts.is_empty() {
            let out = slice::from_raw_parts_mut(out, capacity);
            for (dst, c) in out.iter_mut().zip(&contacts) {
                *dst = DfxContactRow {
                    body_a: c.body_a.0,
                    body_b: c.body_b.0,
                    point: DfxVec3::from_vec3(c.point),
                    normal: DfxVec3::from_vec3(c.normal),
                    depth: c.depth,
                };
            }
        }
        write_arg(out_count, contacts.len(), "contact count is null")?;
        Ok(STATUS_OK)
    })
}

// 13 doubles, no padding.
const _: () = assert!(std::mem::size_of::<DfxBodyState>() == STATE_DOUBLES * 8);

#[cfg(test)]
mod tests {
    use super::*;
    use dfx_physics::bridge::protocol::{
        STATUS_INVALID_ARGUMENT, STATUS_VALIDATION_FAILURE,
    };

    fn reference_world() -> *mut World {
        let config = DfxWorldConfig::default();
        let world = unsafe { dfx_world_create_with_backend(&config, 0) };
        assert!(!world.is_null());
        world
    }

    fn sphere_desc(body_kind: i32, z: f64) -> DfxBodyDesc {
        DfxBodyDesc {
            shape_kind: 0,
            body_kind,
            mass_kg: 1.0,
            shape_size: DfxVec3 { x: 1.0, y: 0.0, z: 0.0 },
            initial_state: DfxBodyState {
                position: DfxVec3 { x: 0.0, y: 0.0, z },
                ..DfxBodyState::default()
            },
        }
    }

    #[test]
    fn version_and_mode() {
        assert_eq!(dfx_api_version(), 1);
        assert!(dfx_backend_mode() <= 1);
        dfx_init_logging();
        dfx_init_logging();
    }

    #[test]
    fn null_handling() {
        unsafe {
            assert!(dfx_world_create(ptr::null()).is_null());
            dfx_world_destroy(ptr::null_mut());
            assert_eq!(dfx_world_body_count(ptr::null()), 0);
            assert_eq!(dfx_world_step(ptr::null(), 0.1), STATUS_INVALID_ARGUMENT);
            assert_eq!(dfx_body_create(ptr::null(), &sphere_desc(2, 0.0)), 0);

            let world = reference_world();
            assert_eq!(dfx_body_create(world, ptr::null()), 0);
            let h = dfx_body_create(world, &sphere_desc(2, 0.0));
            assert_eq!(
                dfx_body_get_state(world, h, ptr::null_mut()),
                STATUS_INVALID_ARGUMENT
            );
            assert_eq!(
                dfx_world_raycast(world, ptr::null(), ptr::null_mut()),
                STATUS_INVALID_ARGUMENT
            );
            dfx_world_destroy(world);
        }
    }

    #[test]
    fn invalid_config_yields_null() {
        let config = DfxWorldConfig {
            fixed_step_seconds: 0.0,
            ..DfxWorldConfig::default()
        };
        unsafe {
            assert!(dfx_world_create(&config).is_null());
            assert!(dfx_world_create_with_backend(&DfxWorldConfig::default(), 9).is_null());
        }
    }

    #[test]
    fn body_lifecycle_and_status_codes() {
        unsafe {
            let world = reference_world();
            let h = dfx_body_create(world, &sphere_desc(2, 0.0));
            assert_eq!(h, 1);
            assert_eq!(dfx_world_body_count(world), 1);

            let mut bad = sphere_desc(2, 0.0);
            bad.mass_kg = -1.0;
            assert_eq!(dfx_body_create(world, &bad), 0);
            bad = sphere_desc(7, 0.0);
            assert_eq!(dfx_body_create(world, &bad), 0);

            assert_eq!(dfx_world_step(world, 0.0), STATUS_VALIDATION_FAILURE);
            assert_eq!(dfx_world_step(world, 0.1), STATUS_OK);

            assert_eq!(dfx_body_destroy(world, h), STATUS_OK);
            assert_eq!(dfx_body_destroy(world, h), STATUS_NOT_FOUND);
            assert_eq!(dfx_body_destroy(world, 0), STATUS_INVALID_ARGUMENT);
            dfx_world_destroy(world);
        }
    }

    #[test]
    fn flat_state_round_trip() {
        unsafe {
            let world = reference_world();
            let h = dfx_body_create(world, &sphere_desc(1, 0.0));

            let data: Vec<f64> = (1..=13).map(|i| i as f64).collect();
            assert_eq!(dfx_body_set_state_flat(world, h, data.as_ptr(), data.len()), STATUS_OK);

            let mut out = [0.0; 13];
            assert_eq!(dfx_body_get_state_flat(world, h, out.as_mut_ptr(), out.len()), STATUS_OK);
            assert_eq!(out.to_vec(), data);

            let mut state = DfxBodyState::default();
            assert_eq!(dfx_body_get_state(world, h, &mut state), STATUS_OK);
            assert_eq!(state.orientation, DfxQuat { x: 4.0, y: 5.0, z: 6.0, w: 7.0 });

            let mut short = [0.0; 12];
            assert_eq!(
                dfx_body_get_state_flat(world, h, short.as_mut_ptr(), short.len()),
                STATUS_INVALID_ARGUMENT
            );
            assert_eq!(
                dfx_body_set_state_flat(world, h, short.as_ptr(), short.len()),
                STATUS_INVALID_ARGUMENT
            );

            let mut nan = data.clone();
            nan[8] = f64::NAN;
            assert_eq!(
                dfx_body_set_state_flat(world, h, nan.as_ptr(), nan.len()),
                STATUS_VALIDATION_FAILURE
            );
            assert_eq!(dfx_body_get_state_flat(world, h, out.as_mut_ptr(), out.len()), STATUS_OK);
            assert_eq!(out.to_vec(), data);

            dfx_world_destroy(world);
        }
    }

    #[test]
    fn batch_read_fails_whole() {
        unsafe {
            let world = reference_world();
            let a = dfx_body_create(world, &sphere_desc(2, 0.0));
            let b = dfx_body_create(world, &sphere_desc(2, 3.0));
            assert_eq!(dfx_body_destroy(world, b), STATUS_OK);

            let ids = [a, b];
            let mut rows = [DfxBodyStateRow::default(); 2];
            assert_eq!(
                dfx_world_get_body_states(world, ids.as_ptr(), 2, rows.as_mut_ptr()),
                STATUS_NOT_FOUND
            );
            assert_eq!(rows, [DfxBodyStateRow::default(); 2]);

            assert_eq!(
                dfx_world_get_body_states(world, ids.as_ptr(), 1, rows.as_mut_ptr()),
                STATUS_OK
            );
            assert_eq!(rows[0].body_id, a);
            assert_eq!(
                dfx_world_get_body_states(world, ptr::null(), 0, ptr::null_mut()),
                STATUS_OK
            );
            dfx_world_destroy(world);
        }
    }

    #[test]
    fn raycast_hit_and_miss() {
        unsafe {
            let world = reference_world();
            let h = dfx_body_create(world, &sphere_desc(0, 5.0));

            let mut req = DfxRaycastRequest {
                origin: DfxVec3::default(),
                direction: DfxVec3 { x: 0.0, y: 0.0, z: 1.0 },
                max_distance: 10.0,
            };
            let mut hit = DfxRaycastHit::default();
            assert_eq!(dfx_world_raycast(world, &req, &mut hit), STATUS_OK);
            assert_eq!(hit.body_id, h);
            assert!((hit.distance - 4.0).abs() < 1e-12);
            assert!((hit.normal.z + 1.0).abs() < 1e-12);

            req.direction.z = -1.0;
            let before = hit;
            assert_eq!(dfx_world_raycast(world, &req, &mut hit), STATUS_NOT_FOUND);
            assert_eq!(hit, before, "a miss must not write the hit");

            let mut fresh = DfxRaycastHit::default();
            req.max_distance = 3.5;
            req.direction.z = 1.0;
            assert_eq!(dfx_world_raycast(world, &req, &mut fresh), STATUS_NOT_FOUND);
            assert_eq!(fresh, DfxRaycastHit::default());

            req.direction = DfxVec3::default();
            assert_eq!(dfx_world_raycast(world, &req, &mut hit), STATUS_VALIDATION_FAILURE);
            dfx_world_destroy(world);
        }
    }

    #[test]
    fn reference_contacts_are_empty() {
        unsafe {
            let world = reference_world();
            for _ in 0..4 {
                dfx_body_create(world, &sphere_desc(2, 0.0));
            }
            assert_eq!(dfx_world_step(world, 1.0 / 60.0), STATUS_OK);

            let mut rows = [DfxContactRow::default(); 8];
            let mut count = usize::MAX;
            assert_eq!(
                dfx_world_read_contacts(world, rows.as_mut_ptr(), rows.len(), &mut count),
                STATUS_OK
            );
            assert_eq!(count, 0);
            assert_eq!(
                dfx_world_read_contacts(world, ptr::null_mut(), 0, &mut count),
                STATUS_OK
            );
            assert_eq!(
                dfx_world_read_contacts(world, rows.as_mut_ptr(), rows.len(), ptr::null_mut()),
                STATUS_INVALID_ARGUMENT
            );
            dfx_world_destroy(world);
        }
    }

    #[cfg(feature = "rapier")]
    #[test]
    fn rapier_contacts_cross_the_boundary() {
        let mut config = DfxWorldConfig::default();
        config.gravity = DfxVec3::default();
        unsafe {
            let world = dfx_world_create_with_backend(&config, 1);
            assert!(!world.is_null());
            let a = dfx_body_create(world, &sphere_desc(2, 0.0));
            let b = dfx_body_create(world, &sphere_desc(2, 1.5));
            assert_eq!(dfx_world_step(world, 1.0 / 60.0), STATUS_OK);

            let mut rows = [DfxContactRow::default(); 8];
            let mut count = 0usize;
            assert_eq!(
                dfx_world_read_contacts(world, rows.as_mut_ptr(), rows.len(), &mut count),
                STATUS_OK
            );
            assert!(count > 0, "overlapping spheres should touch");
            let ids = [rows[0].body_a, rows[0].body_b];
            assert!(ids.contains(&a) && ids.contains(&b));
            dfx_world_destroy(world);
        }
    }
}

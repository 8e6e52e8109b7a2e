use rapier3d_f64::na::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};
use rapier3d_f64::prelude::{
    CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet, DefaultBroadPhase, ImpulseJointSet,
    IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline,
    QueryFilter, QueryPipeline, Ray as NativeRay, RigidBodyBuilder, RigidBodyHandle,
    RigidBodySet, RigidBodyType,
};

use crate::api::config::WorldConfig;
use crate::api::types::{
    BodyDesc, BodyHandle, BodyKind, BodyState, ContactEvent, Ray, RaycastHit, ShapeKind,
};
use crate::core::contacts::ContactBuffer;
use crate::core::registry::BodyRegistry;
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Quat, Vec3};

use super::{BackendKind, Capabilities, PhysicsBackend, StepParams};

const CAPABILITIES: Capabilities = Capabilities {
    rigid_bodies: true,
    constraints: false,
    exact_queries: true,
    contact_reports: true,
    kinematic_bodies: true,
};

// ---------------------------------------------------------------------------
// Conversion helpers (glam to nalgebra and back)
// ---------------------------------------------------------------------------

fn vec3_to_na(v: Vec3) -> Vector3<f64> {
    Vector3::new(v.x, v.y, v.z)
}

fn na_to_vec3(v: &Vector3<f64>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// Rapier needs unit rotations; degenerate input falls back to identity.
fn quat_to_na(q: Quat) -> UnitQuaternion<f64> {
    if q.length_squared() <= f64::EPSILON {
        return UnitQuaternion::identity();
    }
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

fn na_to_quat(q: &UnitQuaternion<f64>) -> Quat {
    let c = q.quaternion().coords;
    Quat::from_xyzw(c.x, c.y, c.z, c.w)
}

fn state_to_iso(state: &BodyState) -> Isometry3<f64> {
    let p = state.position;
    Isometry3::from_parts(Translation3::new(p.x, p.y, p.z), quat_to_na(state.orientation))
}

fn body_type(kind: BodyKind) -> RigidBodyType {
    match kind {
        BodyKind::Static => RigidBodyType::Fixed,
        // Velocity-based so caller-set velocity carries the body, matching the
        // reference integrator.
        BodyKind::Kinematic => RigidBodyType::KinematicVelocityBased,
        BodyKind::Dynamic => RigidBodyType::Dynamic,
    }
}

fn collider_builder(desc: &BodyDesc) -> ColliderBuilder {
    let size = desc.shape_size;
    match desc.shape_kind {
        ShapeKind::Sphere => ColliderBuilder::ball(size.x.max(0.0)),
        ShapeKind::Box => ColliderBuilder::cuboid(
            (size.x * 0.5).max(0.0),
            (size.y * 0.5).max(0.0),
            (size.z * 0.5).max(0.0),
        ),
        ShapeKind::Capsule => ColliderBuilder::capsule_y(size.y.max(0.0), size.x.max(0.0)),
    }
}

// ---------------------------------------------------------------------------
// RapierBackend
// ---------------------------------------------------------------------------

/// Native handles behind one body.
#[derive(Debug, Clone, Copy)]
struct NativeBody {
    desc: BodyDesc,
    body: RigidBodyHandle,
    collider: ColliderHandle,
}

/// Pose and velocities of one body, taken before a step so a failed step can
/// be rolled back.
#[derive(Debug, Clone, Copy)]
struct BodySnapshot {
    native: NativeBody,
    pose: Isometry3<f64>,
    linvel: Vector3<f64>,
    angvel: Vector3<f64>,
}

/// Full solver backend. Wraps all rapier state for one world.
pub struct RapierBackend {
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    registry: BodyRegistry<NativeBody>,
}

impl RapierBackend {
    pub fn new(config: &WorldConfig) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.fixed_step_seconds;
        Self {
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            registry: BodyRegistry::new(),
        }
    }

    fn remove_native(&mut self, native: &NativeBody) {
        self.bodies.remove(
            native.body,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Move a body's collider to the body's current pose so queries issued
    /// before the next step see it.
    fn sync_collider(&mut self, native: &NativeBody) {
        if let Some(rb) = self.bodies.get(native.body) {
            let pose = *rb.position();
            if let Some(collider) = self.colliders.get_mut(native.collider) {
                collider.set_position(pose);
            }
        }
    }

    fn collider_to_handle(&self, collider_handle: ColliderHandle) -> Option<BodyHandle> {
        let collider = self.colliders.get(collider_handle)?;
        let body_handle = collider.parent()?;
        let body = self.bodies.get(body_handle)?;
        Some(BodyHandle(body.user_data as u64))
    }

    fn snapshot(&self) -> Vec<BodySnapshot> {
        self.registry
            .iter()
            .filter_map(|(_, native)| {
                let rb = self.bodies.get(native.body)?;
                Some(BodySnapshot {
                    native: *native,
                    pose: *rb.position(),
                    linvel: *rb.linvel(),
                    angvel: *rb.angvel(),
                })
            })
            .collect()
    }

    fn restore(&mut self, snapshot: &[BodySnapshot]) {
        for saved in snapshot {
            let wake = saved.native.desc.body_kind != BodyKind::Static;
            if let Some(rb) = self.bodies.get_mut(saved.native.body) {
                rb.set_position(saved.pose, wake);
                rb.set_linvel(saved.linvel, wake);
                rb.set_angvel(saved.angvel, wake);
                rb.reset_forces(false);
                rb.reset_torques(false);
            }
            self.sync_collider(&saved.native);
        }
    }

    fn first_non_finite_body(&self) -> Option<BodyHandle> {
        self.bodies.iter().find_map(|(_, rb)| {
            let finite = rb.translation().iter().all(|c| c.is_finite())
                && rb.linvel().iter().all(|c| c.is_finite())
                && rb.angvel().iter().all(|c| c.is_finite());
            (!finite).then_some(BodyHandle(rb.user_data as u64))
        })
    }

    fn collect_contacts(&self, contacts: &mut ContactBuffer) {
        for pair in self.narrow_phase.contact_pairs() {
            if !pair.has_any_active_contact {
                continue;
            }
            let (Some(body_a), Some(body_b)) = (
                self.collider_to_handle(pair.collider1),
                self.collider_to_handle(pair.collider2),
            ) else {
                continue;
            };
            let Some(collider_a) = self.colliders.get(pair.collider1) else {
                continue;
            };

            for manifold in &pair.manifolds {
                let Some(deepest) = manifold.find_deepest_contact() else {
                    continue;
                };
                let point: Point3<f64> = collider_a.position() * deepest.local_p1;
                contacts.push(ContactEvent {
                    body_a,
                    body_b,
                    point: Vec3::new(point.x, point.y, point.z),
                    normal: na_to_vec3(&manifold.data.normal),
                    depth: (-deepest.dist).max(0.0),
                });
            }
        }
    }
}

impl PhysicsBackend for RapierBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Rapier
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    /// Create a rigid body + collider. The world handle is stored in the
    /// body's `user_data` for contact and raycast lookups.
    fn create_body(&mut self, desc: &BodyDesc, config: &WorldConfig) -> PhysicsResult<BodyHandle> {
        let handle = self.registry.mint();
        let state = &desc.initial_state;

        let rb = RigidBodyBuilder::new(body_type(desc.body_kind))
            .position(state_to_iso(state))
            .linvel(vec3_to_na(state.linear_velocity))
            .angvel(vec3_to_na(state.angular_velocity))
            .ccd_enabled(desc.body_kind == BodyKind::Dynamic)
            .user_data(handle.0 as u128)
            .build();
        let body = self.bodies.insert(rb);

        let mut collider = collider_builder(desc)
            .friction(config.tuning.friction)
            .restitution(config.tuning.restitution);
        // Zero mass lets rapier derive mass from the shape at unit density
        collider = if desc.mass_kg > 0.0 {
            collider.mass(desc.mass_kg)
        } else {
            collider.density(1.0)
        };
        let collider =
            self.colliders
                .insert_with_parent(collider.build(), body, &mut self.bodies);

        let native = NativeBody {
            desc: *desc,
            body,
            collider,
        };
        self.sync_collider(&native);
        self.registry.insert_at(handle, native);
        Ok(handle)
    }

    fn destroy_body(&mut self, handle: BodyHandle) -> bool {
        match self.registry.remove(handle) {
            Some(native) => {
                self.remove_native(&native);
                true
            }
            None => false,
        }
    }

    fn body_state(&self, handle: BodyHandle) -> Option<BodyState> {
        let native = self.registry.get(handle)?;
        let rb = self.bodies.get(native.body)?;
        Some(BodyState {
            position: na_to_vec3(rb.translation()),
            orientation: na_to_quat(rb.rotation()),
            linear_velocity: na_to_vec3(rb.linvel()),
            angular_velocity: na_to_vec3(rb.angvel()),
        })
    }

    fn body_desc(&self, handle: BodyHandle) -> Option<BodyDesc> {
        self.registry.get(handle).map(|n| n.desc)
    }

    fn set_body_state(&mut self, handle: BodyHandle, state: &BodyState) -> bool {
        let Some(native) = self.registry.get(handle).copied() else {
            return false;
        };
        let wake = native.desc.body_kind != BodyKind::Static;
        let Some(rb) = self.bodies.get_mut(native.body) else {
            return false;
        };
        rb.set_position(state_to_iso(state), wake);
        rb.set_linvel(vec3_to_na(state.linear_velocity), wake);
        rb.set_angvel(vec3_to_na(state.angular_velocity), wake);
        self.sync_collider(&native);
        true
    }

    fn step(&mut self, params: StepParams<'_>, contacts: &mut ContactBuffer) -> PhysicsResult<()> {
        let substeps = params.config.tuning.substeps();
        let gravity = vec3_to_na(params.gravity);
        self.integration_parameters.dt = params.dt / substeps as f64;
        let snapshot = self.snapshot();

        for _ in 0..substeps {
            self.physics_pipeline.step(
                &gravity,
                &self.integration_parameters,
                &mut self.island_manager,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                Some(&mut self.query_pipeline),
                &(),
                &(),
            );
        }

        if let Some(handle) = self.first_non_finite_body() {
            self.restore(&snapshot);
            return Err(PhysicsError::InternalEngine(format!(
                "solver produced a non-finite state for body {}",
                handle.0
            )));
        }

        contacts.begin_step();
        self.collect_contacts(contacts);
        Ok(())
    }

    fn raycast(&mut self, ray: &Ray) -> Option<RaycastHit> {
        self.query_pipeline.update(&self.colliders);

        let native_ray = NativeRay::new(
            Point3::new(ray.origin.x, ray.origin.y, ray.origin.z),
            vec3_to_na(ray.direction),
        );
        let (collider, intersection) = self.query_pipeline.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &native_ray,
            ray.max_distance,
            true,
            QueryFilter::default(),
        )?;

        let handle = self.collider_to_handle(collider)?;
        let distance = intersection.time_of_impact;
        Some(RaycastHit {
            handle,
            distance,
            point: ray.origin + ray.direction * distance,
            normal: na_to_vec3(&intersection.normal),
        })
    }

    fn handles(&self) -> Vec<BodyHandle> {
        self.registry.handles()
    }

    fn body_count(&self) -> usize {
        self.registry.len()
    }

    fn clear(&mut self) {
        let natives: Vec<NativeBody> = self.registry.drain().map(|(_, n)| n).collect();
        for native in &natives {
            self.remove_native(native);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn step(backend: &mut RapierBackend, config: &WorldConfig, dt: f64) -> Vec<ContactEvent> {
        let mut contacts = ContactBuffer::with_capacity(config.max_contacts);
        backend
            .step(
                StepParams {
                    dt,
                    gravity: config.gravity,
                    config,
                },
                &mut contacts,
            )
            .unwrap();
        contacts.drain(usize::MAX)
    }

    #[test]
    fn create_and_remove_body() {
        let config = WorldConfig::default();
        let mut backend = RapierBackend::new(&config);
        let h = backend.create_body(&BodyDesc::sphere(1.0), &config).unwrap();
        assert_eq!(backend.body_count(), 1);
        assert_eq!(backend.bodies.len(), 1);
        assert!(backend.destroy_body(h));
        assert_eq!(backend.body_count(), 0);
        assert_eq!(backend.bodies.len(), 0);
        assert!(!backend.destroy_body(h));
    }

    #[test]
    fn gravity_affects_dynamic_body() {
        let config = WorldConfig::default();
        let mut backend = RapierBackend::new(&config);
        let h = backend
            .create_body(&BodyDesc::sphere(0.5).with_position(Vec3::new(0.0, 10.0, 0.0)), &config)
            .unwrap();

        for _ in 0..30 {
            step(&mut backend, &config, 1.0 / 60.0);
        }

        let s = backend.body_state(h).unwrap();
        assert!(s.position.y < 10.0, "Body should fall: y={}", s.position.y);
        assert!(s.linear_velocity.y < 0.0);
    }

    #[test]
    fn fixed_body_does_not_move() {
        let config = WorldConfig::default();
        let mut backend = RapierBackend::new(&config);
        let h = backend
            .create_body(
                &BodyDesc::cuboid(Vec3::new(20.0, 1.0, 20.0))
                    .with_kind(BodyKind::Static)
                    .with_position(Vec3::new(0.0, -5.0, 0.0)),
                &config,
            )
            .unwrap();

        for _ in 0..10 {
            step(&mut backend, &config, 1.0 / 60.0);
        }

        let s = backend.body_state(h).unwrap();
        assert_eq!(s.position, Vec3::new(0.0, -5.0, 0.0));
    }

    #[test]
    fn raycast_hits_exact_surface() {
        let config = WorldConfig::default();
        let mut backend = RapierBackend::new(&config);
        let h = backend
            .create_body(
                &BodyDesc::cuboid(Vec3::new(2.0, 2.0, 2.0))
                    .with_kind(BodyKind::Static)
                    .with_position(Vec3::new(0.0, 0.0, 5.0)),
                &config,
            )
            .unwrap();

        let hit = backend
            .raycast(&Ray::new(Vec3::ZERO, Vec3::Z, 10.0))
            .expect("ray should hit the box face");
        assert_eq!(hit.handle, h);
        assert!((hit.distance - 4.0).abs() < 1e-6, "distance={}", hit.distance);
        assert!((hit.normal - Vec3::NEG_Z).length() < 1e-6, "normal={:?}", hit.normal);

        assert!(backend.raycast(&Ray::new(Vec3::ZERO, Vec3::NEG_Z, 10.0)).is_none());
    }

    #[test]
    fn raycast_sees_state_written_before_step() {
        let config = WorldConfig::default();
        let mut backend = RapierBackend::new(&config);
        let h = backend
            .create_body(&BodyDesc::sphere(1.0).with_kind(BodyKind::Kinematic), &config)
            .unwrap();

        assert!(backend.set_body_state(h, &BodyState::at(Vec3::new(0.0, 0.0, 5.0))));
        let hit = backend.raycast(&Ray::new(Vec3::ZERO, Vec3::Z, 10.0)).unwrap();
        assert!((hit.distance - 4.0).abs() < 1e-6, "distance={}", hit.distance);
    }

    #[test]
    fn overlapping_bodies_report_contacts() {
        let config = WorldConfig::default().with_gravity(Vec3::ZERO);
        let mut backend = RapierBackend::new(&config);
        let a = backend.create_body(&BodyDesc::sphere(1.0), &config).unwrap();
        let b = backend
            .create_body(&BodyDesc::sphere(1.0).with_position(Vec3::new(1.5, 0.0, 0.0)), &config)
            .unwrap();

        let contacts = step(&mut backend, &config, 1.0 / 60.0);
        assert!(!contacts.is_empty(), "Should report the overlap");

        let c = contacts[0];
        let ids = [c.body_a, c.body_b];
        assert!(ids.contains(&a));
        assert!(ids.contains(&b));
        assert!(c.depth >= 0.0);
        assert!((c.normal.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn solver_failure_rolls_back_every_body() {
        let config = WorldConfig::default();
        let mut backend = RapierBackend::new(&config);
        let runaway = backend.create_body(&BodyDesc::sphere(0.5), &config).unwrap();
        let bystander = backend
            .create_body(&BodyDesc::sphere(0.5).with_position(Vec3::new(10.0, 10.0, 0.0)), &config)
            .unwrap();

        let extreme = BodyState::at(Vec3::new(1.7e308, 0.0, 0.0))
            .with_linear_velocity(Vec3::new(1e308, 0.0, 0.0));
        assert!(backend.set_body_state(runaway, &extreme));
        let before_runaway = backend.body_state(runaway).unwrap();
        let before_bystander = backend.body_state(bystander).unwrap();

        let mut contacts = ContactBuffer::with_capacity(8);
        let result = backend.step(
            StepParams {
                dt: 1.0,
                gravity: config.gravity,
                config: &config,
            },
            &mut contacts,
        );
        assert!(matches!(result, Err(PhysicsError::InternalEngine(_))), "{:?}", result);
        assert_eq!(backend.body_state(runaway).unwrap(), before_runaway);
        assert_eq!(backend.body_state(bystander).unwrap(), before_bystander);

        // Once the caller repairs the offending body the world steps again
        assert!(backend.set_body_state(runaway, &BodyState::default()));
        step(&mut backend, &config, 1.0 / 60.0);
        let after = backend.body_state(bystander).unwrap();
        assert!(after.position.y < 10.0, "y={}", after.position.y);
    }

    #[test]
    fn explicit_mass_is_applied() {
        let config = WorldConfig::default();
        let mut backend = RapierBackend::new(&config);
        let h = backend
            .create_body(&BodyDesc::sphere(1.0).with_mass(42.0), &config)
            .unwrap();
        step(&mut backend, &config, 1.0 / 60.0);
        let native = *backend.registry.get(h).unwrap();
        let mass = backend.bodies.get(native.body).unwrap().mass();
        assert!((mass - 42.0).abs() < 1e-6, "mass={}", mass);
    }

    #[test]
    fn degenerate_orientation_maps_to_identity() {
        assert_eq!(quat_to_na(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)), UnitQuaternion::identity());
        let q = na_to_quat(&quat_to_na(Quat::from_xyzw(0.0, 0.0, 0.0, 2.0)));
        assert!((q.w - 1.0).abs() < 1e-12);
    }
}

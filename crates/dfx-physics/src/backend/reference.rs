//! Analytic reference backend.
//!
//! Semi-implicit Euler on linear motion only, bounding-sphere raycasts, no
//! collision response and therefore no contacts. Orientation and angular
//! velocity are stored and returned but never advanced.

use crate::api::config::WorldConfig;
use crate::api::types::{BodyDesc, BodyHandle, BodyKind, BodyState, Ray, RaycastHit};
use crate::core::contacts::ContactBuffer;
use crate::core::registry::BodyRegistry;
use crate::error::PhysicsResult;
use crate::math::unit_toward;

use super::{BackendKind, Capabilities, PhysicsBackend, StepParams};

const CAPABILITIES: Capabilities = Capabilities {
    rigid_bodies: true,
    constraints: false,
    exact_queries: false,
    contact_reports: false,
    kinematic_bodies: true,
};

/// A body as the reference backend stores it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyRecord {
    pub desc: BodyDesc,
    pub state: BodyState,
}

impl BodyRecord {
    pub fn new(desc: BodyDesc) -> Self {
        Self {
            desc,
            state: desc.initial_state,
        }
    }

    /// Advance this body by one step.
    fn integrate(&mut self, params: &StepParams<'_>) {
        let dt = params.dt;
        match self.desc.body_kind {
            BodyKind::Static => {}
            BodyKind::Dynamic => {
                self.state.linear_velocity += params.gravity * dt;
                self.state.position += self.state.linear_velocity * dt;
            }
            BodyKind::Kinematic => {
                self.state.position += self.state.linear_velocity * dt;
            }
        }
    }
}

pub struct ReferenceBackend {
    bodies: BodyRegistry<BodyRecord>,
}

impl ReferenceBackend {
    pub fn new() -> Self {
        Self {
            bodies: BodyRegistry::new(),
        }
    }
}

impl Default for ReferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsBackend for ReferenceBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Reference
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    fn create_body(&mut self, desc: &BodyDesc, _config: &WorldConfig) -> PhysicsResult<BodyHandle> {
        Ok(self.bodies.insert(BodyRecord::new(*desc)))
    }

    fn destroy_body(&mut self, handle: BodyHandle) -> bool {
        self.bodies.remove(handle).is_some()
    }

    fn body_state(&self, handle: BodyHandle) -> Option<BodyState> {
        self.bodies.get(handle).map(|r| r.state)
    }

    fn body_desc(&self, handle: BodyHandle) -> Option<BodyDesc> {
        self.bodies.get(handle).map(|r| r.desc)
    }

    fn set_body_state(&mut self, handle: BodyHandle, state: &BodyState) -> bool {
        match self.bodies.get_mut(handle) {
            Some(record) => {
                record.state = *state;
                true
            }
            None => false,
        }
    }

    fn step(&mut self, params: StepParams<'_>, contacts: &mut ContactBuffer) -> PhysicsResult<()> {
        for (_, record) in self.bodies.iter_mut() {
            record.integrate(&params);
        }
        contacts.begin_step();
        Ok(())
    }

    fn raycast(&mut self, ray: &Ray) -> Option<RaycastHit> {
        let mut best: Option<RaycastHit> = None;
        let mut best_distance = ray.max_distance;

        for (handle, record) in self.bodies.iter() {
            let radius = record.desc.bounding_radius();
            let to_center = record.state.position - ray.origin;
            let along = to_center.dot(ray.direction);
            if along < 0.0 {
                continue;
            }
            let perp_sq = to_center.length_squared() - along * along;
            if perp_sq > radius * radius {
                continue;
            }

            let distance = to_center.length() - radius;
            // `<=` on ties would let later bodies win; keep the earliest handle.
            let improves = match best {
                Some(_) => distance < best_distance,
                None => distance <= best_distance,
            };
            if distance >= 0.0 && improves {
                best_distance = distance;
                best = Some(RaycastHit {
                    handle,
                    distance,
                    point: ray.origin + ray.direction * distance,
                    normal: unit_toward(record.state.position, ray.origin),
                });
            }
        }
        best
    }

    fn handles(&self) -> Vec<BodyHandle> {
        self.bodies.handles()
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn clear(&mut self) {
        self.bodies.drain().for_each(drop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Quat, Vec3};

    fn params(config: &WorldConfig, dt: f64) -> StepParams<'_> {
        StepParams {
            dt,
            gravity: config.gravity,
            config,
        }
    }

    #[test]
    fn dynamic_uses_updated_velocity() {
        let config = WorldConfig::default().with_gravity(Vec3::new(0.0, -10.0, 0.0));
        let mut backend = ReferenceBackend::new();
        let h = backend
            .create_body(
                &BodyDesc::sphere(1.0)
                    .with_position(Vec3::new(0.0, 100.0, 0.0))
                    .with_velocity(Vec3::new(2.0, 0.0, 0.0)),
                &config,
            )
            .unwrap();

        let mut contacts = ContactBuffer::with_capacity(4);
        backend.step(params(&config, 0.5), &mut contacts).unwrap();

        let s = backend.body_state(h).unwrap();
        assert_eq!(s.linear_velocity, Vec3::new(2.0, -5.0, 0.0));
        assert_eq!(s.position, Vec3::new(1.0, 97.5, 0.0));
    }

    #[test]
    fn kinematic_ignores_gravity() {
        let config = WorldConfig::default();
        let mut backend = ReferenceBackend::new();
        let h = backend
            .create_body(
                &BodyDesc::sphere(1.0)
                    .with_kind(BodyKind::Kinematic)
                    .with_velocity(Vec3::new(0.0, 0.0, 4.0)),
                &config,
            )
            .unwrap();

        let mut contacts = ContactBuffer::with_capacity(4);
        backend.step(params(&config, 0.25), &mut contacts).unwrap();

        let s = backend.body_state(h).unwrap();
        assert_eq!(s.linear_velocity, Vec3::new(0.0, 0.0, 4.0));
        assert_eq!(s.position, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn angular_state_is_not_integrated() {
        let config = WorldConfig::default();
        let mut backend = ReferenceBackend::new();
        let spin = Vec3::new(0.0, 3.0, 0.0);
        let tilt = Quat::from_xyzw(0.0, 0.0, 0.6, 0.8);
        let h = backend
            .create_body(
                &BodyDesc::cuboid(Vec3::ONE).with_state(
                    BodyState::default()
                        .with_orientation(tilt)
                        .with_angular_velocity(spin),
                ),
                &config,
            )
            .unwrap();

        let mut contacts = ContactBuffer::with_capacity(4);
        for _ in 0..10 {
            backend.step(params(&config, 0.1), &mut contacts).unwrap();
        }

        let s = backend.body_state(h).unwrap();
        assert_eq!(s.orientation, tilt);
        assert_eq!(s.angular_velocity, spin);
    }

    #[test]
    fn raycast_tie_keeps_lowest_handle() {
        let config = WorldConfig::default();
        let mut backend = ReferenceBackend::new();
        let first = backend
            .create_body(&BodyDesc::sphere(1.0).with_position(Vec3::new(0.0, 0.0, 5.0)), &config)
            .unwrap();
        let _second = backend
            .create_body(&BodyDesc::sphere(1.0).with_position(Vec3::new(0.0, 0.0, 5.0)), &config)
            .unwrap();

        let hit = backend
            .raycast(&Ray::new(Vec3::ZERO, Vec3::Z, 10.0))
            .expect("ray should hit");
        assert_eq!(hit.handle, first);
    }

    #[test]
    fn raycast_prefers_nearer_body() {
        let config = WorldConfig::default();
        let mut backend = ReferenceBackend::new();
        let _far = backend
            .create_body(&BodyDesc::sphere(1.0).with_position(Vec3::new(0.0, 0.0, 8.0)), &config)
            .unwrap();
        let near = backend
            .create_body(&BodyDesc::sphere(1.0).with_position(Vec3::new(0.0, 0.0, 3.0)), &config)
            .unwrap();

        let hit = backend.raycast(&Ray::new(Vec3::ZERO, Vec3::Z, 10.0)).unwrap();
        assert_eq!(hit.handle, near);
        assert!((hit.distance - 2.0).abs() < 1e-12);
        assert_eq!(hit.point, Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn raycast_misses_off_axis_body() {
        let config = WorldConfig::default();
        let mut backend = ReferenceBackend::new();
        backend
            .create_body(&BodyDesc::sphere(1.0).with_position(Vec3::new(5.0, 0.0, 5.0)), &config)
            .unwrap();
        assert!(backend.raycast(&Ray::new(Vec3::ZERO, Vec3::Z, 20.0)).is_none());
    }

    #[test]
    fn raycast_respects_max_distance() {
        let config = WorldConfig::default();
        let mut backend = ReferenceBackend::new();
        backend
            .create_body(&BodyDesc::sphere(1.0).with_position(Vec3::new(0.0, 0.0, 5.0)), &config)
            .unwrap();
        assert!(backend.raycast(&Ray::new(Vec3::ZERO, Vec3::Z, 3.5)).is_none());
        assert!(backend.raycast(&Ray::new(Vec3::ZERO, Vec3::Z, 4.0)).is_some());
    }

    #[test]
    fn raycast_from_inside_bounds_is_not_a_hit() {
        let config = WorldConfig::default();
        let mut backend = ReferenceBackend::new();
        backend
            .create_body(&BodyDesc::sphere(2.0).with_position(Vec3::new(0.0, 0.0, 1.0)), &config)
            .unwrap();
        assert!(backend.raycast(&Ray::new(Vec3::ZERO, Vec3::Z, 10.0)).is_none());
    }

    #[test]
    fn capsule_and_box_bounds() {
        let config = WorldConfig::default();
        let mut backend = ReferenceBackend::new();
        let capsule = backend
            .create_body(
                &BodyDesc::capsule(0.5, 1.0).with_position(Vec3::new(0.0, 0.0, 10.0)),
                &config,
            )
            .unwrap();
        let hit = backend.raycast(&Ray::new(Vec3::ZERO, Vec3::Z, 20.0)).unwrap();
        assert_eq!(hit.handle, capsule);
        assert!((hit.distance - 8.5).abs() < 1e-12);

        backend.destroy_body(capsule);
        let cube = backend
            .create_body(
                &BodyDesc::cuboid(Vec3::new(2.0, 2.0, 2.0)).with_position(Vec3::new(0.0, 0.0, 10.0)),
                &config,
            )
            .unwrap();
        let hit = backend.raycast(&Ray::new(Vec3::ZERO, Vec3::Z, 20.0)).unwrap();
        assert_eq!(hit.handle, cube);
        assert!((hit.distance - (10.0 - 3f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn clear_removes_everything() {
        let config = WorldConfig::default();
        let mut backend = ReferenceBackend::new();
        backend.create_body(&BodyDesc::sphere(1.0), &config).unwrap();
        backend.create_body(&BodyDesc::sphere(1.0), &config).unwrap();
        backend.clear();
        assert_eq!(backend.body_count(), 0);
        assert!(backend.handles().is_empty());
    }
}

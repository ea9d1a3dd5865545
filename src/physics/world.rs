//! `rapier3d` physics world
//!
//! Wraps the rapier pipeline behind [`PhysicsWorld`]. Game code speaks glam and
//! [`BodyHandle`]; conversion to nalgebra and rapier handles stays in here.

use std::collections::HashMap;
use std::fmt;

use glam::{Quat, Vec3};
use rapier3d::na;
use rapier3d::prelude as rp;

use super::{BodyDesc, BodyHandle, BodyKind, Collider, PhysicsWorld, Ray, RayHit};

/// Earth gravity along -Y
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

fn to_vector(v: Vec3) -> rp::Vector<rp::Real> {
    rp::Vector::new(v.x, v.y, v.z)
}

fn from_vector(v: &rp::Vector<rp::Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_rotation(q: Quat) -> rp::Rotation<rp::Real> {
    rp::Rotation::from_quaternion(na::Quaternion::new(q.w, q.x, q.y, q.z))
}

fn from_rotation(q: &rp::Rotation<rp::Real>) -> Quat {
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

fn to_isometry(translation: Vec3, rotation: Quat) -> rp::Isometry<rp::Real> {
    rp::Isometry::from_parts(
        na::Translation3::new(translation.x, translation.y, translation.z),
        to_rotation(rotation),
    )
}

/// [`PhysicsWorld`] over a rapier rigid-body pipeline
pub struct RapierWorld {
    pub gravity: Vec3,
    integration: rp::IntegrationParameters,
    pipeline: rp::PhysicsPipeline,
    islands: rp::IslandManager,
    broad_phase: rp::DefaultBroadPhase,
    narrow_phase: rp::NarrowPhase,
    bodies: rp::RigidBodySet,
    colliders: rp::ColliderSet,
    impulse_joints: rp::ImpulseJointSet,
    multibody_joints: rp::MultibodyJointSet,
    ccd: rp::CCDSolver,
    queries: rp::QueryPipeline,
    handles: HashMap<BodyHandle, rp::RigidBodyHandle>,
    next_id: u32,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RapierWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RapierWorld")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .finish_non_exhaustive()
    }
}

impl RapierWorld {
    pub fn new() -> Self {
        Self::with_gravity(DEFAULT_GRAVITY)
    }

    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            gravity,
            integration: rp::IntegrationParameters::default(),
            pipeline: rp::PhysicsPipeline::new(),
            islands: rp::IslandManager::new(),
            broad_phase: rp::DefaultBroadPhase::new(),
            narrow_phase: rp::NarrowPhase::new(),
            bodies: rp::RigidBodySet::new(),
            colliders: rp::ColliderSet::new(),
            impulse_joints: rp::ImpulseJointSet::new(),
            multibody_joints: rp::MultibodyJointSet::new(),
            ccd: rp::CCDSolver::new(),
            queries: rp::QueryPipeline::new(),
            handles: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn kind(&self, body: BodyHandle) -> Option<BodyKind> {
        let rb = self.get(body)?;
        Some(if rb.is_dynamic() {
            BodyKind::Dynamic
        } else if rb.is_kinematic() {
            BodyKind::Kinematic
        } else {
            BodyKind::Fixed
        })
    }

    fn get(&self, body: BodyHandle) -> Option<&rp::RigidBody> {
        let handle = self.handles.get(&body)?;
        self.bodies.get(*handle)
    }

    fn get_mut(&mut self, body: BodyHandle) -> Option<&mut rp::RigidBody> {
        let handle = self.handles.get(&body)?;
        self.bodies.get_mut(*handle)
    }

    fn dynamic_mut(&mut self, body: BodyHandle) -> Option<&mut rp::RigidBody> {
        self.get_mut(body).filter(|rb| rb.is_dynamic())
    }

    /// Body a collider is attached to
    fn owner(&self, collider: rp::ColliderHandle) -> Option<BodyHandle> {
        let parent = self.colliders.get(collider)?.parent()?;
        let rb = self.bodies.get(parent)?;
        Some(BodyHandle(rb.user_data as u32))
    }
}

impl PhysicsWorld for RapierWorld {
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id += 1;

        let builder = match desc.kind {
            BodyKind::Fixed => rp::RigidBodyBuilder::fixed(),
            BodyKind::Kinematic => rp::RigidBodyBuilder::kinematic_position_based(),
            BodyKind::Dynamic => rp::RigidBodyBuilder::dynamic(),
        };
        let rb = builder
            .position(to_isometry(desc.translation, desc.rotation))
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .can_sleep(desc.can_sleep)
            .user_data(handle.0 as u128)
            .build();

        let collider = match desc.collider {
            Collider::Ball { radius } => rp::ColliderBuilder::ball(radius),
            Collider::Cuboid { half_extents } => {
                rp::ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
        }
        .restitution(desc.restitution)
        .friction(desc.friction)
        .build();

        let rb_handle = self.bodies.insert(rb);
        self.colliders.insert_with_parent(collider, rb_handle, &mut self.bodies);
        self.handles.insert(handle, rb_handle);
        self.queries.update(&self.colliders);
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        let Some(rb_handle) = self.handles.remove(&body) else {
            return false;
        };
        let removed = self.bodies.remove(
            rb_handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.queries.update(&self.colliders);
        removed.is_some()
    }

    fn translation(&self, body: BodyHandle) -> Option<Vec3> {
        self.get(body).map(|rb| from_vector(rb.translation()))
    }

    fn rotation(&self, body: BodyHandle) -> Option<Quat> {
        self.get(body).map(|rb| from_rotation(rb.rotation()))
    }

    fn linear_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.get(body).map(|rb| from_vector(rb.linvel()))
    }

    fn angular_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.get(body).map(|rb| from_vector(rb.angvel()))
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) -> bool {
        match self.dynamic_mut(body) {
            Some(rb) => {
                rb.apply_impulse(to_vector(impulse), true);
                true
            }
            None => false,
        }
    }

    fn apply_torque_impulse(&mut self, body: BodyHandle, torque: Vec3) -> bool {
        match self.dynamic_mut(body) {
            Some(rb) => {
                rb.apply_torque_impulse(to_vector(torque), true);
                true
            }
            None => false,
        }
    }

    fn set_next_kinematic_pose(
        &mut self,
        body: BodyHandle,
        translation: Vec3,
        rotation: Quat,
    ) -> bool {
        match self.get_mut(body) {
            Some(rb) if rb.is_kinematic() => {
                rb.set_next_kinematic_position(to_isometry(translation, rotation));
                true
            }
            _ => false,
        }
    }

    fn reset_body(
        &mut self,
        body: BodyHandle,
        translation: Vec3,
        linear_velocity: Vec3,
        angular_velocity: Vec3,
    ) -> bool {
        match self.dynamic_mut(body) {
            Some(rb) => {
                rb.set_translation(to_vector(translation), true);
                rb.set_linvel(to_vector(linear_velocity), true);
                rb.set_angvel(to_vector(angular_velocity), true);
                true
            }
            None => false,
        }
    }

    fn cast_ray(&self, ray: Ray, max_toi: f32) -> Option<RayHit> {
        let origin = na::Point3::new(ray.origin.x, ray.origin.y, ray.origin.z);
        let query = rp::Ray::new(origin, to_vector(ray.dir));
        let (collider, toi) = self.queries.cast_ray(
            &self.bodies,
            &self.colliders,
            &query,
            max_toi,
            true,
            rp::QueryFilter::default(),
        )?;
        let body = self.owner(collider)?;
        Some(RayHit { body, toi })
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.integration.dt = dt;
        self.pipeline.step(
            &to_vector(self.gravity),
            &self.integration,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.queries),
            &(),
            &(),
        );
    }
}

//! Physics world abstraction
//!
//! The game never integrates bodies itself. Everything it needs from a rigid-body
//! engine goes through [`PhysicsWorld`]:
//! - creating fixed, kinematic and dynamic bodies with a collider
//! - linear and torque impulses on dynamic bodies
//! - kinematic pose targets for the next step
//! - hard resets of a dynamic body's transform and velocities
//! - ray casts reporting time of impact
//!
//! [`RapierWorld`] backs it with `rapier3d` for the native binary and the tests.

pub mod world;

pub use world::RapierWorld;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Opaque id of a body owned by a physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// How a body moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves
    Fixed,
    /// Moved by pose targets, pushes dynamic bodies but is never pushed back
    Kinematic,
    /// Integrated under gravity, impulses and contacts
    Dynamic,
}

/// Collision shape in body-local space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Collider {
    Ball { radius: f32 },
    Cuboid { half_extents: Vec3 },
}

/// Everything needed to create a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub translation: Vec3,
    pub rotation: Quat,
    pub collider: Collider,
    pub restitution: f32,
    pub friction: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Whether the engine may put the body to sleep when it comes to rest
    pub can_sleep: bool,
}

impl BodyDesc {
    pub fn new(kind: BodyKind, translation: Vec3, collider: Collider) -> Self {
        Self {
            kind,
            translation,
            rotation: Quat::IDENTITY,
            collider,
            restitution: 0.0,
            friction: 0.5,
            linear_damping: 0.0,
            angular_damping: 0.0,
            can_sleep: true,
        }
    }

    pub fn fixed(translation: Vec3, collider: Collider) -> Self {
        Self::new(BodyKind::Fixed, translation, collider)
    }

    pub fn kinematic(translation: Vec3, collider: Collider) -> Self {
        Self::new(BodyKind::Kinematic, translation, collider)
    }

    pub fn dynamic(translation: Vec3, collider: Collider) -> Self {
        Self::new(BodyKind::Dynamic, translation, collider)
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn without_sleeping(mut self) -> Self {
        self.can_sleep = false;
        self
    }
}

/// A half-line with unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize_or_zero(),
        }
    }

    #[inline]
    pub fn point_at(&self, toi: f32) -> Vec3 {
        self.origin + self.dir * toi
    }
}

/// First hit along a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub body: BodyHandle,
    /// Distance along the ray (direction is unit length)
    pub toi: f32,
}

/// Capabilities the game consumes from a rigid-body engine.
///
/// Methods addressing a body that does not exist return `None`/`false` and
/// change nothing.
pub trait PhysicsWorld {
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle;
    fn remove_body(&mut self, body: BodyHandle) -> bool;

    fn translation(&self, body: BodyHandle) -> Option<Vec3>;
    fn rotation(&self, body: BodyHandle) -> Option<Quat>;
    fn linear_velocity(&self, body: BodyHandle) -> Option<Vec3>;
    fn angular_velocity(&self, body: BodyHandle) -> Option<Vec3>;

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) -> bool;
    fn apply_torque_impulse(&mut self, body: BodyHandle, torque: Vec3) -> bool;

    /// Pose a kinematic body reaches at the end of the next step
    fn set_next_kinematic_pose(
        &mut self,
        body: BodyHandle,
        translation: Vec3,
        rotation: Quat,
    ) -> bool;

    /// Teleport a dynamic body and overwrite its velocities
    fn reset_body(
        &mut self,
        body: BodyHandle,
        translation: Vec3,
        linear_velocity: Vec3,
        angular_velocity: Vec3,
    ) -> bool;

    /// First collider hit within `max_toi`, treating shapes as solid
    fn cast_ray(&self, ray: Ray, max_toi: f32) -> Option<RayHit>;

    /// Advance the world by `dt` seconds
    fn step(&mut self, dt: f32);
}

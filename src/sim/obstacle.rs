//! Obstacle motion
//!
//! Obstacles are kinematic bars posed every tick from the elapsed time. Each
//! instance draws its own phase (or spin rate) once at construction from an
//! unseeded source, so the layout replays from the level seed while the
//! animation timing differs run to run.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::level::{Archetype, LevelSegment};

/// Bar height above the segment floor at rest
pub const BAR_REST_HEIGHT: f32 = 0.3;
/// Spinner / limbo bar collider half extents
pub const BAR_HALF_EXTENTS: Vec3 = Vec3::new(1.75, 0.15, 0.15);
/// Axe blade collider half extents
pub const AXE_HALF_EXTENTS: Vec3 = Vec3::new(0.75, 0.75, 0.15);
/// Spinner angular speed range (rad/s, magnitude)
pub const SPIN_RATE_MIN: f32 = 0.2;
pub const SPIN_RATE_MAX: f32 = 1.2;
/// Limbo bar bob center height
pub const LIMBO_CENTER_HEIGHT: f32 = 1.15;
/// Axe swing amplitude and blade height
pub const AXE_SWING: f32 = 1.25;
pub const AXE_HEIGHT: f32 = 0.75;

/// Kinematic target for one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicPose {
    pub translation: Vec3,
    pub rotation: Quat,
}

/// Motion function of one obstacle instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObstacleMotion {
    /// Spins about +Y at a signed rate
    Spinner { rate: f32 },
    /// Bobs up and down
    Limbo { phase: f32 },
    /// Swings side to side
    Axe { phase: f32 },
}

impl ObstacleMotion {
    /// Draw per-instance parameters for an obstacle archetype.
    /// Returns `None` for Start and End.
    pub fn spawn<R: Rng + ?Sized>(archetype: Archetype, rng: &mut R) -> Option<Self> {
        match archetype {
            Archetype::Spinner => {
                let magnitude = rng.random_range(SPIN_RATE_MIN..SPIN_RATE_MAX);
                let sign = if rng.random_bool(0.5) { -1.0 } else { 1.0 };
                Some(ObstacleMotion::Spinner {
                    rate: magnitude * sign,
                })
            }
            Archetype::Limbo => Some(ObstacleMotion::Limbo {
                phase: rng.random_range(0.0..TAU),
            }),
            Archetype::Axe => Some(ObstacleMotion::Axe {
                phase: rng.random_range(0.0..TAU),
            }),
            Archetype::Start | Archetype::End => None,
        }
    }

    /// Pose at `time` seconds for an obstacle whose segment sits at `base`
    pub fn pose(&self, time: f32, base: Vec3) -> KinematicPose {
        match *self {
            ObstacleMotion::Spinner { rate } => KinematicPose {
                translation: base + Vec3::Y * BAR_REST_HEIGHT,
                rotation: Quat::from_rotation_y(time * rate),
            },
            ObstacleMotion::Limbo { phase } => KinematicPose {
                translation: Vec3::new(0.0, (time + phase).sin() + LIMBO_CENTER_HEIGHT, base.z),
                rotation: Quat::IDENTITY,
            },
            ObstacleMotion::Axe { phase } => KinematicPose {
                translation: Vec3::new(
                    base.x + AXE_SWING * (time + phase).sin(),
                    base.y + AXE_HEIGHT,
                    base.z,
                ),
                rotation: Quat::IDENTITY,
            },
        }
    }

    /// Collider half extents of the moving part
    pub fn half_extents(&self) -> Vec3 {
        match self {
            ObstacleMotion::Spinner { .. } | ObstacleMotion::Limbo { .. } => BAR_HALF_EXTENTS,
            ObstacleMotion::Axe { .. } => AXE_HALF_EXTENTS,
        }
    }
}

/// A live obstacle: its segment plus its motion parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub segment: LevelSegment,
    pub motion: ObstacleMotion,
}

impl Obstacle {
    pub fn spawn<R: Rng + ?Sized>(segment: LevelSegment, rng: &mut R) -> Option<Self> {
        ObstacleMotion::spawn(segment.archetype, rng).map(|motion| Self { segment, motion })
    }

    pub fn pose(&self, time: f32) -> KinematicPose {
        self.motion.pose(time, self.segment.position)
    }

    /// Pose the body starts in, before any tick
    pub fn rest_pose(&self) -> KinematicPose {
        KinematicPose {
            translation: self.segment.position + Vec3::Y * BAR_REST_HEIGHT,
            rotation: Quat::IDENTITY,
        }
    }
}

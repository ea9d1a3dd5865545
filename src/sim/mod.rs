//! Game simulation module
//!
//! All gameplay logic lives here:
//! - Course layout is a pure function of segment count and seed
//! - Obstacle motion is a pure function of time and per-instance phase
//! - The session state machine is the only owner of phase and timing
//! - Physics is reached only through the `PhysicsWorld` trait

pub mod level;
pub mod obstacle;
pub mod player;
pub mod state;
pub mod tick;

pub use level::{
    Archetype, CourseCollider, Level, LevelBounds, LevelSegment, generate, segment_position,
};
pub use obstacle::{KinematicPose, Obstacle, ObstacleMotion};
pub use player::{CameraRig, ControlInput, ControllerEvents, PlayerController};
pub use state::{Clock, GamePhase, GameSession, ManualClock, MonotonicClock, PhaseChange};
pub use tick::{LiveObstacle, Session};

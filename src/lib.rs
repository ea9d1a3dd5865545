//! Marble Race - a physics obstacle course for a rolling marble
//!
//! Core modules:
//! - `sim`: Session state machine, level generation, obstacle motion, player control
//! - `physics`: Physics-world interface plus a small reference world
//! - `hud`: What the UI overlay reads every frame
//! - `settings`: Run configuration

pub mod hud;
pub mod physics;
pub mod settings;
pub mod sim;

pub use hud::Hud;
pub use settings::Settings;

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    use glam::Vec3;

    /// Fixed simulation timestep (60 Hz, one tick per display frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default number of obstacle segments between start and finish
    pub const DEFAULT_SEGMENT_COUNT: u32 = 5;
    /// Length of one course segment along -Z
    pub const SEGMENT_SPACING: f32 = 4.0;
    /// Half width of a segment floor
    pub const SEGMENT_HALF_WIDTH: f32 = 2.0;
    /// Side wall center offset from the course axis
    pub const WALL_OFFSET: f32 = 2.15;
    /// Wall half thickness
    pub const WALL_HALF_THICKNESS: f32 = 0.15;
    /// Wall half height (walls sit on the floor, center at this height)
    pub const WALL_HALF_HEIGHT: f32 = 0.75;
    /// Floor slab half thickness (top face at y = 0)
    pub const FLOOR_HALF_THICKNESS: f32 = 0.1;

    /// Player ball
    pub const PLAYER_RADIUS: f32 = 0.3;
    pub const PLAYER_SPAWN: Vec3 = Vec3::new(0.0, 1.0, 0.0);
    pub const PLAYER_DAMPING: f32 = 0.5;

    /// Movement impulse per second of held input
    pub const IMPULSE_RATE: f32 = 0.6;
    /// Rolling torque impulse per second of held input
    pub const TORQUE_RATE: f32 = 0.2;
    /// Upward impulse for a jump
    pub const JUMP_IMPULSE: f32 = 0.5;
    /// Ground probe starts this far below the ball center
    pub const JUMP_RAY_OFFSET: f32 = 0.31;
    /// Ground probe length
    pub const JUMP_RAY_LENGTH: f32 = 10.0;
    /// Ground probe hit closer than this counts as grounded
    pub const GROUNDED_TOI: f32 = 0.15;

    /// Camera trails the ball by this offset
    pub const CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 0.65, 2.25);
    /// Camera looks slightly above the ball
    pub const CAMERA_TARGET_OFFSET: Vec3 = Vec3::new(0.0, 0.25, 0.0);
    /// Exponential smoothing rate (per second)
    pub const CAMERA_SMOOTHING: f32 = 5.0;
    /// Camera pose before the first tick
    pub const CAMERA_INITIAL_POSITION: Vec3 = Vec3::new(10.0, 10.0, 10.0);

    /// Falling below this height restarts the run
    pub const FALL_Y: f32 = -4.0;

    /// Shared surface properties
    pub const RESTITUTION: f32 = 0.2;
}

/// Fraction of the remaining distance to cover this tick for exponential
/// smoothing at `rate` per second. Always in [0, 1) for `dt >= 0`.
#[inline]
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt.max(0.0)).exp()
}

/// Move `current` toward `target` by the frame-rate independent smoothing factor
#[inline]
pub fn toward(current: Vec3, target: Vec3, rate: f32, dt: f32) -> Vec3 {
    current.lerp(target, smoothing_factor(rate, dt))
}

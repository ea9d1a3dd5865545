//! Player marble control
//!
//! Turns per-tick control snapshots into impulses on the marble, probes the
//! ground for jumps, trails the camera and reports finish/fall to the session.
//! The controller keeps no phase of its own: it reads the session, and resets
//! the marble whenever it sees the session enter Ready.

use std::sync::mpsc::Receiver;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::level::LevelBounds;
use super::state::{GamePhase, GameSession, PhaseChange};
use crate::consts::*;
use crate::physics::{BodyDesc, BodyHandle, Collider, PhysicsWorld, Ray};
use crate::toward;

/// Held state of every control for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl ControlInput {
    pub fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right || self.jump
    }

    /// Controls held now that were released in `previous`
    pub fn pressed_since(&self, previous: &ControlInput) -> ControlInput {
        ControlInput {
            forward: self.forward && !previous.forward,
            backward: self.backward && !previous.backward,
            left: self.left && !previous.left,
            right: self.right && !previous.right,
            jump: self.jump && !previous.jump,
        }
    }

    /// Linear and torque impulse for holding these controls over `dt`.
    /// Directions add up without normalization.
    pub fn impulses(&self, dt: f32) -> (Vec3, Vec3) {
        let impulse_strength = IMPULSE_RATE * dt;
        let torque_strength = TORQUE_RATE * dt;
        let mut impulse = Vec3::ZERO;
        let mut torque = Vec3::ZERO;

        if self.forward {
            impulse.z -= impulse_strength;
            torque.x -= torque_strength;
        }
        if self.backward {
            impulse.z += impulse_strength;
            torque.x += torque_strength;
        }
        if self.left {
            impulse.x -= impulse_strength;
            torque.z += torque_strength;
        }
        if self.right {
            impulse.x += impulse_strength;
            torque.z -= torque_strength;
        }

        (impulse, torque)
    }
}

/// Smoothed chase camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraRig {
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            position: CAMERA_INITIAL_POSITION,
            target: Vec3::ZERO,
        }
    }
}

impl CameraRig {
    pub fn desired_position(body: Vec3) -> Vec3 {
        body + CAMERA_OFFSET
    }

    pub fn desired_target(body: Vec3) -> Vec3 {
        body + CAMERA_TARGET_OFFSET
    }

    /// Ease toward the pose for a marble at `body`
    pub fn follow(&mut self, body: Vec3, dt: f32) {
        self.position = toward(self.position, Self::desired_position(body), CAMERA_SMOOTHING, dt);
        self.target = toward(self.target, Self::desired_target(body), CAMERA_SMOOTHING, dt);
    }
}

/// What the controller did during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerEvents {
    pub started: bool,
    pub jumped: bool,
    pub finished: bool,
    pub fell: bool,
    pub reset: bool,
}

impl ControllerEvents {
    pub fn merge(self, other: ControllerEvents) -> ControllerEvents {
        ControllerEvents {
            started: self.started || other.started,
            jumped: self.jumped || other.jumped,
            finished: self.finished || other.finished,
            fell: self.fell || other.fell,
            reset: self.reset || other.reset,
        }
    }
}

/// Drives the player marble. Split around the physics step: forces go in
/// before it, camera and boundary checks read the result after it.
#[derive(Debug)]
pub struct PlayerController {
    body: Option<BodyHandle>,
    camera: CameraRig,
    previous: ControlInput,
    phase_changes: Receiver<PhaseChange>,
}

impl PlayerController {
    /// Create a controller subscribed to `session` phase changes
    pub fn new(session: &mut GameSession) -> Self {
        Self {
            body: None,
            camera: CameraRig::default(),
            previous: ControlInput::default(),
            phase_changes: session.subscribe(),
        }
    }

    /// Marble body description at the spawn pose
    pub fn body_desc() -> BodyDesc {
        BodyDesc::dynamic(
            PLAYER_SPAWN,
            Collider::Ball {
                radius: PLAYER_RADIUS,
            },
        )
        .with_restitution(RESTITUTION)
        .with_friction(1.0)
        .with_damping(PLAYER_DAMPING, PLAYER_DAMPING)
        .without_sleeping()
    }

    /// Create the marble in `world` and take control of it
    pub fn spawn_body<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) -> BodyHandle {
        let body = world.add_body(Self::body_desc());
        self.body = Some(body);
        body
    }

    /// Take control of an existing body
    pub fn attach(&mut self, body: BodyHandle) {
        self.body = Some(body);
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    /// Read the marble position, if the body exists yet
    fn position<W: PhysicsWorld + ?Sized>(&self, world: &W) -> Option<(BodyHandle, Vec3)> {
        let body = self.body?;
        world.translation(body).map(|p| (body, p))
    }

    /// Ground probe: a short ray straight down from just under the marble
    pub fn is_grounded<W: PhysicsWorld + ?Sized>(world: &W, position: Vec3) -> bool {
        let origin = position - Vec3::Y * JUMP_RAY_OFFSET;
        world
            .cast_ray(Ray::new(origin, Vec3::NEG_Y), JUMP_RAY_LENGTH)
            .is_some_and(|hit| hit.toi < GROUNDED_TOI)
    }

    /// Pre-step half of the tick: start trigger, movement and jump.
    ///
    /// Movement is not gated on the phase; the same input that starts the
    /// timer also pushes the marble on that tick.
    pub fn apply_input<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        session: &mut GameSession,
        input: &ControlInput,
        dt: f32,
    ) -> ControllerEvents {
        let mut events = ControllerEvents::default();
        let Some((body, position)) = self.position(world) else {
            return events;
        };

        let pressed = input.pressed_since(&self.previous);
        self.previous = *input;

        if pressed.any() && session.phase() == GamePhase::Ready {
            events.started = session.start();
        }

        let (impulse, torque) = input.impulses(dt);
        world.apply_impulse(body, impulse);
        world.apply_torque_impulse(body, torque);

        if pressed.jump {
            if Self::is_grounded(world, position) {
                world.apply_impulse(body, Vec3::Y * JUMP_IMPULSE);
                events.jumped = true;
                log::debug!("Jump at {:?}", position);
            } else {
                log::trace!("Jump dropped, airborne at {:?}", position);
            }
        }

        events
    }

    /// Post-step half of the tick: camera, finish and fall checks, then reset
    /// if the session went back to Ready.
    pub fn observe<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        session: &mut GameSession,
        bounds: &LevelBounds,
        dt: f32,
    ) -> ControllerEvents {
        let mut events = ControllerEvents::default();
        let Some((_, position)) = self.position(world) else {
            return events;
        };

        self.camera.follow(position, dt);

        if bounds.is_past_finish(position) {
            events.finished = session.end();
        }
        if bounds.has_fallen(position) {
            log::info!("Fell at {:?}", position);
            events.fell = session.restart();
        }

        events.reset = self.sync_phase(world);
        events
    }

    /// Drain phase notifications; put the marble back on the spawn pose if the
    /// session entered Ready. Returns true if a reset happened.
    pub fn sync_phase<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) -> bool {
        let entered_ready = self
            .phase_changes
            .try_iter()
            .fold(false, |acc, change| acc || change.to == GamePhase::Ready);
        if !entered_ready {
            return false;
        }
        let Some(body) = self.body else {
            return false;
        };
        let reset = world.reset_body(body, PLAYER_SPAWN, Vec3::ZERO, Vec3::ZERO);
        if reset {
            log::debug!("Marble reset to spawn");
        } else {
            log::warn!("Marble body {:?} missing on reset", body);
        }
        reset
    }
}

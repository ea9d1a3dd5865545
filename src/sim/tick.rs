//! Session orchestration
//!
//! Owns the physics world, the game session, the player controller and the
//! bodies of the current course, and runs them in a fixed order each tick:
//!
//! 1. rebuild the course if the seed or segment count changed
//! 2. reset the marble if the session re-entered Ready
//! 3. write obstacle kinematic targets
//! 4. apply player input
//! 5. step physics
//! 6. camera, finish and fall checks (with an immediate reset and rebuild on fall)

use glam::Vec3;
use rand::RngCore;

use super::level::{Level, generate};
use super::obstacle::Obstacle;
use super::player::{CameraRig, ControlInput, ControllerEvents, PlayerController};
use super::state::{Clock, GameSession};
use crate::consts::*;
use crate::hud::Hud;
use crate::physics::{BodyDesc, BodyHandle, Collider, PhysicsWorld};
use crate::settings::Settings;

/// Largest frame time `advance` will accept
const MAX_FRAME_DT: f32 = 0.1;

/// An obstacle and the kinematic body it drives
#[derive(Debug, Clone, Copy)]
pub struct LiveObstacle {
    pub obstacle: Obstacle,
    pub body: BodyHandle,
}

/// Composition root for one play session
pub struct Session<W: PhysicsWorld> {
    world: W,
    game: GameSession,
    controller: PlayerController,
    level: Level,
    course_bodies: Vec<BodyHandle>,
    obstacles: Vec<LiveObstacle>,
    /// Unseeded source for obstacle phases and spin rates
    motion_rng: Box<dyn RngCore>,
    /// Simulation time driving obstacle motion, never reset
    sim_time: f32,
    accumulator: f32,
    ticks: u64,
    last_input: ControlInput,
}

impl<W: PhysicsWorld> Session<W> {
    /// Wire a session into `world`: spawns the marble and builds the first course
    pub fn new(world: W, game: GameSession) -> Self {
        Self::with_motion_rng(world, game, Box::new(rand::rng()))
    }

    /// Like [`Session::new`] with an explicit source for obstacle phases
    pub fn with_motion_rng(
        mut world: W,
        mut game: GameSession,
        motion_rng: Box<dyn RngCore>,
    ) -> Self {
        let mut controller = PlayerController::new(&mut game);
        controller.spawn_body(&mut world);
        let level = generate(game.segment_count(), game.level_seed());

        let mut session = Self {
            world,
            game,
            controller,
            level,
            course_bodies: Vec::new(),
            obstacles: Vec::new(),
            motion_rng,
            sim_time: 0.0,
            accumulator: 0.0,
            ticks: 0,
            last_input: ControlInput::default(),
        };
        session.spawn_level_bodies();
        session
    }

    /// Build a session from run settings, timed by `clock`
    pub fn from_settings(world: W, settings: &Settings, clock: impl Clock + 'static) -> Self {
        let segment_count = settings.segment_count();
        let game = match settings.seed {
            Some(seed) => GameSession::new(segment_count, seed, clock),
            None => GameSession::with_fresh_seed(segment_count, clock),
        };
        Self::new(world, game)
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn game(&self) -> &GameSession {
        &self.game
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn obstacles(&self) -> &[LiveObstacle] {
        &self.obstacles
    }

    pub fn course_bodies(&self) -> &[BodyHandle] {
        &self.course_bodies
    }

    pub fn camera(&self) -> &CameraRig {
        self.controller.camera()
    }

    pub fn player_body(&self) -> Option<BodyHandle> {
        self.controller.body()
    }

    pub fn player_position(&self) -> Option<Vec3> {
        self.controller.body().and_then(|b| self.world.translation(b))
    }

    pub fn sim_time(&self) -> f32 {
        self.sim_time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// What the overlay shows this frame
    pub fn hud(&self) -> Hud {
        Hud::new(&self.game, self.last_input)
    }

    /// Restart affordance: new seed, fresh course, marble back on spawn
    pub fn restart(&mut self) {
        self.game.restart();
        self.ensure_level();
        self.controller.sync_phase(&mut self.world);
    }

    /// Change the course length; the course is rebuilt right away
    pub fn set_segment_count(&mut self, segment_count: u32) {
        self.game.set_segment_count(segment_count);
        self.ensure_level();
    }

    /// Accumulate real frame time and run whole fixed ticks.
    /// Returns the number of ticks run.
    pub fn advance(&mut self, frame_dt: f32, input: &ControlInput) -> u32 {
        if !frame_dt.is_finite() {
            log::warn!("Ignoring non-finite frame time {}", frame_dt);
            return 0;
        }
        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_DT);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.tick(input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        substeps
    }

    /// Advance everything by one step of `dt` seconds
    pub fn tick(&mut self, input: &ControlInput, dt: f32) -> ControllerEvents {
        self.ticks += 1;
        self.last_input = *input;

        self.ensure_level();
        let synced = ControllerEvents {
            reset: self.controller.sync_phase(&mut self.world),
            ..Default::default()
        };

        // Obstacle targets must land before the step integrates contacts
        self.sim_time += dt;
        for live in &self.obstacles {
            let pose = live.obstacle.pose(self.sim_time);
            self.world
                .set_next_kinematic_pose(live.body, pose.translation, pose.rotation);
        }

        let before = self
            .controller
            .apply_input(&mut self.world, &mut self.game, input, dt);

        self.world.step(dt);

        let after = self
            .controller
            .observe(&mut self.world, &mut self.game, &self.level.bounds, dt);

        // A fall restart drew a new seed; rebuild now rather than next tick
        self.ensure_level();

        synced.merge(before).merge(after)
    }

    /// Rebuild the course when the session's seed or segment count moved on
    fn ensure_level(&mut self) -> bool {
        let (count, seed) = (self.game.segment_count(), self.game.level_seed());
        if self.level.segment_count == count && self.level.seed == seed {
            return false;
        }
        self.despawn_level_bodies();
        self.level = generate(count, seed);
        self.spawn_level_bodies();
        true
    }

    fn despawn_level_bodies(&mut self) {
        for body in self.course_bodies.drain(..) {
            self.world.remove_body(body);
        }
        for live in self.obstacles.drain(..) {
            self.world.remove_body(live.body);
        }
    }

    fn spawn_level_bodies(&mut self) {
        for collider in self.level.bounds.colliders() {
            let body = self.world.add_body(
                BodyDesc::fixed(
                    collider.center,
                    Collider::Cuboid {
                        half_extents: collider.half_extents,
                    },
                )
                .with_restitution(RESTITUTION)
                .with_friction(collider.friction),
            );
            self.course_bodies.push(body);
        }

        for segment in &self.level.segments {
            let Some(obstacle) = Obstacle::spawn(*segment, &mut *self.motion_rng) else {
                continue;
            };
            let rest = obstacle.rest_pose();
            let mut desc = BodyDesc::kinematic(
                rest.translation,
                Collider::Cuboid {
                    half_extents: obstacle.motion.half_extents(),
                },
            )
            .with_restitution(RESTITUTION)
            .with_friction(0.0);
            desc.rotation = rest.rotation;
            let body = self.world.add_body(desc);
            self.obstacles.push(LiveObstacle { obstacle, body });
        }

        log::info!(
            "Level built: seed {}, {} segments, {:?}",
            self.level.seed,
            self.level.segment_count,
            self.level.archetypes()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::RapierWorld;
    use crate::sim::obstacle::ObstacleMotion;
    use crate::sim::state::{GamePhase, ManualClock};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::time::Duration;

    fn session(seed: u64) -> (Session<RapierWorld>, ManualClock) {
        session_with_motion(seed, seed)
    }

    fn session_with_motion(seed: u64, motion_seed: u64) -> (Session<RapierWorld>, ManualClock) {
        let clock = ManualClock::new();
        let game = GameSession::new(5, seed, clock.clone());
        let rng = Box::new(Pcg32::seed_from_u64(motion_seed));
        (Session::with_motion_rng(RapierWorld::new(), game, rng), clock)
    }

    fn idle(session: &mut Session<RapierWorld>, ticks: usize) {
        for _ in 0..ticks {
            session.tick(&ControlInput::default(), SIM_DT);
        }
    }

    fn teleport(session: &mut Session<RapierWorld>, to: Vec3) {
        let body = session.player_body().unwrap();
        session.world_mut().reset_body(body, to, Vec3::ZERO, Vec3::ZERO);
    }

    #[test]
    fn test_initial_bodies() {
        let (s, _) = session(3);
        // Floor + 3 walls, 5 obstacles, 1 marble
        assert_eq!(s.course_bodies().len(), 4);
        assert_eq!(s.obstacles().len(), 5);
        assert_eq!(s.world().body_count(), 10);
        assert_eq!(s.level().seed, 3);
        assert_eq!(s.player_position(), Some(PLAYER_SPAWN));
        assert_eq!(s.game().phase(), GamePhase::Ready);
    }

    #[test]
    fn test_marble_settles_on_start_segment() {
        let (mut s, _) = session(11);
        idle(&mut s, 180);
        let p = s.player_position().unwrap();
        assert!((p.y - PLAYER_RADIUS).abs() < 0.02, "resting at {p:?}");
        assert_eq!(s.game().phase(), GamePhase::Ready);
        let body = s.player_body().unwrap();
        assert!(PlayerController::is_grounded(s.world(), p));
        assert!(s.world().linear_velocity(body).unwrap().length() < 0.05);
    }

    #[test]
    fn test_level_not_rebuilt_every_tick() {
        let (mut s, _) = session(5);
        let bodies: Vec<BodyHandle> = s.obstacles().iter().map(|o| o.body).collect();
        idle(&mut s, 30);
        let after: Vec<BodyHandle> = s.obstacles().iter().map(|o| o.body).collect();
        assert_eq!(bodies, after);
    }

    #[test]
    fn test_obstacle_targets_written_before_step() {
        let (mut s, _) = session(8);
        idle(&mut s, 10);
        for live in s.obstacles() {
            let pose = live.obstacle.pose(s.sim_time());
            let at = s.world().translation(live.body).unwrap();
            assert!((at - pose.translation).length() < 1e-4);
        }
    }

    #[test]
    fn test_first_press_starts_timer() {
        let (mut s, clock) = session(2);
        idle(&mut s, 5);
        clock.set(Duration::from_millis(100));
        let forward = ControlInput {
            forward: true,
            ..Default::default()
        };
        let events = s.tick(&forward, SIM_DT);
        assert!(events.started);
        assert_eq!(s.game().phase(), GamePhase::Playing);
        assert_eq!(s.game().start_time(), Some(Duration::from_millis(100)));
        // Same tick already pushed the marble forward
        let body = s.player_body().unwrap();
        assert!(s.world().linear_velocity(body).unwrap().z < 0.0);
    }

    #[test]
    fn test_fall_restarts_with_new_course() {
        let (mut s, _) = session(21);
        idle(&mut s, 60);
        let forward = ControlInput {
            forward: true,
            ..Default::default()
        };
        s.tick(&forward, SIM_DT);
        assert_eq!(s.game().phase(), GamePhase::Playing);

        let old_seed = s.game().level_seed();
        let old_obstacles: Vec<BodyHandle> = s.obstacles().iter().map(|o| o.body).collect();
        teleport(&mut s, Vec3::new(3.0, -5.0, -3.0));

        let events = s.tick(&forward, SIM_DT);
        assert!(events.fell);
        assert!(events.reset);
        assert_eq!(s.game().phase(), GamePhase::Ready);
        assert_ne!(s.game().level_seed(), old_seed);
        assert_eq!(s.level().seed, s.game().level_seed());

        let body = s.player_body().unwrap();
        assert_eq!(s.player_position(), Some(Vec3::new(0.0, 1.0, 0.0)));
        assert_eq!(s.world().linear_velocity(body), Some(Vec3::ZERO));
        assert_eq!(s.world().angular_velocity(body), Some(Vec3::ZERO));

        // Previous course bodies are gone
        for old in old_obstacles {
            assert_eq!(s.world().translation(old), None);
        }
        assert_eq!(s.world().body_count(), 10);
    }

    #[test]
    fn test_finish_ends_run() {
        let (mut s, clock) = session(4);
        let forward = ControlInput {
            forward: true,
            ..Default::default()
        };
        s.tick(&forward, SIM_DT);
        clock.advance(Duration::from_secs(12));
        teleport(&mut s, Vec3::new(0.0, 0.3, -23.0));
        let events = s.tick(&forward, SIM_DT);
        assert!(events.finished);
        assert_eq!(s.game().phase(), GamePhase::Ended);
        assert!(s.game().end_time() >= s.game().start_time());

        let hud = s.hud();
        assert!(hud.show_restart);
        assert_eq!(hud.timer_text, "Time: 12.00s");
    }

    #[test]
    fn test_explicit_restart_after_finish() {
        let (mut s, _) = session(4);
        let forward = ControlInput {
            forward: true,
            ..Default::default()
        };
        s.tick(&forward, SIM_DT);
        teleport(&mut s, Vec3::new(0.0, 0.3, -23.0));
        s.tick(&forward, SIM_DT);
        assert_eq!(s.game().phase(), GamePhase::Ended);

        let seed = s.game().level_seed();
        s.restart();
        assert_eq!(s.game().phase(), GamePhase::Ready);
        assert_ne!(s.level().seed, seed);
        assert_eq!(s.player_position(), Some(PLAYER_SPAWN));
        assert!(!s.hud().show_restart);
    }

    #[test]
    fn test_segment_count_change_rebuilds() {
        let (mut s, _) = session(6);
        s.set_segment_count(8);
        assert_eq!(s.level().segment_count, 8);
        assert_eq!(s.obstacles().len(), 8);
        assert_eq!(s.world().body_count(), 4 + 8 + 1);
        assert_eq!(s.level().bounds.finish_z, -34.0);

        s.set_segment_count(0);
        assert_eq!(s.obstacles().len(), 1);
    }

    #[test]
    fn test_same_seed_same_layout() {
        let (a, _) = session_with_motion(99, 99);
        let (b, _) = session_with_motion(99, 1);
        assert_eq!(a.level(), b.level());
    }

    #[test]
    fn test_obstacle_motion_independent_of_level_seed() {
        let (a, _) = session_with_motion(99, 7);
        let (b, _) = session_with_motion(99, 8);
        assert_eq!(a.level(), b.level());

        let motions = |s: &Session<RapierWorld>| -> Vec<ObstacleMotion> {
            s.obstacles().iter().map(|o| o.obstacle.motion).collect()
        };
        let (ma, mb) = (motions(&a), motions(&b));
        assert_eq!(ma.len(), mb.len());
        // Same archetype per slot, different phase or rate
        for (x, y) in ma.iter().zip(&mb) {
            assert_eq!(std::mem::discriminant(x), std::mem::discriminant(y));
        }
        assert_ne!(ma, mb);
    }

    #[test]
    fn test_advance_runs_whole_ticks() {
        let (mut s, _) = session(1);
        let input = ControlInput::default();
        assert_eq!(s.advance(SIM_DT * 0.5, &input), 0);
        assert_eq!(s.advance(SIM_DT * 2.0, &input), 2);
        assert_eq!(s.ticks(), 2);
        // Long stalls are clamped
        assert!(s.advance(5.0, &input) <= MAX_SUBSTEPS);
    }

    #[test]
    fn test_from_settings_times_with_given_clock() {
        let settings = Settings {
            seed: Some(7),
            ..Settings::default()
        };
        let clock = ManualClock::new();
        let mut s = Session::from_settings(RapierWorld::new(), &settings, clock.clone());
        assert_eq!(s.level().seed, 7);

        let forward = ControlInput {
            forward: true,
            ..Default::default()
        };
        for _ in 0..60 {
            clock.advance(Duration::from_secs_f32(SIM_DT));
            s.tick(&forward, SIM_DT);
        }
        // Timer reads simulated time, however fast the ticks ran
        let expected = 59.0 * SIM_DT;
        assert_eq!(s.game().phase(), GamePhase::Playing);
        assert!((s.game().elapsed().as_secs_f32() - expected).abs() < 1e-3);
    }

    #[test]
    fn test_advance_ignores_non_finite_frame_time() {
        let (mut s, _) = session(1);
        let input = ControlInput::default();
        assert_eq!(s.advance(f32::NAN, &input), 0);
        assert_eq!(s.advance(f32::INFINITY, &input), 0);
        // The accumulator is still usable afterwards
        assert_eq!(s.advance(SIM_DT * 2.0, &input), 2);
        assert_eq!(s.ticks(), 2);
    }

    #[test]
    fn test_rolling_forward_makes_progress() {
        let (mut s, _) = session(13);
        idle(&mut s, 60);
        let forward = ControlInput {
            forward: true,
            ..Default::default()
        };
        for _ in 0..60 {
            s.tick(&forward, SIM_DT);
        }
        assert!(s.player_position().unwrap().z < -0.1);
        // Camera trails behind and above
        let cam = s.camera().position;
        assert!(cam.y > s.player_position().unwrap().y);
    }
}

//! Session phase state machine
//!
//! One `GameSession` lives for the whole process. Transitions are the only
//! mutators and each is guarded, so calling one from the wrong phase is a no-op.
//! Every applied transition is broadcast to subscribers over a channel.

use std::cell::Cell;
use std::fmt::Debug;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Coarse state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the first control press
    #[default]
    Ready,
    /// Timer running
    Playing,
    /// Finish crossed, timer frozen
    Ended,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Ready => "ready",
            GamePhase::Playing => "playing",
            GamePhase::Ended => "ended",
        }
    }
}

/// Monotonic time source, measured from an arbitrary origin
pub trait Clock: Debug {
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for replays and tests. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// An applied phase transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: GamePhase,
    pub to: GamePhase,
    /// Clock time of the transition
    pub at: Duration,
}

/// Phase, timing and level identity of the running session
#[derive(Debug)]
pub struct GameSession {
    phase: GamePhase,
    start_time: Option<Duration>,
    end_time: Option<Duration>,
    segment_count: u32,
    level_seed: u64,
    clock: Box<dyn Clock>,
    listeners: Vec<Sender<PhaseChange>>,
}

impl GameSession {
    /// Create a session in Ready with the given level seed
    pub fn new(segment_count: u32, seed: u64, clock: impl Clock + 'static) -> Self {
        if segment_count == 0 {
            log::warn!("Session created with 0 segments, clamping to 1");
        }
        Self {
            phase: GamePhase::Ready,
            start_time: None,
            end_time: None,
            segment_count: segment_count.max(1),
            level_seed: seed,
            clock: Box::new(clock),
            listeners: Vec::new(),
        }
    }

    /// Create a session with a freshly drawn level seed
    pub fn with_fresh_seed(segment_count: u32, clock: impl Clock + 'static) -> Self {
        Self::new(segment_count, rand::rng().random(), clock)
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn start_time(&self) -> Option<Duration> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<Duration> {
        self.end_time
    }

    pub fn segment_count(&self) -> u32 {
        self.segment_count
    }

    pub fn level_seed(&self) -> u64 {
        self.level_seed
    }

    /// Current clock reading
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Change the course length. Takes effect at the next level rebuild.
    pub fn set_segment_count(&mut self, segment_count: u32) {
        if segment_count == 0 {
            log::warn!("Segment count 0 requested, clamping to 1");
        }
        self.segment_count = segment_count.max(1);
    }

    /// Receive every applied transition from now on
    pub fn subscribe(&mut self) -> Receiver<PhaseChange> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }

    /// Ready -> Playing. Returns true if the transition applied.
    pub fn start(&mut self) -> bool {
        if self.phase != GamePhase::Ready {
            return false;
        }
        let now = self.clock.now();
        self.start_time = Some(now);
        self.end_time = None;
        self.transition(GamePhase::Playing, now);
        true
    }

    /// Playing -> Ended. Returns true if the transition applied.
    pub fn end(&mut self) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        let now = self.clock.now();
        self.end_time = Some(now);
        self.transition(GamePhase::Ended, now);
        true
    }

    /// Any phase -> Ready with a new level seed. Segment count is kept.
    pub fn restart(&mut self) -> bool {
        let now = self.clock.now();
        let previous = self.level_seed;
        self.level_seed = next_seed(previous);
        self.start_time = None;
        self.end_time = None;
        log::info!(
            "Restart from {}: seed {} -> {}",
            self.phase.as_str(),
            previous,
            self.level_seed
        );
        self.transition(GamePhase::Ready, now);
        true
    }

    /// Run time for display. Zero while Ready, live while Playing, frozen once Ended.
    pub fn elapsed(&self) -> Duration {
        match (self.phase, self.start_time, self.end_time) {
            (GamePhase::Playing, Some(start), _) => self.clock.now().saturating_sub(start),
            (GamePhase::Ended, Some(start), Some(end)) => end.saturating_sub(start),
            _ => Duration::ZERO,
        }
    }

    fn transition(&mut self, to: GamePhase, at: Duration) {
        let change = PhaseChange {
            from: self.phase,
            to,
            at,
        };
        self.phase = to;
        if change.from != to {
            log::info!("Phase {} -> {}", change.from.as_str(), to.as_str());
        }
        // Drop subscribers whose receiver is gone
        self.listeners.retain(|tx| tx.send(change).is_ok());
    }
}

/// Draw a seed guaranteed to differ from `previous`
fn next_seed(previous: u64) -> u64 {
    let mut rng = rand::rng();
    loop {
        let seed: u64 = rng.random();
        if seed != previous {
            return seed;
        }
    }
}

//! Overlay data
//!
//! The UI host reads a [`Hud`] every frame: timer text, whether to offer a
//! restart, and which controls to light up.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sim::{ControlInput, GamePhase, GameSession};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hud {
    pub phase: GamePhase,
    pub elapsed: Duration,
    pub timer_text: String,
    /// Restart button is only offered after the finish
    pub show_restart: bool,
    /// Controls held this tick, for key highlights
    pub controls: ControlInput,
}

impl Hud {
    pub fn new(session: &GameSession, controls: ControlInput) -> Self {
        let phase = session.phase();
        let elapsed = session.elapsed();
        Self {
            phase,
            elapsed,
            timer_text: format_time(elapsed),
            show_restart: phase == GamePhase::Ended,
            controls,
        }
    }
}

/// "Time: 12.34s"
pub fn format_time(elapsed: Duration) -> String {
    format!("Time: {:.2}s", elapsed.as_secs_f64())
}

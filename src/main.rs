//! Marble Race entry point
//!
//! Runs a headless session against the rapier physics world and logs the
//! outcome. A rendering host drives `Session` the same way from its frame loop.

use std::time::Duration;

use marble_race::consts::*;
use marble_race::physics::{PhysicsWorld, RapierWorld};
use marble_race::sim::{ControlInput, GamePhase, ManualClock, PlayerController, Session};
use marble_race::{Hud, Settings};

/// Hold forward and hop whenever the marble is on the ground
fn autopilot(session: &Session<RapierWorld>, tick: u64) -> ControlInput {
    let grounded = session
        .player_position()
        .is_some_and(|p| PlayerController::is_grounded(session.world(), p));
    ControlInput {
        forward: true,
        // Release every other tick so each hop is a fresh press
        jump: grounded && tick % 2 == 0,
        ..Default::default()
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Marble Race (headless) starting...");

    let settings = Settings::load();
    // Headless ticks run faster than real time, so the timer follows simulated time
    let clock = ManualClock::new();
    let mut session = Session::from_settings(RapierWorld::new(), &settings, clock.clone());
    log::info!(
        "Course: {} segments, seed {}",
        session.game().segment_count(),
        session.game().level_seed()
    );

    let max_ticks = (settings.demo_seconds.max(0.0) / SIM_DT) as u64;
    let mut last_phase = session.game().phase();
    let mut restarts = 0u32;

    for tick in 0..max_ticks {
        let input = if settings.autopilot {
            autopilot(&session, tick)
        } else {
            ControlInput::default()
        };
        clock.advance(Duration::from_secs_f32(SIM_DT));
        let events = session.tick(&input, SIM_DT);
        if events.fell {
            restarts += 1;
        }

        let phase = session.game().phase();
        if phase != last_phase {
            let hud: Hud = session.hud();
            log::info!("{} ({})", hud.timer_text, phase.as_str());
            last_phase = phase;
        }
        if phase == GamePhase::Ended {
            break;
        }
    }

    let hud = session.hud();
    let position = session
        .player_body()
        .and_then(|b| session.world().translation(b));
    match hud.phase {
        GamePhase::Ended => log::info!("Finished! {} after {} falls", hud.timer_text, restarts),
        _ => log::info!(
            "Did not finish in {:.0}s ({} falls, marble at {:?})",
            settings.demo_seconds,
            restarts,
            position
        ),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The browser host drives `Session` directly
}

//! Countdown timer service.
//!
//! A single countdown exists at a time; starting a new one cancels and
//! replaces the previous. Staleness is handled with a generation counter:
//! every start or cancel bumps it, and both the tick loop and the expiry
//! event check it, so a timer belonging to an earlier phase can never fire
//! against a since-mutated state.

use crate::engine::{Event, GameEngine};
use crate::types::GamePhase;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Default)]
pub struct CountdownTimer {
    generation: AtomicU64,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start counting down `time_remaining` for the given phase, replacing
    /// any countdown already running.
    pub fn start(&self, engine: Arc<GameEngine>, phase: GamePhase) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut task = self.task.lock().expect("timer task lock poisoned");
        if let Some(previous) = task.take() {
            previous.abort();
        }
        *task = Some(tokio::spawn(run_countdown(engine, phase, generation)));
    }

    /// Stop the countdown and invalidate any pending expiry.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut task = self.task.lock().expect("timer task lock poisoned");
        if let Some(previous) = task.take() {
            previous.abort();
        }
    }
}

/// Tick once per second, decrementing the replicated `time_remaining` and
/// pushing a snapshot each tick. On reaching zero the final snapshot goes
/// out first, then the task yields so peers can observe `time = 0`, and
/// only then is the expiry dispatched through the regular event path.
async fn run_countdown(engine: Arc<GameEngine>, phase: GamePhase, generation: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    // interval fires immediately on first tick
    interval.tick().await;

    loop {
        interval.tick().await;

        if engine.timer().current_generation() != generation {
            return;
        }

        let remaining = {
            let mut session = engine.session_lock().await;
            if session.game.phase != phase {
                return;
            }
            session.game.time_remaining = session.game.time_remaining.saturating_sub(1);
            session.game.time_remaining
        };

        engine.push_snapshot().await;

        if remaining == 0 {
            tokio::task::yield_now().await;
            engine.dispatch(Event::TimerExpired { phase, generation }).await;
            return;
        }
    }
}

//! The host-authoritative game engine.
//!
//! One canonical [`GameState`] lives behind a single lock, mutated only by
//! [`GameEngine::dispatch`]. Network messages, the host start trigger and
//! timer expiries are all variants of one [`Event`] enum fed through the
//! same dispatcher, so every input runs to completion before the next one
//! is handled — single-writer semantics without any finer-grained locking.

mod phase;
mod player;
pub mod questions;
pub mod score;
pub mod timer;
pub mod vote;

pub use phase::StartError;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::supplier::ContentSupplier;
use crate::transport::{PeerEvent, Transport};
use crate::types::{GameConfig, GamePhase, GameState, Question};
use questions::QuestionFetcher;
use std::sync::Arc;
use std::time::Instant;
use timer::CountdownTimer;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// Everything the host owns for one session: the replicated state plus the
/// bookkeeping that never leaves the host.
pub(crate) struct Session {
    pub game: GameState,
    /// Questions queued for the current level, fetched at level start.
    pub queue: Vec<Question>,
    /// When the current phase was entered; used to debounce a burst of
    /// continue requests so the first one advances exactly one step.
    pub phase_entered_at: Instant,
}

/// A single input to the state machine. Everything that can change the
/// canonical state arrives here.
#[derive(Debug)]
pub enum Event {
    /// Something a connected peer did: joined, left, or sent a message.
    Peer(PeerEvent),
    /// Host-initiated "start game" trigger (not a network message).
    StartGame,
    /// A countdown reached zero. Carries the phase it was counting for and
    /// the timer generation, both checked before anything mutates.
    TimerExpired { phase: GamePhase, generation: u64 },
}

pub struct GameEngine {
    config: GameConfig,
    session: Mutex<Session>,
    supplier: Arc<dyn ContentSupplier>,
    fetcher: QuestionFetcher,
    transport: Arc<dyn Transport>,
    timer: CountdownTimer,
    /// Background tasks bound to this engine (event pump, sync
    /// broadcaster), aborted on shutdown.
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl GameEngine {
    pub fn new(
        config: GameConfig,
        supplier: Arc<dyn ContentSupplier>,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        let game = GameState::new(&config);
        Arc::new(Self {
            config,
            session: Mutex::new(Session {
                game,
                queue: Vec::new(),
                phase_entered_at: Instant::now(),
            }),
            supplier: supplier.clone(),
            fetcher: QuestionFetcher::new(supplier),
            transport,
            timer: CountdownTimer::new(),
            tasks: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    pub(crate) fn supplier(&self) -> &Arc<dyn ContentSupplier> {
        &self.supplier
    }

    pub(crate) fn fetcher(&self) -> &QuestionFetcher {
        &self.fetcher
    }

    pub(crate) async fn session_lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().await
    }

    /// Read-only copy of the canonical state.
    pub async fn snapshot(&self) -> GameState {
        self.session.lock().await.game.clone()
    }

    /// Push the current snapshot to every connected peer. Called eagerly
    /// after every mutation and periodically by the sync broadcaster.
    pub async fn push_snapshot(&self) {
        let state = self.snapshot().await;
        self.transport.deliver(ServerMessage::StateUpdate { state });
    }

    /// Apply one input event. Runs to completion; phase-inappropriate
    /// messages are dropped silently (the sender self-corrects on the next
    /// snapshot).
    pub async fn dispatch(self: &Arc<Self>, event: Event) {
        match event {
            Event::Peer(PeerEvent::Connected { peer }) => {
                self.handle_peer_connected(&peer).await;
            }
            Event::Peer(PeerEvent::Disconnected { peer }) => {
                self.handle_peer_disconnected(&peer).await;
            }
            Event::Peer(PeerEvent::Message { peer, message }) => {
                self.handle_client_message(&peer, message).await;
            }
            Event::StartGame => {
                self.handle_start_game().await;
            }
            Event::TimerExpired { phase, generation } => {
                self.handle_timer_expired(phase, generation).await;
            }
        }
    }

    async fn handle_client_message(self: &Arc<Self>, peer: &str, message: ClientMessage) {
        match message {
            ClientMessage::Join { id, name, avatar } => {
                self.handle_join(&id, &name, &avatar).await;
            }
            ClientMessage::VoteCategory { category } => {
                self.handle_vote_category(peer, &category).await;
            }
            ClientMessage::SubmitAnswer { answer_index } => {
                self.handle_submit_answer(peer, answer_index).await;
            }
            ClientMessage::RequestNextStep => {
                self.handle_request_next_step(peer).await;
            }
            ClientMessage::RequestState => {
                // No mutation; just push. Doubles as a liveness probe.
                self.push_snapshot().await;
            }
        }
    }

    /// Register a background task for teardown.
    pub(crate) fn track_task(&self, task: JoinHandle<()>) {
        self.tasks
            .lock()
            .expect("task registry lock poisoned")
            .push(task);
    }

    /// Tear down the host side of the session: stop pending ticks and the
    /// background tasks so no stale callback fires against a dying state.
    pub fn shutdown(&self) {
        self.timer.cancel();
        let mut tasks = self.tasks.lock().expect("task registry lock poisoned");
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

//! Phase transitions and per-phase input handling.
//!
//! `LOBBY → CATEGORY_SELECTION → QUESTION ⇄ ANSWERS_REVEAL → LEVEL_COMPLETE`
//! repeats per level; after the last regular level a single blitz level
//! (larger count, mixed category, no vote) runs through the same
//! question/reveal loop before `GAME_OVER`.

use super::{Event, GameEngine};
use crate::engine::{score, vote};
use crate::types::{GamePhase, Question};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Category label for the blitz level; the supplier mixes topics freely.
const BLITZ_CATEGORY: &str = "Mixed";

#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("game has already started")]
    AlreadyStarted,
    #[error("cannot start with no players")]
    NoPlayers,
}

/// What a continue request should do, decided under the lock and executed
/// after releasing it.
enum Advance {
    NextQuestion(usize),
    LevelDone,
    NextLevel,
    Blitz,
    Finish,
    Ignore,
}

impl GameEngine {
    /// Host-initiated start trigger. Not part of the player message
    /// contract; arrives over the host HTTP endpoint. Validates up front so
    /// the caller can answer with an error, then feeds the actual
    /// transition through the dispatcher like every other input.
    pub async fn start_game(self: &Arc<Self>) -> Result<(), StartError> {
        self.check_can_start().await?;
        self.dispatch(Event::StartGame).await;
        Ok(())
    }

    async fn check_can_start(&self) -> Result<(), StartError> {
        let session = self.session_lock().await;
        if session.game.phase != GamePhase::Lobby {
            return Err(StartError::AlreadyStarted);
        }
        if session.game.players.is_empty() {
            return Err(StartError::NoPlayers);
        }
        Ok(())
    }

    /// Dispatcher arm for the start trigger. Re-checks the preconditions
    /// under the lock; a start racing another start is a logged no-op.
    pub(crate) async fn handle_start_game(self: &Arc<Self>) {
        if let Err(e) = self.check_can_start().await {
            tracing::warn!("Start trigger ignored: {}", e);
            return;
        }
        self.enter_category_selection().await;
    }

    /// Record or overwrite the sender's category vote. Last write wins; a
    /// player may change their mind until the countdown ends.
    pub(crate) async fn handle_vote_category(self: &Arc<Self>, peer: &str, category: &str) {
        let mutated = {
            let mut session = self.session_lock().await;
            if session.game.phase != GamePhase::CategorySelection {
                tracing::debug!("Dropping vote from {} outside category selection", peer);
                false
            } else if !session
                .game
                .available_categories
                .iter()
                .any(|c| c == category)
            {
                tracing::debug!("Dropping vote from {} for unoffered category", peer);
                false
            } else if let Some(player) = session.game.player_mut(peer) {
                player.selected_category = Some(category.to_string());
                player.last_action_at = Some(Utc::now());
                true
            } else {
                tracing::debug!("Dropping vote from unknown peer {}", peer);
                false
            }
        };
        if mutated {
            self.push_snapshot().await;
        }
    }

    /// Record or overwrite the sender's answer for the current question.
    pub(crate) async fn handle_submit_answer(self: &Arc<Self>, peer: &str, answer_index: usize) {
        let mutated = {
            let mut session = self.session_lock().await;
            if session.game.phase != GamePhase::Question {
                tracing::debug!("Dropping answer from {} outside question phase", peer);
                false
            } else if session
                .game
                .current_question
                .as_ref()
                .map_or(true, |q| answer_index >= q.options.len())
            {
                tracing::debug!("Dropping out-of-range answer from {}", peer);
                false
            } else if let Some(player) = session.game.player_mut(peer) {
                player.current_answer = Some(answer_index);
                player.last_action_at = Some(Utc::now());
                true
            } else {
                false
            }
        };
        if mutated {
            self.push_snapshot().await;
        }
    }

    /// Advance past a reveal or level-complete screen on the first request
    /// processed. Waiting for consensus would deadlock on a disconnected
    /// player, so one press moves everyone; a short debounce after each
    /// phase entry keeps a burst of presses from skipping ahead twice.
    pub(crate) async fn handle_request_next_step(self: &Arc<Self>, peer: &str) {
        let action = {
            let session = self.session_lock().await;
            let debounce = Duration::from_millis(self.config().continue_debounce_ms);
            if session.game.loading {
                Advance::Ignore
            } else if session.phase_entered_at.elapsed() < debounce {
                tracing::debug!("Debouncing continue request from {}", peer);
                Advance::Ignore
            } else {
                match session.game.phase {
                    GamePhase::AnswersReveal => {
                        let next = session.game.current_question_index + 1;
                        if next < session.game.total_questions_in_level {
                            Advance::NextQuestion(next)
                        } else {
                            Advance::LevelDone
                        }
                    }
                    GamePhase::LevelComplete => {
                        if session.game.in_blitz_level() {
                            Advance::Finish
                        } else if session.game.current_level == session.game.total_levels {
                            Advance::Blitz
                        } else {
                            Advance::NextLevel
                        }
                    }
                    _ => {
                        tracing::debug!("Dropping continue request from {} in current phase", peer);
                        Advance::Ignore
                    }
                }
            }
        };

        match action {
            Advance::NextQuestion(index) => self.enter_question(index).await,
            Advance::LevelDone => self.enter_level_complete().await,
            Advance::NextLevel => {
                {
                    let mut session = self.session_lock().await;
                    session.game.current_level += 1;
                }
                self.enter_category_selection().await;
            }
            Advance::Blitz => self.begin_blitz_level().await,
            Advance::Finish => self.enter_game_over().await,
            Advance::Ignore => {}
        }
    }

    /// Resolution callback path for expired countdowns. A generation or
    /// phase mismatch means the timer was superseded; the event is a no-op.
    pub(crate) async fn handle_timer_expired(
        self: &Arc<Self>,
        phase: GamePhase,
        generation: u64,
    ) {
        if generation != self.timer().current_generation() {
            tracing::debug!("Ignoring stale timer expiry (generation {})", generation);
            return;
        }
        let current = self.session_lock().await.game.phase;
        if current != phase {
            tracing::debug!("Ignoring timer expiry for left phase {:?}", phase);
            return;
        }
        match phase {
            GamePhase::CategorySelection => self.resolve_category_and_fetch().await,
            GamePhase::Question => self.enter_answers_reveal().await,
            _ => {}
        }
    }

    pub(crate) async fn enter_category_selection(self: &Arc<Self>) {
        let level = {
            let mut session = self.session_lock().await;
            session.game.phase = GamePhase::CategorySelection;
            session.game.current_question = None;
            session.game.current_question_index = 0;
            session.game.total_questions_in_level = 0;
            session.game.time_remaining = 0;
            session.game.loading = true;
            session.game.loading_message = Some("Picking categories...".to_string());
            for player in &mut session.game.players {
                player.selected_category = None;
            }
            session.phase_entered_at = Instant::now();
            session.game.current_level
        };
        self.push_snapshot().await;

        let mut categories = self.supplier().generate_categories(level).await;
        if categories.is_empty() {
            categories = crate::supplier::fallback_categories(level);
        }

        {
            let mut session = self.session_lock().await;
            session.game.available_categories = categories;
            session.game.loading = false;
            session.game.loading_message = None;
            session.game.time_remaining = self.config().category_vote_seconds;
            session.phase_entered_at = Instant::now();
        }
        self.push_snapshot().await;
        self.timer().start(self.clone(), GamePhase::CategorySelection);
    }

    /// Category countdown hit zero: tally the votes, fetch the level's
    /// questions and start the first round.
    async fn resolve_category_and_fetch(self: &Arc<Self>) {
        let winner = {
            let session = self.session_lock().await;
            vote::resolve_winning_category(
                &session.game.players,
                &session.game.available_categories,
            )
        };
        let Some(winner) = winner else {
            // Nothing on offer at all; never advance into an empty round.
            self.enter_level_complete().await;
            return;
        };
        tracing::info!("Category vote resolved: {}", winner);

        {
            let mut session = self.session_lock().await;
            session.game.time_remaining = 0;
            session.game.loading = true;
            session.game.loading_message = Some(format!("Generating {} questions...", winner));
        }
        self.push_snapshot().await;

        let questions = self
            .fetcher()
            .fetch(&winner, self.config().questions_per_level, false)
            .await;
        self.install_level(questions).await;
    }

    /// The blitz level skips category selection: mixed topics, larger
    /// question count, straight into the question loop.
    async fn begin_blitz_level(self: &Arc<Self>) {
        {
            let mut session = self.session_lock().await;
            session.game.current_level += 1;
            session.game.available_categories = Vec::new();
            session.game.loading = true;
            session.game.loading_message = Some("Get ready for the blitz round...".to_string());
        }
        self.push_snapshot().await;

        let questions = self
            .fetcher()
            .fetch(BLITZ_CATEGORY, self.config().blitz_question_count, true)
            .await;
        self.install_level(questions).await;
    }

    /// Adopt a freshly fetched set of questions as the current level. The
    /// level length comes from what was actually returned, so a degraded
    /// supplier shortens the level instead of stalling the game.
    async fn install_level(self: &Arc<Self>, questions: Vec<Question>) {
        if questions.is_empty() {
            tracing::warn!("No questions available, routing to level complete");
            self.enter_level_complete().await;
            return;
        }
        {
            let mut session = self.session_lock().await;
            session.game.total_questions_in_level = questions.len();
            session.queue = questions;
        }
        self.enter_question(0).await;
    }

    async fn enter_question(self: &Arc<Self>, index: usize) {
        let question = {
            let session = self.session_lock().await;
            session.queue.get(index).cloned()
        };
        let Some(question) = question else {
            self.enter_level_complete().await;
            return;
        };

        {
            let mut session = self.session_lock().await;
            for player in &mut session.game.players {
                player.current_answer = None;
                player.round_score = 0;
            }
            session.game.current_question_index = index;
            session.game.current_question = Some(question);
            session.game.time_remaining = self.config().question_seconds;
            session.game.phase = GamePhase::Question;
            session.game.loading = false;
            session.game.loading_message = None;
            session.phase_entered_at = Instant::now();
        }
        self.push_snapshot().await;
        self.timer().start(self.clone(), GamePhase::Question);
    }

    /// Question countdown hit zero: score everyone, freeze the clock.
    async fn enter_answers_reveal(self: &Arc<Self>) {
        self.timer().cancel();
        {
            let mut session = self.session_lock().await;
            if session.game.phase != GamePhase::Question {
                return;
            }
            if let Some(question) = session.game.current_question.clone() {
                score::apply_round_scores(
                    &mut session.game.players,
                    &question,
                    self.config().points_correct,
                );
            }
            session.game.time_remaining = 0;
            session.game.phase = GamePhase::AnswersReveal;
            session.phase_entered_at = Instant::now();
        }
        self.push_snapshot().await;
    }

    async fn enter_level_complete(self: &Arc<Self>) {
        self.timer().cancel();
        {
            let mut session = self.session_lock().await;
            session.game.phase = GamePhase::LevelComplete;
            session.game.current_question = None;
            session.game.time_remaining = 0;
            session.game.loading = false;
            session.game.loading_message = None;
            session.phase_entered_at = Instant::now();
        }
        self.push_snapshot().await;
    }

    /// Terminal phase; no further player actions are accepted.
    async fn enter_game_over(self: &Arc<Self>) {
        self.timer().cancel();
        {
            let mut session = self.session_lock().await;
            session.game.phase = GamePhase::GameOver;
            session.game.current_question = None;
            session.game.time_remaining = 0;
            session.game.winner_id = score::session_winner(&session.game.players);
            session.phase_entered_at = Instant::now();
        }
        self.push_snapshot().await;
    }
}

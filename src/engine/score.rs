//! Per-round scoring, applied once when a question round resolves.

use crate::types::{Player, PlayerId, Question};

/// Score every player for the question just revealed.
///
/// A correct answer is worth exactly `points_correct`; a wrong answer and
/// no answer both score zero. No partial credit, no time bonus. The round
/// delta is kept on the player so peers can show it on the reveal screen.
pub fn apply_round_scores(players: &mut [Player], question: &Question, points_correct: u32) {
    for player in players.iter_mut() {
        player.round_score = if player.current_answer == Some(question.correct_index) {
            points_correct
        } else {
            0
        };
        player.score += player.round_score;
    }
}

/// Pick the session winner: highest cumulative score, ties broken by join
/// order (the `players` slice is ordered by join time).
pub fn session_winner(players: &[Player]) -> Option<PlayerId> {
    // Strict comparison keeps the earliest joiner on a tie.
    players
        .iter()
        .fold(None::<&Player>, |best, p| match best {
            Some(b) if p.score > b.score => Some(p),
            None => Some(p),
            _ => best,
        })
        .map(|p| p.id.clone())
}

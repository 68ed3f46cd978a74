use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type PlayerId = String;

/// Maximum length of a player display name (characters, not bytes)
pub const MAX_NAME_CHARS: usize = 10;

/// Avatars players can pick from. Anything outside this set is replaced
/// with the first entry on join.
pub const AVATARS: &[&str] = &["🦊", "🐸", "🐙", "🦉", "🐼", "🦁", "🐧", "🦄"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Lobby,
    CategorySelection,
    Question,
    AnswersReveal,
    LevelComplete,
    GameOver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub max_players: usize,
    /// Number of regular levels; the blitz level runs after the last one.
    pub total_levels: u32,
    pub questions_per_level: usize,
    pub blitz_question_count: usize,
    pub category_vote_seconds: u32,
    pub question_seconds: u32,
    pub points_correct: u32,
    /// Interval of the periodic full-state sync push, in milliseconds.
    pub sync_interval_ms: u64,
    /// Window after a phase entry during which further continue requests
    /// are ignored (burst of players pressing the button at once).
    pub continue_debounce_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            total_levels: 3,
            questions_per_level: 5,
            blitz_question_count: 10,
            category_vote_seconds: 15,
            question_seconds: 20,
            points_correct: 100,
            sync_interval_ms: 2000,
            continue_debounce_ms: 500,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl GameConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_players: env_parse("QUIZBOX_MAX_PLAYERS").unwrap_or(defaults.max_players),
            total_levels: env_parse("QUIZBOX_TOTAL_LEVELS").unwrap_or(defaults.total_levels),
            questions_per_level: env_parse("QUIZBOX_QUESTIONS_PER_LEVEL")
                .unwrap_or(defaults.questions_per_level),
            blitz_question_count: env_parse("QUIZBOX_BLITZ_QUESTIONS")
                .unwrap_or(defaults.blitz_question_count),
            category_vote_seconds: env_parse("QUIZBOX_VOTE_SECONDS")
                .unwrap_or(defaults.category_vote_seconds),
            question_seconds: env_parse("QUIZBOX_QUESTION_SECONDS")
                .unwrap_or(defaults.question_seconds),
            points_correct: env_parse("QUIZBOX_POINTS_CORRECT").unwrap_or(defaults.points_correct),
            sync_interval_ms: env_parse("QUIZBOX_SYNC_INTERVAL_MS")
                .unwrap_or(defaults.sync_interval_ms),
            continue_debounce_ms: env_parse("QUIZBOX_CONTINUE_DEBOUNCE_MS")
                .unwrap_or(defaults.continue_debounce_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Player-generated stable identifier, reused across reconnects.
    pub id: PlayerId,
    pub name: String,
    pub avatar: String,
    /// Cumulative score, monotonically non-decreasing within a session.
    pub score: u32,
    /// Delta from the most recently resolved round, reset each round.
    pub round_score: u32,
    pub selected_category: Option<String>,
    pub current_answer: Option<usize>,
    /// Timestamp of the last vote/answer, used only for tie-breaking.
    pub last_action_at: Option<DateTime<Utc>>,
    /// Whether the peer behind this player is currently connected. Never
    /// gates message handling; peers use it to grey out avatars.
    pub connected: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: &str, avatar: &str) -> Self {
        Self {
            id,
            name: sanitize_name(name),
            avatar: sanitize_avatar(avatar),
            score: 0,
            round_score: 0,
            selected_category: None,
            current_answer: None,
            last_action_at: None,
            connected: true,
        }
    }
}

/// Truncate a display name to the allowed length.
pub fn sanitize_name(name: &str) -> String {
    name.trim().chars().take(MAX_NAME_CHARS).collect()
}

/// Clamp an avatar to the fixed set.
pub fn sanitize_avatar(avatar: &str) -> String {
    if AVATARS.contains(&avatar) {
        avatar.to_string()
    } else {
        AVATARS[0].to_string()
    }
}

/// A single quiz question. Immutable once generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    /// Exactly 4 answer options (validated by the fetcher).
    pub options: Vec<String>,
    pub correct_index: usize,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// The single canonical, host-owned aggregate. Created once at session
/// start, mutated only by the engine, replicated read-only to all peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub phase: GamePhase,
    /// Players ordered by join time.
    pub players: Vec<Player>,
    pub current_level: u32,
    pub total_levels: u32,
    pub current_question_index: usize,
    pub total_questions_in_level: usize,
    pub current_question: Option<Question>,
    pub available_categories: Vec<String>,
    /// Seconds left in the current timed phase, non-increasing within it.
    pub time_remaining: u32,
    /// Set only in the terminal phase.
    pub winner_id: Option<PlayerId>,
    /// Host-side busy indicator, replicated so peers can show a spinner.
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loading_message: Option<String>,
}

impl GameState {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            phase: GamePhase::Lobby,
            players: Vec::new(),
            current_level: 1,
            total_levels: config.total_levels,
            current_question_index: 0,
            total_questions_in_level: 0,
            current_question: None,
            available_categories: Vec::new(),
            time_remaining: 0,
            winner_id: None,
            loading: false,
            loading_message: None,
        }
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// The blitz level is the one past the last regular level.
    pub fn in_blitz_level(&self) -> bool {
        self.current_level > self.total_levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_from_env_overrides_fields() {
        std::env::set_var("QUIZBOX_MAX_PLAYERS", "4");
        std::env::set_var("QUIZBOX_CONTINUE_DEBOUNCE_MS", "250");
        let config = GameConfig::from_env();
        assert_eq!(config.max_players, 4);
        assert_eq!(config.continue_debounce_ms, 250);
        std::env::remove_var("QUIZBOX_MAX_PLAYERS");
        std::env::remove_var("QUIZBOX_CONTINUE_DEBOUNCE_MS");
    }

    #[test]
    #[serial]
    fn test_config_from_env_falls_back_on_garbage() {
        std::env::set_var("QUIZBOX_CONTINUE_DEBOUNCE_MS", "soon");
        let config = GameConfig::from_env();
        assert_eq!(
            config.continue_debounce_ms,
            GameConfig::default().continue_debounce_ms
        );
        std::env::remove_var("QUIZBOX_CONTINUE_DEBOUNCE_MS");
    }

    #[test]
    fn test_sanitize_name_truncates() {
        assert_eq!(sanitize_name("Bartholomew III"), "Bartholome");
        assert_eq!(sanitize_name("  Ada "), "Ada");
    }

    #[test]
    fn test_sanitize_avatar_clamps_unknown() {
        assert_eq!(sanitize_avatar("🦊"), "🦊");
        assert_eq!(sanitize_avatar("<script>"), AVATARS[0]);
    }

    #[test]
    fn test_new_state_starts_in_lobby() {
        let state = GameState::new(&GameConfig::default());
        assert_eq!(state.phase, GamePhase::Lobby);
        assert!(state.players.is_empty());
        assert_eq!(state.current_level, 1);
        assert!(!state.in_blitz_level());
    }
}

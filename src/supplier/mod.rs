//! Content generation boundary.
//!
//! The engine consumes quiz content through [`ContentSupplier`] and nothing
//! else. Implementations must fail open: whatever happens upstream, both
//! methods return something usable. The engine has no retry or backoff of
//! its own beyond the fetcher's bounded loop, so this resilience is
//! load-bearing.

mod openai;

use crate::types::Question;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use openai::OpenAiSupplier;

/// Result type for supplier-internal operations
pub type SupplierResult<T> = Result<T, SupplierError>;

/// Errors inside a supplier implementation. These never cross the trait
/// boundary; implementations catch them and fall back.
#[derive(Debug, thiserror::Error)]
pub enum SupplierError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Response parsing failed: {0}")]
    ParseError(String),
}

/// Source of categories and questions.
#[async_trait]
pub trait ContentSupplier: Send + Sync {
    /// Candidate category names for a level. Never empty in practice;
    /// the engine still guards against an empty return.
    async fn generate_categories(&self, level: u32) -> Vec<String>;

    /// Question candidates for a category. `is_blitz` asks for mixed
    /// topics regardless of the category label. May return duplicates or
    /// fewer than `count`; the dedup fetcher deals with both.
    async fn generate_questions(&self, category: &str, count: usize, is_blitz: bool)
        -> Vec<Question>;

    fn name(&self) -> &str;
}

/// Configuration for the content supplier
#[derive(Debug, Clone)]
pub struct SupplierConfig {
    /// OpenAI API key; without one the built-in bank is used
    pub openai_api_key: Option<String>,
    /// OpenAI model to use
    pub openai_model: String,
    /// Timeout per generation request
    pub timeout: Duration,
}

impl Default for SupplierConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

impl SupplierConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok().and_then(|key| {
            let trimmed = key.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        });

        let openai_model = std::env::var("OPENAI_MODEL")
            .ok()
            .and_then(|model| {
                let trimmed = model.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| "gpt-4o-mini".to_string());

        Self {
            openai_api_key,
            openai_model,
            timeout: std::env::var("SUPPLIER_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(20)),
        }
    }

    /// Build the supplier this host will use: the LLM-backed one when a key
    /// is configured, otherwise the built-in bank.
    pub fn build(&self) -> Arc<dyn ContentSupplier> {
        match &self.openai_api_key {
            Some(api_key) => {
                tracing::info!("Using OpenAI supplier (model {})", self.openai_model);
                Arc::new(OpenAiSupplier::new(
                    api_key.clone(),
                    self.openai_model.clone(),
                    self.timeout,
                ))
            }
            None => {
                tracing::info!("No OPENAI_API_KEY set, using built-in question bank");
                Arc::new(FallbackSupplier::new())
            }
        }
    }
}

/// Fixed category pool for the fallback path. Four are offered per level,
/// rotating so consecutive levels see different sets.
const FALLBACK_CATEGORIES: &[&str] = &[
    "General Knowledge",
    "Science",
    "History",
    "Geography",
    "Movies",
    "Music",
    "Sports",
    "Food & Drink",
];

const CATEGORIES_PER_LEVEL: usize = 4;

/// Categories offered for a level when no generated ones are available.
pub fn fallback_categories(level: u32) -> Vec<String> {
    let offset = (level.saturating_sub(1) as usize * CATEGORIES_PER_LEVEL) % FALLBACK_CATEGORIES.len();
    (0..CATEGORIES_PER_LEVEL)
        .map(|i| FALLBACK_CATEGORIES[(offset + i) % FALLBACK_CATEGORIES.len()].to_string())
        .collect()
}

/// Built-in question bank: (category, text, options, correct index).
const FALLBACK_QUESTIONS: &[(&str, &str, [&str; 4], usize)] = &[
    (
        "Science",
        "Which planet is known as the red planet?",
        ["Venus", "Jupiter", "Mars", "Mercury"],
        2,
    ),
    (
        "Science",
        "What gas do plants primarily absorb for photosynthesis?",
        ["Oxygen", "Carbon dioxide", "Nitrogen", "Helium"],
        1,
    ),
    (
        "Science",
        "How many bones does an adult human body have?",
        ["186", "206", "226", "246"],
        1,
    ),
    (
        "History",
        "In which year did the Berlin Wall fall?",
        ["1987", "1989", "1991", "1993"],
        1,
    ),
    (
        "History",
        "Who was the first person to walk on the Moon?",
        ["Buzz Aldrin", "Yuri Gagarin", "Neil Armstrong", "John Glenn"],
        2,
    ),
    (
        "Geography",
        "What is the longest river in the world?",
        ["Amazon", "Nile", "Yangtze", "Mississippi"],
        1,
    ),
    (
        "Geography",
        "Which country has the most time zones?",
        ["Russia", "USA", "China", "France"],
        3,
    ),
    (
        "Movies",
        "Which film won the first Academy Award for Best Picture?",
        ["Wings", "Sunrise", "Metropolis", "The Jazz Singer"],
        0,
    ),
    (
        "Music",
        "How many strings does a standard violin have?",
        ["Three", "Four", "Five", "Six"],
        1,
    ),
    (
        "Sports",
        "How often are the Summer Olympic Games held?",
        ["Every 2 years", "Every 3 years", "Every 4 years", "Every 5 years"],
        2,
    ),
    (
        "Food & Drink",
        "Which country is the origin of the dish paella?",
        ["Italy", "Portugal", "Mexico", "Spain"],
        3,
    ),
    (
        "General Knowledge",
        "How many colors are in a rainbow?",
        ["Five", "Six", "Seven", "Eight"],
        2,
    ),
];

/// Supplier backed by the built-in bank. Used when no LLM is configured
/// and as the fallback inside the LLM-backed supplier.
pub struct FallbackSupplier;

impl FallbackSupplier {
    pub fn new() -> Self {
        Self
    }

    /// Bank questions for a category, the category-matching ones first so
    /// small requests stay on topic. Blitz requests take the whole bank.
    pub(crate) fn bank_questions(category: &str, count: usize, is_blitz: bool) -> Vec<Question> {
        let to_question = |&(cat, text, options, correct): &(
            &str,
            &str,
            [&str; 4],
            usize,
        )| Question {
            text: text.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_index: correct,
            category: cat.to_string(),
            explanation: None,
        };

        let mut questions: Vec<Question> = if is_blitz {
            FALLBACK_QUESTIONS.iter().map(to_question).collect()
        } else {
            let mut matching: Vec<Question> = FALLBACK_QUESTIONS
                .iter()
                .filter(|(cat, ..)| *cat == category)
                .map(to_question)
                .collect();
            let rest = FALLBACK_QUESTIONS
                .iter()
                .filter(|(cat, ..)| *cat != category)
                .map(to_question);
            matching.extend(rest);
            matching
        };

        questions.truncate(count);
        questions
    }
}

impl Default for FallbackSupplier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentSupplier for FallbackSupplier {
    async fn generate_categories(&self, level: u32) -> Vec<String> {
        fallback_categories(level)
    }

    async fn generate_questions(
        &self,
        category: &str,
        count: usize,
        is_blitz: bool,
    ) -> Vec<Question> {
        Self::bank_questions(category, count, is_blitz)
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

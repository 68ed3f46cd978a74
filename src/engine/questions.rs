//! Dedup question fetching on top of the content supplier.
//!
//! The fetcher keeps a session-scoped registry of normalized question texts
//! so no two questions with the same text are ever served twice, no matter
//! how repetitive the supplier gets.

use crate::supplier::ContentSupplier;
use crate::types::Question;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Retry ceiling for supplier calls per fetch. Bounds the delay a flaky
/// supplier can introduce; whatever was gathered by then is returned.
const MAX_FETCH_ATTEMPTS: usize = 3;

/// Minimum candidates requested per attempt, to amortize duplicate
/// collisions when only one or two questions are still missing.
const MIN_BATCH: usize = 4;

pub struct QuestionFetcher {
    supplier: Arc<dyn ContentSupplier>,
    seen: Mutex<HashSet<String>>,
}

/// Key used for the uniqueness registry.
fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn has_valid_shape(question: &Question) -> bool {
    question.options.len() == 4
        && question.correct_index < question.options.len()
        && !question.text.trim().is_empty()
}

impl QuestionFetcher {
    pub fn new(supplier: Arc<dyn ContentSupplier>) -> Self {
        Self {
            supplier,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Gather up to `total_needed` unique questions for a category.
    ///
    /// May return fewer than requested when the retry ceiling is reached;
    /// the caller derives the level length from the actual result and must
    /// tolerate a shorter-than-planned level. A content outage therefore
    /// degrades to a short (possibly empty) level, never a stall.
    pub async fn fetch(
        &self,
        category: &str,
        total_needed: usize,
        is_blitz: bool,
    ) -> Vec<Question> {
        let mut accepted: Vec<Question> = Vec::with_capacity(total_needed);

        for attempt in 1..=MAX_FETCH_ATTEMPTS {
            let still_needed = total_needed - accepted.len();
            if still_needed == 0 {
                break;
            }

            let batch = self
                .supplier
                .generate_questions(category, still_needed.max(MIN_BATCH), is_blitz)
                .await;

            let mut seen = self.seen.lock().await;
            for question in batch {
                if accepted.len() == total_needed {
                    break;
                }
                if !has_valid_shape(&question) {
                    tracing::warn!("Dropping malformed question: {:?}", question.text);
                    continue;
                }
                if seen.insert(normalize(&question.text)) {
                    accepted.push(question);
                }
            }
            drop(seen);

            tracing::debug!(
                "Fetch attempt {}/{} for '{}': {}/{} unique",
                attempt,
                MAX_FETCH_ATTEMPTS,
                category,
                accepted.len(),
                total_needed
            );
        }

        if accepted.len() < total_needed {
            tracing::warn!(
                "Supplier yielded only {}/{} unique questions for '{}'",
                accepted.len(),
                total_needed,
                category
            );
        }

        accepted
    }
}

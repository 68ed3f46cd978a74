//! Category vote resolution.
//!
//! Pure function over a snapshot of the players so it can be tested without
//! an engine, and so repeated calls with identical inputs always agree.

use crate::types::Player;
use chrono::{DateTime, Utc};
use rand::prelude::*;
use std::collections::HashMap;

/// Resolve the winning category from the players' votes.
///
/// One vote per player with a non-empty `selected_category`. No votes at
/// all picks uniformly at random among the offered categories, so total
/// inaction never blocks progress. Otherwise the highest vote count wins;
/// an exact tie goes to the tied category whose earliest voter acted first.
///
/// Returns `None` only when `categories` is empty.
pub fn resolve_winning_category(players: &[Player], categories: &[String]) -> Option<String> {
    if categories.is_empty() {
        return None;
    }

    // Tally: vote count + earliest voter timestamp per offered category.
    // Votes for categories not on offer are ignored.
    let mut tallies: HashMap<&str, (u32, DateTime<Utc>)> = HashMap::new();
    for player in players {
        let Some(category) = player.selected_category.as_deref() else {
            continue;
        };
        if !categories.iter().any(|c| c == category) {
            continue;
        }
        let ts = player.last_action_at.unwrap_or(DateTime::<Utc>::MAX_UTC);
        tallies
            .entry(category)
            .and_modify(|(count, earliest)| {
                *count += 1;
                if ts < *earliest {
                    *earliest = ts;
                }
            })
            .or_insert((1, ts));
    }

    if tallies.is_empty() {
        let mut rng = rand::rng();
        return categories.choose(&mut rng).cloned();
    }

    // Walk the offered list in order so equal (count, timestamp) pairs
    // resolve the same way every call.
    let mut winner: Option<(&str, u32, DateTime<Utc>)> = None;
    for category in categories {
        let Some(&(count, earliest)) = tallies.get(category.as_str()) else {
            continue;
        };
        let better = match winner {
            None => true,
            Some((_, best_count, best_earliest)) => {
                count > best_count || (count == best_count && earliest < best_earliest)
            }
        };
        if better {
            winner = Some((category, count, earliest));
        }
    }

    winner.map(|(category, _, _)| category.to_string())
}

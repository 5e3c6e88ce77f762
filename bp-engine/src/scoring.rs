//! Severity ranking.

use std::cmp::Reverse;

use bp_core::Suggestion;

/// Stable sort by severity rank, highest first. Equal severities keep their
/// rule-evaluation order.
pub fn rank_suggestions(mut suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    rank_in_place(&mut suggestions);
    suggestions
}

pub fn rank_in_place(suggestions: &mut [Suggestion]) {
    suggestions.sort_by_key(|suggestion| Reverse(suggestion.severity.rank()));
}

//! Treatment outcome aggregation.

use bp_core::{TreatmentAnalysis, TreatmentEpisode, TreatmentOutcome};

/// Count episodes that did not improve.
///
/// Episodes must already be in chronological order; the last one supplies
/// `last_outcome`. An unset outcome counts as no improvement.
pub fn analyze_treatments(episodes: &[TreatmentEpisode]) -> TreatmentAnalysis {
    if episodes.is_empty() {
        return TreatmentAnalysis {
            notes: vec!["No treatments recorded.".to_string()],
            ..TreatmentAnalysis::default()
        };
    }

    let total = episodes.len();
    let no_improvement = episodes
        .iter()
        .filter(|episode| episode.outcome != Some(TreatmentOutcome::Improved))
        .count();
    let majority_no_improvement = no_improvement > total / 2;

    let mut notes = vec![format!(
        "{no_improvement} of {total} treatment episode(s) without documented improvement."
    )];
    if majority_no_improvement {
        notes.push("Majority of treatments show no improvement.".to_string());
    }

    TreatmentAnalysis {
        total,
        no_improvement,
        last_outcome: episodes.last().and_then(|episode| episode.outcome),
        majority_no_improvement,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episodes(outcomes: &[Option<TreatmentOutcome>]) -> Vec<TreatmentEpisode> {
        outcomes
            .iter()
            .enumerate()
            .map(|(index, outcome)| TreatmentEpisode::new(format!("Episode {index}"), *outcome))
            .collect()
    }

    #[test]
    fn unset_and_worse_count_as_no_improvement() {
        let analysis = analyze_treatments(&episodes(&[
            Some(TreatmentOutcome::Worse),
            None,
            Some(TreatmentOutcome::Improved),
        ]));
        assert_eq!(analysis.total, 3);
        assert_eq!(analysis.no_improvement, 2);
        assert!(analysis.majority_no_improvement);
        assert_eq!(analysis.last_outcome, Some(TreatmentOutcome::Improved));
    }

    #[test]
    fn majority_uses_floor_division() {
        let analysis = analyze_treatments(&episodes(&[
            Some(TreatmentOutcome::NoChange),
            Some(TreatmentOutcome::Improved),
            Some(TreatmentOutcome::Improved),
        ]));
        assert_eq!(analysis.no_improvement, 1);
        assert!(!analysis.majority_no_improvement);

        let even = analyze_treatments(&episodes(&[
            Some(TreatmentOutcome::NoChange),
            Some(TreatmentOutcome::Improved),
        ]));
        assert!(!even.majority_no_improvement);
    }

    #[test]
    fn empty_input_has_note() {
        let analysis = analyze_treatments(&[]);
        assert_eq!(analysis.total, 0);
        assert_eq!(analysis.no_improvement, 0);
        assert!(analysis.last_outcome.is_none());
        assert_eq!(analysis.notes, vec!["No treatments recorded.".to_string()]);
    }
}

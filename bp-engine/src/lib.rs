//! Deterministic suggestion engine: profile snapshot in, ranked suggestions out.
//!
//! Evaluation is pure and synchronous. The four analyzers are independent,
//! their outputs feed the ordered rule set, and the scorer ranks the result by
//! severity.

pub mod alerts;
pub mod appointments;
pub mod prescriptions;
pub mod rules;
pub mod scoring;
pub mod treatments;
pub mod vitals;

use bp_core::{
    AdvisorError, EngineConfig, Evaluation, PatientProfile, Suggestion, SuggestionSource,
};
use serde::Deserialize;
use serde_json::Value;

pub use alerts::{classify_reading, reading_alert, scan_alerts};
pub use appointments::analyze_appointments;
pub use prescriptions::analyze_prescriptions;
pub use rules::{default_rules, evaluate_rules, Rule, RuleContext};
pub use scoring::rank_suggestions;
pub use treatments::analyze_treatments;
pub use vitals::analyze_vitals;

/// Rule-based implementation of [`SuggestionSource`].
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    /// Engine over a custom rule list, evaluated in the given order.
    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Run the analyzers and rules, returning the full report.
    pub fn evaluate_report(&self, profile: &PatientProfile, config: &EngineConfig) -> Evaluation {
        let vitals = analyze_vitals(&profile.vitals);
        let prescriptions = analyze_prescriptions(&profile.prescriptions, Some(profile.as_of));
        let treatments = analyze_treatments(&profile.treatments);
        let appointments = analyze_appointments(&profile.appointments);

        let ctx = RuleContext {
            vitals: &vitals,
            prescriptions: &prescriptions,
            treatments: &treatments,
            appointments: &appointments,
            config,
        };
        let suggestions = rank_suggestions(evaluate_rules(&self.rules, &ctx));

        tracing::info!(
            patient_id = %profile.patient_id,
            readings = vitals.count,
            prescriptions = prescriptions.total,
            suggestions = suggestions.len(),
            "Profile evaluated"
        );

        Evaluation {
            patient_id: profile.patient_id.clone(),
            as_of: profile.as_of,
            vitals,
            prescriptions,
            treatments,
            appointments,
            suggestions,
        }
    }

    /// Ranked suggestions only.
    pub fn evaluate(&self, profile: &PatientProfile, config: &EngineConfig) -> Vec<Suggestion> {
        self.evaluate_report(profile, config).suggestions
    }
}

impl SuggestionSource for RuleEngine {
    fn name(&self) -> &str {
        "rules"
    }

    fn suggest(
        &self,
        profile: &PatientProfile,
        config: &EngineConfig,
    ) -> Result<Vec<Suggestion>, AdvisorError> {
        Ok(self.evaluate(profile, config))
    }
}

/// Evaluate a profile with the default rule set.
pub fn evaluate_profile(profile: &PatientProfile, config: &EngineConfig) -> Vec<Suggestion> {
    RuleEngine::new().evaluate(profile, config)
}

/// Parse a profile from a JSON string and evaluate it.
pub fn evaluate_profile_str(
    profile_json: &str,
    config: &EngineConfig,
) -> Result<Evaluation, AdvisorError> {
    let value: Value =
        serde_json::from_str(profile_json).map_err(|err| AdvisorError::Parse(err.to_string()))?;
    evaluate_profile_value(&value, config)
}

/// Evaluate a profile given as a `serde_json::Value`.
pub fn evaluate_profile_value(
    profile: &Value,
    config: &EngineConfig,
) -> Result<Evaluation, AdvisorError> {
    let profile = parse_profile_value(profile)?;
    Ok(RuleEngine::new().evaluate_report(&profile, config))
}

/// Deserialize a profile, rejecting anything that is not a JSON object with `as_of`.
pub fn parse_profile_value(profile: &Value) -> Result<PatientProfile, AdvisorError> {
    let object = profile.as_object().ok_or(AdvisorError::MissingData)?;
    if !object.contains_key("as_of") {
        return Err(AdvisorError::MissingData);
    }
    PatientProfile::deserialize(profile).map_err(|err| AdvisorError::Parse(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_core::{PrescriptionRecord, Reading, Severity};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn empty_profile_yields_no_suggestions() {
        let profile = PatientProfile::new("1", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let report = RuleEngine::new().evaluate_report(&profile, &EngineConfig::default());
        assert!(report.suggestions.is_empty());
        assert_eq!(report.vitals.count, 0);
        assert_eq!(report.treatments.notes, vec!["No treatments recorded.".to_string()]);
    }

    #[test]
    fn results_are_ranked_by_severity() {
        let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut profile = PatientProfile::new("9", as_of);
        profile.vitals = vec![
            Reading::new(180, 110, Some(as_of - Duration::days(2))),
            Reading::new(170, 105, Some(as_of - Duration::days(1))),
            Reading::new(165, 101, Some(as_of)),
        ];
        profile.prescriptions =
            vec![PrescriptionRecord::new("Amlodipine", as_of - Duration::days(20))];

        let suggestions = evaluate_profile(&profile, &EngineConfig::default());
        let ids: Vec<&str> = suggestions.iter().map(|s| s.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["R002", "R006", "R004"]);
        assert_eq!(suggestions[2].severity, Severity::Low);
    }

    #[test]
    fn oversized_prescription_duration_is_evaluated() {
        let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut profile = PatientProfile::new("3", as_of);
        profile.vitals = vec![Reading::new(150, 92, Some(as_of))];
        profile.prescriptions = vec![
            PrescriptionRecord::new("Lisinopril", as_of - Duration::days(60))
                .with_duration_days(u32::MAX),
        ];

        let report = RuleEngine::new().evaluate_report(&profile, &EngineConfig::default());
        assert!(report.prescriptions.entries[0].active);
        assert_eq!(report.prescriptions.entries[0].duration_days, 60);
        assert!(report.suggestions.iter().any(|s| s.rule_id == "R002"));
    }

    #[test]
    fn rule_engine_is_a_source() {
        let profile = PatientProfile::new("1", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let engine = RuleEngine::default();
        let source: &dyn SuggestionSource = &engine;
        assert_eq!(source.name(), "rules");
        assert!(source
            .suggest(&profile, &EngineConfig::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn rejects_non_object_profile() {
        let err = evaluate_profile_str("[1, 2, 3]", &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, AdvisorError::MissingData));

        let err = evaluate_profile_str("{\"patient_id\": 1}", &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, AdvisorError::MissingData));

        let err = evaluate_profile_str("{", &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, AdvisorError::Parse(_)));
    }
}

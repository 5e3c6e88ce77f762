//! Rule evaluator: an ordered list of independent checks over the analyzer
//! outputs. Each rule adds at most one suggestion.

use bp_core::thresholds::{
    CONFIDENCE_CRITICAL_BP, CONFIDENCE_IMPROVING_TREND, CONFIDENCE_INITIATE_THERAPY,
    CONFIDENCE_MISSED_APPOINTMENTS, CONFIDENCE_NO_IMPROVEMENT, CONFIDENCE_STAGNATION,
    CONFIDENCE_UNCONTROLLED_ON_THERAPY, CRISIS_DIASTOLIC, CRISIS_SYSTOLIC, DIASTOLIC_SLOPE_CUTOFF,
    FALLBACK_RATIONALE, HIGH_MISSED_RATIO, NO_IMPROVEMENT_MIN, SYSTOLIC_SLOPE_CUTOFF,
};
use bp_core::{
    AppointmentAnalysis, EngineConfig, Evidence, PrescriptionAnalysis, Reading, Severity,
    Suggestion, TreatmentAnalysis, VitalsSummary,
};

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub vitals: &'a VitalsSummary,
    pub prescriptions: &'a PrescriptionAnalysis,
    pub treatments: &'a TreatmentAnalysis,
    pub appointments: &'a AppointmentAnalysis,
    pub config: &'a EngineConfig,
}

impl RuleContext<'_> {
    fn last_reading(&self) -> Option<&Reading> {
        self.vitals.last.as_ref()
    }
}

/// One clinical check. Missing data means the rule does not fire.
pub trait Rule: Send + Sync {
    fn id(&self) -> &'static str;

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Suggestion>;
}

/// The rule set in evaluation order.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(MedicationStagnation),
        Box::new(UncontrolledOnTherapy),
        Box::new(MissedAppointments),
        Box::new(ImprovingTrend),
        Box::new(NoImprovementTreatments),
        Box::new(CriticalOrUncontrolledBp),
    ]
}

/// Run every rule in order and fill in the fallback rationale.
pub fn evaluate_rules(rules: &[Box<dyn Rule>], ctx: &RuleContext<'_>) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for rule in rules {
        if let Some(mut suggestion) = rule.check(ctx) {
            tracing::debug!(
                rule_id = rule.id(),
                severity = %suggestion.severity,
                "Rule fired"
            );
            if suggestion.rationale.is_none() {
                suggestion.rationale = Some(FALLBACK_RATIONALE.to_string());
            }
            suggestions.push(suggestion);
        }
    }

    suggestions
}

/// R001: active regimen of 8+ weeks with a flat, high systolic average.
pub struct MedicationStagnation;

impl Rule for MedicationStagnation {
    fn id(&self) -> &'static str {
        "R001"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Suggestion> {
        let avg_systolic = ctx.vitals.avg_systolic?;
        if ctx.vitals.systolic_slope.abs() >= SYSTOLIC_SLOPE_CUTOFF
            || avg_systolic < f64::from(ctx.config.systolic_threshold)
        {
            return None;
        }

        let entry = ctx.prescriptions.entries.iter().find(|entry| entry.long_running)?;

        Some(
            Suggestion::new(
                self.id(),
                format!(
                    "{} has been active for {} days with average systolic {:.0} mmHg and no downward trend. Consider titrating or changing medication.",
                    entry.medication, entry.duration_days, avg_systolic
                ),
                Severity::High,
                CONFIDENCE_STAGNATION,
                Evidence::Stagnation {
                    prescription: entry.clone(),
                    vitals: ctx.vitals.clone(),
                },
            )
            .with_rationale(
                "The current regimen has not reached target BP despite 8+ weeks of therapy.",
            ),
        )
    }
}

/// R002: last systolic above target while on at least one active medication.
pub struct UncontrolledOnTherapy;

impl Rule for UncontrolledOnTherapy {
    fn id(&self) -> &'static str {
        "R002"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Suggestion> {
        let last = ctx.last_reading()?;
        let systolic = last.systolic?;
        if systolic < ctx.config.systolic_threshold || !ctx.prescriptions.has_active() {
            return None;
        }

        Some(Suggestion::new(
            self.id(),
            format!(
                "Last systolic reading of {systolic} mmHg remains above target despite active therapy. Review adherence and dosing."
            ),
            Severity::High,
            CONFIDENCE_UNCONTROLLED_ON_THERAPY,
            Evidence::UncontrolledOnTherapy {
                last_reading: last.clone(),
                prescriptions: ctx.prescriptions.clone(),
            },
        ))
    }
}

/// R003: high missed-appointment ratio.
pub struct MissedAppointments;

impl Rule for MissedAppointments {
    fn id(&self) -> &'static str {
        "R003"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Suggestion> {
        let appointments = ctx.appointments;
        if appointments.total == 0 || appointments.missed_ratio < HIGH_MISSED_RATIO {
            return None;
        }

        Some(Suggestion::new(
            self.id(),
            format!(
                "{} of {} appointments missed ({:.0}%). Follow up on appointment adherence.",
                appointments.missed,
                appointments.total,
                appointments.missed_ratio * 100.0
            ),
            Severity::Medium,
            CONFIDENCE_MISSED_APPOINTMENTS,
            Evidence::Appointments(appointments.clone()),
        ))
    }
}

/// R004: BP trending down.
pub struct ImprovingTrend;

impl Rule for ImprovingTrend {
    fn id(&self) -> &'static str {
        "R004"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Suggestion> {
        let vitals = ctx.vitals;
        if vitals.systolic_slope >= -SYSTOLIC_SLOPE_CUTOFF
            && vitals.diastolic_slope >= -DIASTOLIC_SLOPE_CUTOFF
        {
            return None;
        }

        Some(Suggestion::new(
            self.id(),
            "Blood pressure is trending down. Current management appears effective; continue monitoring.",
            Severity::Low,
            CONFIDENCE_IMPROVING_TREND,
            Evidence::Vitals(vitals.clone()),
        ))
    }
}

/// R005: repeated treatment episodes without improvement.
pub struct NoImprovementTreatments;

impl Rule for NoImprovementTreatments {
    fn id(&self) -> &'static str {
        "R005"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Suggestion> {
        let treatments = ctx.treatments;
        if treatments.no_improvement < NO_IMPROVEMENT_MIN {
            return None;
        }

        Some(Suggestion::new(
            self.id(),
            format!(
                "{} treatment episodes without documented improvement. Consider reassessing the treatment plan.",
                treatments.no_improvement
            ),
            Severity::Medium,
            CONFIDENCE_NO_IMPROVEMENT,
            Evidence::Treatments(treatments.clone()),
        ))
    }
}

/// R006: crisis-level last reading, or an uncontrolled one with no therapy.
/// The two branches share one slot; the crisis branch wins.
pub struct CriticalOrUncontrolledBp;

impl Rule for CriticalOrUncontrolledBp {
    fn id(&self) -> &'static str {
        "R006"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Suggestion> {
        let last = ctx.last_reading()?;
        let systolic_at_least = |limit: i32| last.systolic.is_some_and(|value| value >= limit);
        let diastolic_at_least = |limit: i32| last.diastolic.is_some_and(|value| value >= limit);

        if systolic_at_least(CRISIS_SYSTOLIC) || diastolic_at_least(CRISIS_DIASTOLIC) {
            return Some(
                Suggestion::new(
                    self.id(),
                    format!(
                        "Last reading {} mmHg requires immediate attention.",
                        format_bp(last)
                    ),
                    Severity::High,
                    CONFIDENCE_CRITICAL_BP,
                    Evidence::LastReading(last.clone()),
                )
                .with_rationale(format!(
                    "Reading is at or above {CRISIS_SYSTOLIC}/{CRISIS_DIASTOLIC} mmHg."
                )),
            );
        }

        let uncontrolled = systolic_at_least(ctx.config.systolic_threshold)
            || diastolic_at_least(ctx.config.diastolic_threshold);
        if uncontrolled && !ctx.prescriptions.has_active() {
            return Some(Suggestion::new(
                self.id(),
                format!(
                    "Last reading {} mmHg is above target with no active medication. Consider initiating therapy.",
                    format_bp(last)
                ),
                Severity::Medium,
                CONFIDENCE_INITIATE_THERAPY,
                Evidence::LastReading(last.clone()),
            ));
        }

        None
    }
}

fn format_bp(reading: &Reading) -> String {
    let part = |value: Option<i32>| value.map_or_else(|| "?".to_string(), |v| v.to_string());
    format!("{}/{}", part(reading.systolic), part(reading.diastolic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analyze_appointments, analyze_prescriptions, analyze_treatments, analyze_vitals};
    use bp_core::{AppointmentRecord, PrescriptionRecord, TreatmentEpisode, TreatmentOutcome};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    struct Fixture {
        vitals: VitalsSummary,
        prescriptions: PrescriptionAnalysis,
        treatments: TreatmentAnalysis,
        appointments: AppointmentAnalysis,
        config: EngineConfig,
    }

    impl Fixture {
        fn new(readings: &[(i32, i32)], prescriptions: &[PrescriptionRecord]) -> Self {
            let readings: Vec<Reading> = readings
                .iter()
                .map(|(s, d)| Reading::new(*s, *d, None))
                .collect();
            Self {
                vitals: analyze_vitals(&readings),
                prescriptions: analyze_prescriptions(prescriptions, Some(as_of())),
                treatments: analyze_treatments(&[]),
                appointments: analyze_appointments(&[]),
                config: EngineConfig::default(),
            }
        }

        fn ctx(&self) -> RuleContext<'_> {
            RuleContext {
                vitals: &self.vitals,
                prescriptions: &self.prescriptions,
                treatments: &self.treatments,
                appointments: &self.appointments,
                config: &self.config,
            }
        }

        fn run(&self) -> Vec<Suggestion> {
            evaluate_rules(&default_rules(), &self.ctx())
        }
    }

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn lisinopril(days_ago: i64) -> PrescriptionRecord {
        PrescriptionRecord::new("Lisinopril", as_of() - Duration::days(days_ago))
            .with_duration_days(90)
    }

    fn ids(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.rule_id.as_str()).collect()
    }

    #[test]
    fn stagnant_regimen_fires_r001() {
        let fixture = Fixture::new(
            &[(150, 92), (151, 93), (150, 92), (151, 93), (150, 92)],
            &[lisinopril(60)],
        );
        let suggestion = MedicationStagnation.check(&fixture.ctx()).unwrap();
        assert_eq!(suggestion.rule_id, "R001");
        assert_eq!(suggestion.severity, Severity::High);
        assert!(suggestion.message.contains("Lisinopril"));
        assert!(matches!(suggestion.evidence, Evidence::Stagnation { .. }));
    }

    #[test]
    fn stagnation_needs_eight_weeks() {
        let fixture = Fixture::new(&[(150, 92), (150, 92)], &[lisinopril(30)]);
        assert!(MedicationStagnation.check(&fixture.ctx()).is_none());
    }

    #[test]
    fn stagnation_needs_high_average() {
        let fixture = Fixture::new(&[(130, 85), (131, 85)], &[lisinopril(60)]);
        assert!(MedicationStagnation.check(&fixture.ctx()).is_none());
    }

    #[test]
    fn stagnation_needs_flat_slope() {
        let fixture = Fixture::new(
            &[(140, 90), (145, 90), (150, 90), (155, 90), (160, 90)],
            &[lisinopril(60)],
        );
        assert_eq!(fixture.vitals.avg_systolic, Some(150.0));
        assert!(fixture.vitals.systolic_slope >= SYSTOLIC_SLOPE_CUTOFF);
        assert!(MedicationStagnation.check(&fixture.ctx()).is_none());
    }

    #[test]
    fn uncontrolled_on_therapy_fires_r002() {
        let fixture = Fixture::new(&[(150, 95)], &[lisinopril(10)]);
        let suggestions = fixture.run();
        assert!(ids(&suggestions).contains(&"R002"));
        assert!(!ids(&suggestions).contains(&"R006"));
    }

    #[test]
    fn crisis_branch_dominates_regardless_of_medication() {
        for prescriptions in [vec![], vec![lisinopril(10)]] {
            let fixture = Fixture::new(&[(165, 70)], &prescriptions);
            let r006: Vec<Suggestion> = fixture
                .run()
                .into_iter()
                .filter(|s| s.rule_id == "R006")
                .collect();
            assert_eq!(r006.len(), 1);
            assert_eq!(r006[0].severity, Severity::High);
        }
    }

    #[test]
    fn untreated_uncontrolled_reading_is_medium() {
        let fixture = Fixture::new(&[(145, 70)], &[]);
        let r006: Vec<Suggestion> = fixture
            .run()
            .into_iter()
            .filter(|s| s.rule_id == "R006")
            .collect();
        assert_eq!(r006.len(), 1);
        assert_eq!(r006[0].severity, Severity::Medium);
        assert_eq!(r006[0].confidence, CONFIDENCE_INITIATE_THERAPY);
    }

    #[test]
    fn diastolic_alone_can_trigger_crisis() {
        let fixture = Fixture::new(&[(130, 104)], &[]);
        let suggestion = CriticalOrUncontrolledBp.check(&fixture.ctx()).unwrap();
        assert_eq!(suggestion.severity, Severity::High);
        assert!(suggestion.message.contains("130/104"));
    }

    #[test]
    fn improving_trend_fires_r004() {
        let fixture = Fixture::new(&[(160, 100), (140, 90), (120, 80)], &[]);
        let suggestions = fixture.run();
        let improving = suggestions.iter().find(|s| s.rule_id == "R004").unwrap();
        assert_eq!(improving.severity, Severity::Low);
    }

    #[test]
    fn missed_appointments_fire_r003() {
        let mut fixture = Fixture::new(&[], &[]);
        fixture.appointments = analyze_appointments(&[
            AppointmentRecord::new(Some(true)),
            AppointmentRecord::new(Some(false)),
            AppointmentRecord::new(Some(false)),
            AppointmentRecord::new(Some(true)),
        ]);
        let suggestion = MissedAppointments.check(&fixture.ctx()).unwrap();
        assert_eq!(suggestion.severity, Severity::Medium);
        assert!(suggestion.message.contains("2 of 4"));
    }

    #[test]
    fn two_failed_treatments_fire_r005() {
        let mut fixture = Fixture::new(&[], &[]);
        fixture.treatments = analyze_treatments(&[
            TreatmentEpisode::new("Diet", Some(TreatmentOutcome::NoChange)),
            TreatmentEpisode::new("Exercise", Some(TreatmentOutcome::Worse)),
        ]);
        assert_eq!(ids(&fixture.run()), vec!["R005"]);
    }

    #[test]
    fn empty_profile_fires_nothing() {
        let fixture = Fixture::new(&[], &[]);
        assert!(fixture.run().is_empty());
    }

    #[test]
    fn missing_values_never_fire() {
        let mut fixture = Fixture::new(&[], &[lisinopril(90)]);
        fixture.vitals = analyze_vitals(&[Reading::default()]);
        assert!(fixture.run().is_empty());
    }

    #[test]
    fn every_suggestion_has_rationale() {
        let fixture = Fixture::new(&[(160, 100), (140, 90), (170, 105)], &[lisinopril(70)]);
        let suggestions = fixture.run();
        assert!(!suggestions.is_empty());
        assert!(suggestions.iter().all(|s| s.rationale.is_some()));
        let r002 = suggestions.iter().find(|s| s.rule_id == "R002").unwrap();
        assert_eq!(r002.rationale.as_deref(), Some(FALLBACK_RATIONALE));
    }

    #[test]
    fn configured_threshold_moves_the_cutoff() {
        let mut fixture = Fixture::new(&[(135, 70)], &[]);
        assert!(CriticalOrUncontrolledBp.check(&fixture.ctx()).is_none());
        fixture.config.systolic_threshold = 130;
        assert!(CriticalOrUncontrolledBp.check(&fixture.ctx()).is_some());
    }
}

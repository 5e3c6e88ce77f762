//! Fixed clinical constants used by the analyzers, the rule evaluator and the
//! alert scan. These are design constants, not runtime configuration; the
//! tunable knobs live in [`crate::EngineConfig`].

/// Only the most recent readings are used for averages and slopes.
pub const VITALS_WINDOW: usize = 30;

/// Systolic slope (mmHg per reading) above which the trend is "rising".
pub const SYSTOLIC_SLOPE_CUTOFF: f64 = 0.25;
/// Diastolic slope (mmHg per reading) above which the trend is "rising".
pub const DIASTOLIC_SLOPE_CUTOFF: f64 = 0.2;

/// Eight weeks on an unchanged regimen.
pub const LONG_RUNNING_DAYS: i64 = 56;

pub const HIGH_MISSED_RATIO: f64 = 0.3;
pub const MODERATE_MISSED_RATIO: f64 = 0.1;

/// R005 fires at this many episodes without improvement.
pub const NO_IMPROVEMENT_MIN: usize = 2;

/// Last-reading cutoffs for the "immediate attention" branch of R006.
pub const CRISIS_SYSTOLIC: i32 = 160;
pub const CRISIS_DIASTOLIC: i32 = 100;

pub const CONFIDENCE_STAGNATION: f64 = 0.90;
pub const CONFIDENCE_UNCONTROLLED_ON_THERAPY: f64 = 0.85;
pub const CONFIDENCE_MISSED_APPOINTMENTS: f64 = 0.80;
pub const CONFIDENCE_IMPROVING_TREND: f64 = 0.78;
pub const CONFIDENCE_NO_IMPROVEMENT: f64 = 0.80;
pub const CONFIDENCE_CRITICAL_BP: f64 = 0.95;
pub const CONFIDENCE_INITIATE_THERAPY: f64 = 0.85;

/// Rationale attached to every rule suggestion that did not set its own.
pub const FALLBACK_RATIONALE: &str =
    "Generated by the rule-based engine from the patient's recent clinical data; review before acting.";

// Notification cutoffs (per reading, independent of the rule evaluator).
pub const ALERT_CRISIS_SYSTOLIC: i32 = 180;
pub const ALERT_CRISIS_DIASTOLIC: i32 = 120;
pub const ALERT_STAGE2_SYSTOLIC: i32 = 140;
pub const ALERT_STAGE2_DIASTOLIC: i32 = 90;
pub const ALERT_STAGE1_SYSTOLIC: i32 = 130;
pub const ALERT_STAGE1_DIASTOLIC: i32 = 80;
pub const ALERT_HYPOTENSION_SYSTOLIC: i32 = 90;
pub const ALERT_HYPOTENSION_DIASTOLIC: i32 = 60;

/// Look-back window for critical reading alerts.
pub const CRITICAL_WINDOW_HOURS: i64 = 24;
/// Consecutive days without a reading before a missed-readings alert.
pub const MISSED_READING_DAYS: u32 = 2;

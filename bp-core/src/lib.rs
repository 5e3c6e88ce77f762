//! Core data model for the hypertension suggestion engine: the patient profile
//! snapshot, analyzer outputs, suggestions and notification alerts.

pub mod thresholds;
pub mod timestamp;

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Tunable thresholds for the rule evaluator.
///
/// Every field falls back to its default when missing, so a partial JSON
/// object is a valid override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Systolic value (mmHg) at or above which BP counts as uncontrolled.
    pub systolic_threshold: i32,
    /// Diastolic value (mmHg) at or above which BP counts as uncontrolled.
    pub diastolic_threshold: i32,
    /// Reserved for a configurable trend rule; the fixed rules do not read it.
    pub trend_slope_threshold: f64,
    /// Reserved for a configurable adherence rule; the fixed rules do not read it.
    pub adherence_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            systolic_threshold: 140,
            diastolic_threshold: 90,
            trend_slope_threshold: 0.5,
            adherence_threshold: 0.8,
        }
    }
}

/// Clinical urgency attached to suggestions and alerts. Used for ranking only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Severity {
    High,
    Medium,
    Low,
    Unknown,
}

impl Severity {
    /// Ranking weight: high=3, medium=2, low=1, unknown=0.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
            Self::Unknown => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&str> for Severity {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" => Self::High,
            "medium" | "moderate" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One blood-pressure / heart-rate observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Reading {
    #[serde(default, with = "timestamp::optional")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub systolic: Option<i32>,
    #[serde(default)]
    pub diastolic: Option<i32>,
    #[serde(default)]
    pub heart_rate: Option<i32>,
}

impl Reading {
    pub fn new(systolic: i32, diastolic: i32, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            timestamp,
            systolic: Some(systolic),
            diastolic: Some(diastolic),
            heart_rate: None,
        }
    }

    pub fn with_heart_rate(mut self, heart_rate: i32) -> Self {
        self.heart_rate = Some(heart_rate);
        self
    }
}

/// A prescription as resolved by the data-access layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PrescriptionRecord {
    #[serde(default)]
    pub medication: String,
    #[serde(default, with = "timestamp::optional")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::optional")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Service-layer flag, consulted only when no end date can be derived.
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub duration_days: Option<u32>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
}

impl PrescriptionRecord {
    pub fn new(medication: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            medication: medication.into(),
            started_at: Some(started_at),
            ..Self::default()
        }
    }

    pub fn with_duration_days(mut self, days: u32) -> Self {
        self.duration_days = Some(days);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Explicit end, or start + prescribed duration. A duration past the
    /// representable date range counts as open-ended.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.ended_at.or_else(|| {
            let start = self.started_at?;
            let days = self.duration_days?;
            start.checked_add_signed(Duration::days(i64::from(days)))
        })
    }

    /// Whether the regimen is still running at `as_of`.
    ///
    /// With a start, an end and an as-of, this is `as_of <= end`; the stored
    /// flag is computed against the wall clock and would disagree for a
    /// historical as-of. Otherwise the stored flag is used when present, a
    /// record with no start is inactive, and an open-ended record is active.
    pub fn is_active(&self, as_of: Option<DateTime<Utc>>) -> bool {
        if let (Some(_), Some(end), Some(now)) = (self.started_at, self.end(), as_of) {
            return now <= end;
        }
        if let Some(active) = self.active {
            return active;
        }
        self.started_at.is_some()
    }
}

/// Clinical outcome recorded for a treatment episode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum TreatmentOutcome {
    Improved,
    NoChange,
    Worse,
    Unknown,
}

impl From<String> for TreatmentOutcome {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "improved" => Self::Improved,
            "no_change" | "unchanged" => Self::NoChange,
            "worse" | "worsened" => Self::Worse,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TreatmentEpisode {
    #[serde(default, alias = "name")]
    pub treatment: String,
    #[serde(default, with = "timestamp::optional")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::optional")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub outcome: Option<TreatmentOutcome>,
}

impl TreatmentEpisode {
    pub fn new(treatment: impl Into<String>, outcome: Option<TreatmentOutcome>) -> Self {
        Self {
            treatment: treatment.into(),
            outcome,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppointmentRecord {
    #[serde(default, with = "timestamp::optional")]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// `None` when attendance was never recorded.
    #[serde(default)]
    pub attended: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
}

impl AppointmentRecord {
    pub fn new(attended: Option<bool>) -> Self {
        Self {
            attended,
            ..Self::default()
        }
    }
}

/// Immutable snapshot handed to the engine. Readings and treatments are
/// ordered oldest to newest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientProfile {
    #[serde(default, deserialize_with = "deserialize_patient_id")]
    pub patient_id: String,
    #[serde(with = "timestamp::required")]
    pub as_of: DateTime<Utc>,
    #[serde(default)]
    pub vitals: Vec<Reading>,
    #[serde(default)]
    pub prescriptions: Vec<PrescriptionRecord>,
    #[serde(default)]
    pub treatments: Vec<TreatmentEpisode>,
    #[serde(default)]
    pub appointments: Vec<AppointmentRecord>,
}

impl PatientProfile {
    pub fn new(patient_id: impl Into<String>, as_of: DateTime<Utc>) -> Self {
        Self {
            patient_id: patient_id.into(),
            as_of,
            vitals: Vec::new(),
            prescriptions: Vec::new(),
            treatments: Vec::new(),
            appointments: Vec::new(),
        }
    }
}

// The service layer sends numeric user ids; other callers send strings.
fn deserialize_patient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Text(text)) => text,
        Some(RawId::Number(number)) => number.to_string(),
        None => String::new(),
    })
}

/// Qualitative direction of a slope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    #[default]
    Stable,
}

/// Statistical summary of the trailing vitals window.
///
/// Slopes are in mmHg per reading, not per day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VitalsSummary {
    pub count: usize,
    pub last: Option<Reading>,
    pub avg_systolic: Option<f64>,
    pub avg_diastolic: Option<f64>,
    pub systolic_slope: f64,
    pub diastolic_slope: f64,
    pub systolic_trend: TrendDirection,
    pub diastolic_trend: TrendDirection,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionEntry {
    pub medication: String,
    pub active: bool,
    pub duration_days: i64,
    pub long_running: bool,
    pub record: PrescriptionRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PrescriptionAnalysis {
    pub total: usize,
    pub entries: Vec<PrescriptionEntry>,
    /// Medication names seen more than once, in first-seen order.
    pub repeated: Vec<String>,
    pub notes: Vec<String>,
}

impl PrescriptionAnalysis {
    pub fn active(&self) -> impl Iterator<Item = &PrescriptionEntry> {
        self.entries.iter().filter(|entry| entry.active)
    }

    pub fn has_active(&self) -> bool {
        self.active().next().is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TreatmentAnalysis {
    pub total: usize,
    pub no_improvement: usize,
    pub last_outcome: Option<TreatmentOutcome>,
    pub majority_no_improvement: bool,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdherenceLevel {
    Good,
    Moderate,
    HighMissed,
    #[default]
    NoRecords,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppointmentAnalysis {
    pub total: usize,
    pub missed: usize,
    pub missed_ratio: f64,
    pub adherence: AdherenceLevel,
    pub notes: Vec<String>,
}

/// Structured payload explaining why a suggestion was raised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Evidence {
    Stagnation {
        prescription: PrescriptionEntry,
        vitals: VitalsSummary,
    },
    UncontrolledOnTherapy {
        last_reading: Reading,
        prescriptions: PrescriptionAnalysis,
    },
    Appointments(AppointmentAnalysis),
    Vitals(VitalsSummary),
    Treatments(TreatmentAnalysis),
    LastReading(Reading),
    /// Free-form payload from an external suggestion source.
    External(serde_json::Value),
}

/// A clinical suggestion for review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub rule_id: String,
    pub message: String,
    pub evidence: Evidence,
    pub severity: Severity,
    pub confidence: f64,
    #[serde(default)]
    pub rationale: Option<String>,
}

impl Suggestion {
    pub fn new(
        rule_id: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        confidence: f64,
        evidence: Evidence,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            message: message.into(),
            evidence,
            severity,
            confidence: confidence.clamp(0.0, 1.0),
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Analyzer outputs plus the ranked suggestions for one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    pub patient_id: String,
    #[serde(with = "timestamp::required")]
    pub as_of: DateTime<Utc>,
    pub vitals: VitalsSummary,
    pub prescriptions: PrescriptionAnalysis,
    pub treatments: TreatmentAnalysis,
    pub appointments: AppointmentAnalysis,
    pub suggestions: Vec<Suggestion>,
}

/// Blood-pressure category used for notifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BpCategory {
    HypertensiveCrisis,
    Stage2Hypertension,
    Stage1Hypertension,
    Hypotension,
    Normal,
}

impl BpCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::HypertensiveCrisis => "Hypertensive Crisis",
            Self::Stage2Hypertension => "Stage 2 Hypertension",
            Self::Stage1Hypertension => "Stage 1 Hypertension",
            Self::Hypotension => "Hypotension",
            Self::Normal => "Normal",
        }
    }

    pub fn severity(self) -> Option<Severity> {
        match self {
            Self::HypertensiveCrisis | Self::Hypotension => Some(Severity::High),
            Self::Stage2Hypertension => Some(Severity::Medium),
            Self::Stage1Hypertension => Some(Severity::Low),
            Self::Normal => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    AbnormalBp,
    CriticalBp,
    MissedReadings,
}

/// A notification-worthy condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub category: Option<BpCategory>,
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
    pub missed_days: Option<u32>,
    #[serde(default, with = "timestamp::optional")]
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Errors surfaced through the [`SuggestionSource`] seam.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("Input is missing required data")]
    MissingData,
    #[error("Could not read data: {0}")]
    Parse(String),
    #[error("Suggestions unavailable: {0}")]
    Unavailable(String),
    #[error("Other error: {0}")]
    Other(String),
}

/// Anything that turns a profile snapshot into suggestions.
///
/// The rule engine never fails; external sources (LLM backends) may.
pub trait SuggestionSource {
    fn name(&self) -> &str;

    fn suggest(
        &self,
        profile: &PatientProfile,
        config: &EngineConfig,
    ) -> Result<Vec<Suggestion>, AdvisorError>;
}

//! Notification-worthy conditions derived from the same profile snapshot.
//! Independent of the suggestion rules.

use std::collections::HashSet;

use bp_core::thresholds::{
    ALERT_CRISIS_DIASTOLIC, ALERT_CRISIS_SYSTOLIC, ALERT_HYPOTENSION_DIASTOLIC,
    ALERT_HYPOTENSION_SYSTOLIC, ALERT_STAGE1_DIASTOLIC, ALERT_STAGE1_SYSTOLIC,
    ALERT_STAGE2_DIASTOLIC, ALERT_STAGE2_SYSTOLIC, CRITICAL_WINDOW_HOURS, MISSED_READING_DAYS,
};
use bp_core::{Alert, AlertKind, BpCategory, PatientProfile, Reading, Severity};
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Checked top to bottom; the first match wins.
pub fn classify_reading(systolic: i32, diastolic: i32) -> BpCategory {
    if systolic >= ALERT_CRISIS_SYSTOLIC || diastolic >= ALERT_CRISIS_DIASTOLIC {
        BpCategory::HypertensiveCrisis
    } else if systolic >= ALERT_STAGE2_SYSTOLIC || diastolic >= ALERT_STAGE2_DIASTOLIC {
        BpCategory::Stage2Hypertension
    } else if systolic >= ALERT_STAGE1_SYSTOLIC || diastolic >= ALERT_STAGE1_DIASTOLIC {
        BpCategory::Stage1Hypertension
    } else if systolic < ALERT_HYPOTENSION_SYSTOLIC || diastolic < ALERT_HYPOTENSION_DIASTOLIC {
        BpCategory::Hypotension
    } else {
        BpCategory::Normal
    }
}

/// Alert for a single newly submitted reading, if it is out of range.
pub fn reading_alert(reading: &Reading) -> Option<Alert> {
    let (systolic, diastolic) = (reading.systolic?, reading.diastolic?);
    let category = classify_reading(systolic, diastolic);
    let severity = category.severity()?;

    Some(Alert {
        kind: AlertKind::AbnormalBp,
        title: format!("Blood pressure reading: {}", category.label()),
        message: format!(
            "Recorded {systolic}/{diastolic} mmHg ({}). Review recommended.",
            category.label()
        ),
        severity,
        category: Some(category),
        systolic: Some(systolic),
        diastolic: Some(diastolic),
        missed_days: None,
        recorded_at: reading.timestamp,
    })
}

/// Crisis when either value reaches the crisis cutoff, otherwise hypotension
/// when either value is below the hypotension cutoff. Unlike
/// [`classify_reading`], a high systolic does not mask a low diastolic.
fn critical_category(systolic: i32, diastolic: i32) -> Option<BpCategory> {
    if systolic >= ALERT_CRISIS_SYSTOLIC || diastolic >= ALERT_CRISIS_DIASTOLIC {
        Some(BpCategory::HypertensiveCrisis)
    } else if systolic < ALERT_HYPOTENSION_SYSTOLIC || diastolic < ALERT_HYPOTENSION_DIASTOLIC {
        Some(BpCategory::Hypotension)
    } else {
        None
    }
}

/// Crisis or hypotension readings from the 24 hours ending at `as_of`.
/// The same value on the same day is reported once.
pub fn critical_readings(readings: &[Reading], as_of: DateTime<Utc>) -> Vec<Alert> {
    let since = as_of - Duration::hours(CRITICAL_WINDOW_HOURS);
    let mut seen: HashSet<(i32, i32, NaiveDate)> = HashSet::new();
    let mut alerts = Vec::new();

    for reading in readings {
        let Some(recorded_at) = reading.timestamp else {
            continue;
        };
        if recorded_at < since || recorded_at > as_of {
            continue;
        }
        let (Some(systolic), Some(diastolic)) = (reading.systolic, reading.diastolic) else {
            continue;
        };

        let Some(category) = critical_category(systolic, diastolic) else {
            continue;
        };
        if !seen.insert((systolic, diastolic, recorded_at.date_naive())) {
            continue;
        }

        alerts.push(Alert {
            kind: AlertKind::CriticalBp,
            title: format!("Critical BP reading - {}", category.label()),
            message: format!(
                "Critical BP reading of {systolic}/{diastolic} mmHg ({}).",
                category.label()
            ),
            severity: Severity::High,
            category: Some(category),
            systolic: Some(systolic),
            diastolic: Some(diastolic),
            missed_days: None,
            recorded_at: Some(recorded_at),
        });
    }

    alerts
}

/// Alert when no reading was submitted on the as-of day nor the day before.
pub fn missed_readings(readings: &[Reading], as_of: DateTime<Utc>) -> Option<Alert> {
    let today = as_of.date_naive();
    let yesterday = today.pred_opt()?;

    let submitted_on = |day: NaiveDate| {
        readings
            .iter()
            .filter_map(|reading| reading.timestamp)
            .any(|timestamp| timestamp.date_naive() == day)
    };

    if submitted_on(today) || submitted_on(yesterday) {
        return None;
    }

    Some(Alert {
        kind: AlertKind::MissedReadings,
        title: format!("Missed BP readings - {MISSED_READING_DAYS} days"),
        message: format!(
            "No BP readings submitted for {MISSED_READING_DAYS} consecutive days."
        ),
        severity: Severity::Medium,
        category: None,
        systolic: None,
        diastolic: None,
        missed_days: Some(MISSED_READING_DAYS),
        recorded_at: None,
    })
}

/// Critical readings followed by the missed-readings check.
pub fn scan_alerts(profile: &PatientProfile) -> Vec<Alert> {
    let mut alerts = critical_readings(&profile.vitals, profile.as_of);
    alerts.extend(missed_readings(&profile.vitals, profile.as_of));

    tracing::debug!(
        patient_id = %profile.patient_id,
        alerts = alerts.len(),
        "Alert scan complete"
    );

    alerts
}

//! Per-medication duration and repeat detection.

use std::collections::HashMap;

use bp_core::thresholds::LONG_RUNNING_DAYS;
use bp_core::{PrescriptionAnalysis, PrescriptionEntry, PrescriptionRecord};
use chrono::{DateTime, Utc};

pub fn analyze_prescriptions(
    records: &[PrescriptionRecord],
    as_of: Option<DateTime<Utc>>,
) -> PrescriptionAnalysis {
    if records.is_empty() {
        return PrescriptionAnalysis {
            notes: vec!["No prescriptions recorded.".to_string()],
            ..PrescriptionAnalysis::default()
        };
    }

    let entries: Vec<PrescriptionEntry> = records
        .iter()
        .map(|record| {
            let active = record.is_active(as_of);
            let duration_days = duration_days(record, as_of);
            PrescriptionEntry {
                medication: record.medication.clone(),
                active,
                duration_days,
                long_running: active && duration_days >= LONG_RUNNING_DAYS,
                record: record.clone(),
            }
        })
        .collect();

    let repeated = repeated_medications(records);

    let mut notes: Vec<String> = entries
        .iter()
        .filter(|entry| entry.long_running)
        .map(|entry| {
            format!(
                "Long-running active medication: {} ({} days).",
                entry.medication, entry.duration_days
            )
        })
        .collect();
    notes.extend(
        repeated
            .iter()
            .map(|name| format!("Repeated medication: {name}.")),
    );

    PrescriptionAnalysis {
        total: records.len(),
        entries,
        repeated,
        notes,
    }
}

/// Days on the regimen: as-of minus start when as-of is known, else end minus
/// start when an end can be derived, else 0. Never negative.
pub fn duration_days(record: &PrescriptionRecord, as_of: Option<DateTime<Utc>>) -> i64 {
    let Some(start) = record.started_at else {
        return 0;
    };

    let until = match as_of {
        Some(now) => now,
        None => match record.end() {
            Some(end) => end,
            None => return 0,
        },
    };

    until.signed_duration_since(start).num_days().max(0)
}

// Historical repeat check: any name seen twice, regardless of dates.
fn repeated_medications(records: &[PrescriptionRecord]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<(String, &str)> = Vec::new();

    for record in records {
        let key = record.medication.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push((key, record.medication.trim()));
        }
        *count += 1;
    }

    order
        .into_iter()
        .filter(|(key, _)| counts.get(key).copied().unwrap_or_default() > 1)
        .map(|(_, name)| name.to_string())
        .collect()
}

//! Appointment adherence.

use bp_core::thresholds::{HIGH_MISSED_RATIO, MODERATE_MISSED_RATIO};
use bp_core::{AdherenceLevel, AppointmentAnalysis, AppointmentRecord};

/// Missed ratio is explicit misses over all appointments; unknown attendance
/// stays in the denominator only.
pub fn analyze_appointments(appointments: &[AppointmentRecord]) -> AppointmentAnalysis {
    if appointments.is_empty() {
        return AppointmentAnalysis {
            notes: vec!["No appointments recorded.".to_string()],
            ..AppointmentAnalysis::default()
        };
    }

    let total = appointments.len();
    let missed = appointments
        .iter()
        .filter(|appointment| appointment.attended == Some(false))
        .count();
    let missed_ratio = missed as f64 / total as f64;
    let adherence = adherence_level(missed_ratio);

    let note = match adherence {
        AdherenceLevel::HighMissed => "High missed appointment rate.",
        AdherenceLevel::Moderate => "Moderate missed appointment rate.",
        AdherenceLevel::Good | AdherenceLevel::NoRecords => "Good appointment adherence.",
    };

    AppointmentAnalysis {
        total,
        missed,
        missed_ratio,
        adherence,
        notes: vec![
            format!("{missed} of {total} appointment(s) missed."),
            note.to_string(),
        ],
    }
}

pub fn adherence_level(missed_ratio: f64) -> AdherenceLevel {
    if missed_ratio >= HIGH_MISSED_RATIO {
        AdherenceLevel::HighMissed
    } else if missed_ratio >= MODERATE_MISSED_RATIO {
        AdherenceLevel::Moderate
    } else {
        AdherenceLevel::Good
    }
}

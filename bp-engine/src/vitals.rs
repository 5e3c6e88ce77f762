//! Trend summary over the trailing window of BP readings.

use bp_core::thresholds::{DIASTOLIC_SLOPE_CUTOFF, SYSTOLIC_SLOPE_CUTOFF, VITALS_WINDOW};
use bp_core::{Reading, TrendDirection, VitalsSummary};

pub const NO_VITALS_NOTE: &str = "No vitals available.";

/// Summarize readings ordered oldest to newest.
///
/// Averages and slopes only look at the last [`VITALS_WINDOW`] readings.
/// Missing systolic/diastolic values are skipped, not counted as zero, and
/// slopes are regressed against position in the remaining series.
pub fn analyze_vitals(readings: &[Reading]) -> VitalsSummary {
    if readings.is_empty() {
        return VitalsSummary {
            notes: vec![NO_VITALS_NOTE.to_string()],
            ..VitalsSummary::default()
        };
    }

    let window = &readings[readings.len().saturating_sub(VITALS_WINDOW)..];
    let systolic: Vec<f64> = window
        .iter()
        .filter_map(|reading| reading.systolic)
        .map(f64::from)
        .collect();
    let diastolic: Vec<f64> = window
        .iter()
        .filter_map(|reading| reading.diastolic)
        .map(f64::from)
        .collect();

    let systolic_slope = least_squares_slope(&systolic);
    let diastolic_slope = least_squares_slope(&diastolic);
    let systolic_trend = direction(systolic_slope, SYSTOLIC_SLOPE_CUTOFF);
    let diastolic_trend = direction(diastolic_slope, DIASTOLIC_SLOPE_CUTOFF);

    let mut notes = Vec::new();
    if systolic.len() < 2 && diastolic.len() < 2 {
        notes.push("Not enough readings to estimate a trend.".to_string());
    } else {
        notes.push(trend_note("Systolic", systolic_trend, systolic_slope));
        notes.push(trend_note("Diastolic", diastolic_trend, diastolic_slope));
    }

    VitalsSummary {
        count: readings.len(),
        last: readings.last().cloned(),
        avg_systolic: mean(&systolic),
        avg_diastolic: mean(&diastolic),
        systolic_slope,
        diastolic_slope,
        systolic_trend,
        diastolic_trend,
        notes,
    }
}

/// Ordinary least-squares slope of `values` against their index.
/// Returns 0.0 for fewer than two points.
pub fn least_squares_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let (numerator, denominator) = values.iter().enumerate().fold(
        (0.0, 0.0),
        |(num, den), (index, value)| {
            let dx = index as f64 - mean_x;
            (num + dx * (value - mean_y), den + dx * dx)
        },
    );

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn direction(slope: f64, cutoff: f64) -> TrendDirection {
    if slope > cutoff {
        TrendDirection::Rising
    } else if slope < -cutoff {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    }
}

fn trend_note(label: &str, trend: TrendDirection, slope: f64) -> String {
    match trend {
        TrendDirection::Rising => format!("{label} trend rising ({slope:+.2} mmHg/reading)."),
        TrendDirection::Falling => format!("{label} trend falling ({slope:+.2} mmHg/reading)."),
        TrendDirection::Stable => format!("{label} trend stable ({slope:+.2} mmHg/reading)."),
    }
}

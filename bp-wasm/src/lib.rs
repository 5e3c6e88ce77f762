//! Framework-neutral WASM <-> JavaScript bridge for the suggestion engine.

use bp_core::{AdvisorError, EngineConfig};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsEngineConfig {
    #[serde(default)]
    systolic_threshold: Option<i32>,
    #[serde(default)]
    diastolic_threshold: Option<i32>,
    #[serde(default)]
    trend_slope_threshold: Option<f64>,
    #[serde(default)]
    adherence_threshold: Option<f64>,
}

impl From<JsEngineConfig> for EngineConfig {
    fn from(cfg: JsEngineConfig) -> Self {
        let mut base = EngineConfig::default();
        if let Some(value) = cfg.systolic_threshold {
            base.systolic_threshold = value;
        }
        if let Some(value) = cfg.diastolic_threshold {
            base.diastolic_threshold = value;
        }
        if let Some(value) = cfg.trend_slope_threshold {
            base.trend_slope_threshold = value;
        }
        if let Some(value) = cfg.adherence_threshold {
            base.adherence_threshold = value;
        }
        base
    }
}

/// Evaluate a profile object and return the full report (analyzers + ranked suggestions).
#[wasm_bindgen]
pub fn evaluate_profile(profile: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let profile_value = read_profile(profile)?;
    let cfg = read_config(config)?;

    let report = bp_engine::evaluate_profile_value(&profile_value, &cfg)
        .map_err(|err| JsValue::from_str(&format_advisor_error(err)))?;

    to_value(&report).map_err(|err| JsValue::from_str(&format!("Could not serialize report: {err}")))
}

/// Notification alerts for a profile object.
#[wasm_bindgen]
pub fn scan_alerts(profile: JsValue) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let profile_value = read_profile(profile)?;
    let profile = bp_engine::parse_profile_value(&profile_value)
        .map_err(|err| JsValue::from_str(&format_advisor_error(err)))?;

    to_value(&bp_engine::scan_alerts(&profile))
        .map_err(|err| JsValue::from_str(&format!("Could not serialize alerts: {err}")))
}

/// Blood-pressure category label for a single reading.
#[wasm_bindgen]
pub fn classify_reading(systolic: i32, diastolic: i32) -> String {
    bp_engine::classify_reading(systolic, diastolic)
        .label()
        .to_string()
}

fn read_profile(profile: JsValue) -> Result<serde_json::Value, JsValue> {
    from_value::<serde_json::Value>(profile)
        .map_err(|err| JsValue::from_str(&format!("Could not read profile JSON: {err}")))
}

fn read_config(config: Option<JsValue>) -> Result<EngineConfig, JsValue> {
    match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsEngineConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Could not read config: {err}")))?;
            Ok(EngineConfig::from(cfg))
        }
        _ => Ok(EngineConfig::default()),
    }
}

fn format_advisor_error(err: AdvisorError) -> String {
    format!("Advisor error: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg = EngineConfig::from(JsEngineConfig {
            systolic_threshold: Some(135),
            diastolic_threshold: None,
            trend_slope_threshold: None,
            adherence_threshold: Some(0.9),
        });
        assert_eq!(cfg.systolic_threshold, 135);
        assert_eq!(cfg.diastolic_threshold, 90);
        assert_eq!(cfg.trend_slope_threshold, 0.5);
        assert_eq!(cfg.adherence_threshold, 0.9);
    }

    #[test]
    fn classify_returns_label() {
        assert_eq!(classify_reading(182, 95), "Hypertensive Crisis");
        assert_eq!(classify_reading(115, 75), "Normal");
    }
}

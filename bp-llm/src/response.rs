//! Normalizing free-form model output into [`Suggestion`]s.

use bp_core::{Evidence, Severity, Suggestion};
use serde::Deserialize;
use serde_json::Value;

use crate::LlmError;

const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Fields are kept loose; models often return numbers or lists where text
/// is expected.
#[derive(Deserialize)]
struct ExternalSuggestion {
    #[serde(default)]
    rule_id: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    evidence: Option<Value>,
    #[serde(default)]
    severity: Option<Value>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    rationale: Option<Value>,
}

/// Parse model output: either `{"ai_suggestions": [...]}` or a bare list,
/// optionally wrapped in a Markdown code fence. Any other JSON shape yields
/// no suggestions.
pub fn parse_suggestions(text: &str) -> Result<Vec<Suggestion>, LlmError> {
    let cleaned = strip_code_fence(text);
    let value: Value =
        serde_json::from_str(cleaned).map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("ai_suggestions") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| normalize(index, item))
        .collect())
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn normalize(index: usize, item: Value) -> Option<Suggestion> {
    let external: ExternalSuggestion = match serde_json::from_value(item) {
        Ok(external) => external,
        Err(err) => {
            tracing::warn!(index, error = %err, "Skipping malformed LLM suggestion");
            return None;
        }
    };

    let message = text(external.message)?;
    let rule_id = text(external.rule_id).unwrap_or_else(|| format!("AI_{:03}", index + 1));
    let severity = text(external.severity)
        .map(Severity::from)
        .unwrap_or(Severity::Unknown);

    let mut suggestion = Suggestion::new(
        rule_id,
        message,
        severity,
        confidence(external.confidence.as_ref()),
        Evidence::External(external.evidence.unwrap_or(Value::Null)),
    );
    suggestion.rationale = text(external.rationale);
    Some(suggestion)
}

/// Non-empty text from a string, number, bool or list of those.
fn text(value: Option<Value>) -> Option<String> {
    let raw = match value? {
        Value::String(raw) => raw,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| text(Some(item)))
            .collect::<Vec<_>>()
            .join("; "),
        Value::Null | Value::Object(_) => return None,
    };
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn confidence(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_object_inside_fence() {
        let text = "```json\n{\"ai_suggestions\": [{\"rule_id\": \"MED_STAGNATION_001\", \"message\": \"Consider titrating\", \"evidence\": \"avg 152/94\", \"severity\": \"high\", \"confidence\": 0.82, \"rationale\": \"8+ weeks\"}]}\n```";
        let suggestions = parse_suggestions(text).unwrap();
        assert_eq!(suggestions.len(), 1);
        let suggestion = &suggestions[0];
        assert_eq!(suggestion.rule_id, "MED_STAGNATION_001");
        assert_eq!(suggestion.severity, Severity::High);
        assert_eq!(suggestion.confidence, 0.82);
        assert_eq!(suggestion.rationale.as_deref(), Some("8+ weeks"));
        assert_eq!(
            suggestion.evidence,
            Evidence::External(Value::String("avg 152/94".into()))
        );
    }

    #[test]
    fn bare_list_is_accepted() {
        let suggestions =
            parse_suggestions(r#"[{"message": "Schedule follow-up", "severity": "medium"}]"#).unwrap();
        assert_eq!(suggestions[0].rule_id, "AI_001");
        assert_eq!(suggestions[0].severity, Severity::Medium);
        assert_eq!(suggestions[0].confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn severity_and_confidence_always_present() {
        let suggestions = parse_suggestions(
            r#"[{"message": "a", "severity": "urgent", "confidence": 1.7},
                {"message": "b", "confidence": "0.7"},
                {"message": "c", "confidence": null}]"#,
        )
        .unwrap();
        assert_eq!(suggestions[0].severity, Severity::Unknown);
        assert_eq!(suggestions[0].confidence, 1.0);
        assert_eq!(suggestions[1].severity, Severity::Unknown);
        assert_eq!(suggestions[1].confidence, 0.7);
        assert_eq!(suggestions[2].confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn items_without_message_are_dropped() {
        let suggestions =
            parse_suggestions(r#"[{"severity": "high"}, {"message": "kept"}, 42]"#).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].message, "kept");
        assert_eq!(suggestions[0].rule_id, "AI_002");
    }

    #[test]
    fn loosely_typed_fields_are_coerced() {
        let suggestions = parse_suggestions(
            r#"[{"rule_id": 7, "message": "Recheck in clinic", "severity": "HIGH",
                 "rationale": ["avg above target", "8+ weeks on therapy"]},
                {"message": ["Reduce sodium", "Walk daily"], "rule_id": null, "rationale": {"x": 1}}]"#,
        )
        .unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].rule_id, "7");
        assert_eq!(suggestions[0].severity, Severity::High);
        assert_eq!(
            suggestions[0].rationale.as_deref(),
            Some("avg above target; 8+ weeks on therapy")
        );
        assert_eq!(suggestions[1].rule_id, "AI_002");
        assert_eq!(suggestions[1].message, "Reduce sodium; Walk daily");
        assert_eq!(suggestions[1].rationale, None);
    }

    #[test]
    fn unexpected_shape_is_empty() {
        assert!(parse_suggestions(r#"{"insights": []}"#).unwrap().is_empty());
        assert!(parse_suggestions("\"just text\"").unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            parse_suggestions("Sorry, I cannot help with that."),
            Err(LlmError::ResponseParsing(_))
        ));
    }
}

//! Terminal payload normalization
//!
//! Shapes the server's raw `result` object into the canonical
//! `ValidationResult`, applying the defaulting rules the rendering layers
//! rely on: every array element comes out fully populated even when the
//! server omits fields.

use chrono::Utc;
use serde_json::Value;

use crate::types::{
    Evidence, EvidenceStrength, Source, StatisticalFinding, ValidationResult,
};

const DEFAULT_CONCLUSION: &str = "No conclusion available";
const DEFAULT_DESCRIPTION: &str = "No description available";
const DEFAULT_SOURCE: &str = "Unknown source";

/// Build the canonical result from a terminal `completed` payload.
///
/// `findings` are the statistical findings accumulated from progress
/// messages; they are appended to `methods` after any methods carried in
/// the payload itself. `timestamp` is the construction time and
/// `is_simulated` is always false on this path.
pub fn normalize_result_payload(
    hypothesis: &str,
    payload: Option<&Value>,
    findings: &[StatisticalFinding],
) -> ValidationResult {
    let empty = Value::Null;
    let payload = payload.unwrap_or(&empty);

    let mut methods: Vec<StatisticalFinding> = payload
        .get("methods")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(normalize_method).collect())
        .unwrap_or_default();
    methods.extend(findings.iter().cloned());

    ValidationResult {
        hypothesis: hypothesis.to_string(),
        validation_score: number_field(payload, "validation_score").unwrap_or(0.0),
        p_value: number_field(payload, "p_value").unwrap_or(0.0),
        supporting_evidence: evidence_array(payload, "supporting_evidence"),
        contradicting_evidence: evidence_array(payload, "contradicting_evidence"),
        methods,
        sources: source_array(payload),
        conclusion: string_field(payload, "conclusion")
            .unwrap_or_else(|| DEFAULT_CONCLUSION.to_string()),
        timestamp: Utc::now(),
        is_simulated: false,
    }
}

fn number_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

fn evidence_array(payload: &Value, key: &str) -> Vec<Evidence> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(normalize_evidence).collect())
        .unwrap_or_default()
}

fn normalize_evidence(item: &Value) -> Evidence {
    Evidence {
        source: string_field(item, "source").unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        description: string_field(item, "description")
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        strength: EvidenceStrength::from_label(
            item.get("strength").and_then(Value::as_str),
        ),
    }
}

fn normalize_method(item: &Value) -> StatisticalFinding {
    StatisticalFinding {
        test_name: string_field(item, "test_name").unwrap_or_else(|| "Unnamed test".to_string()),
        statistic: number_field(item, "statistic"),
        p_value: number_field(item, "p_value").unwrap_or(0.0),
        description: string_field(item, "description")
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        raw_text: string_field(item, "raw_text").unwrap_or_default(),
    }
}

fn source_array(payload: &Value) -> Vec<Source> {
    payload
        .get("sources")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| Source {
                    title: string_field(item, "title")
                        .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
                    url: string_field(item, "url"),
                    relevance: string_field(item, "relevance"),
                })
                .collect()
        })
        .unwrap_or_default()
}

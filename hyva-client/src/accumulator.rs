//! Result accumulation across the event stream
//!
//! Folds parsed statistical findings from every progress message and, on
//! the first terminal `completed` payload, constructs the canonical
//! `ValidationResult` exactly once. A second terminal event for the same
//! session cannot reconstruct or mutate the result.

use hyva_common::normalize::normalize_result_payload;
use hyva_common::types::{StatisticalFinding, ValidationResult};

use crate::parser;

#[derive(Debug, Clone)]
pub struct ResultAccumulator {
    hypothesis: String,
    findings: Vec<StatisticalFinding>,
    result: Option<ValidationResult>,
}

impl ResultAccumulator {
    pub fn new(hypothesis: &str) -> Self {
        Self {
            hypothesis: hypothesis.to_string(),
            findings: Vec::new(),
            result: None,
        }
    }

    /// Parse a progress message line-by-line and append any findings.
    /// Returns the findings newly extracted from this message so the
    /// session can republish them incrementally.
    pub fn absorb_message(&mut self, message: &str) -> Vec<StatisticalFinding> {
        let new = parser::parse_message(message);
        self.findings.extend(new.iter().cloned());
        new
    }

    /// Construct the final result from the terminal `completed` payload.
    ///
    /// Idempotent after the first call: a repeated terminal event returns
    /// the already-built result unchanged.
    pub fn complete(&mut self, payload: Option<&serde_json::Value>) -> &ValidationResult {
        let Self {
            hypothesis,
            findings,
            result,
        } = self;
        result.get_or_insert_with(|| normalize_result_payload(hypothesis, payload, findings))
    }

    pub fn findings(&self) -> &[StatisticalFinding] {
        &self.findings
    }

    pub fn result(&self) -> Option<&ValidationResult> {
        self.result.as_ref()
    }
}

//! Domain types for hypothesis validation results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Parameters for one validation job. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRequest {
    pub hypothesis: String,
    pub alpha: f64,
}

impl ValidationRequest {
    /// Validate and construct request parameters.
    ///
    /// The hypothesis must be non-empty (after trimming) and alpha must
    /// lie in (0, 1].
    pub fn new(hypothesis: &str, alpha: f64) -> Result<Self> {
        let hypothesis = hypothesis.trim();
        if hypothesis.is_empty() {
            return Err(Error::InvalidInput("hypothesis must not be empty".to_string()));
        }
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(Error::InvalidInput(format!(
                "alpha must be in (0, 1], got {}",
                alpha
            )));
        }
        Ok(Self {
            hypothesis: hypothesis.to_string(),
            alpha,
        })
    }
}

/// One statistical test extracted from a progress message line.
///
/// Append-only: findings are kept in arrival order and never deduplicated,
/// so a test repeated by the server (e.g. on a retried sub-step) appears
/// once per occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalFinding {
    pub test_name: String,
    pub statistic: Option<f64>,
    pub p_value: f64,
    pub description: String,
    pub raw_text: String,
}

/// Qualitative strength label attached to a piece of evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceStrength {
    Strong,
    Moderate,
    Weak,
}

impl EvidenceStrength {
    /// Parse a payload strength label, defaulting to `Moderate` for
    /// missing or unrecognized values.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("strong") => Self::Strong,
            Some("weak") => Self::Weak,
            _ => Self::Moderate,
        }
    }
}

/// One item of supporting or contradicting evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub source: String,
    pub description: String,
    pub strength: EvidenceStrength,
}

/// A literature or dataset reference cited by the validation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<String>,
}

/// Canonical outcome of one validation job.
///
/// Constructed exactly once per request, either from the live terminal
/// payload or by the fallback simulator; `is_simulated` is the only field
/// that discloses which path produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub hypothesis: String,
    pub validation_score: f64,
    pub p_value: f64,
    pub supporting_evidence: Vec<Evidence>,
    pub contradicting_evidence: Vec<Evidence>,
    pub methods: Vec<StatisticalFinding>,
    pub sources: Vec<Source>,
    pub conclusion: String,
    pub timestamp: DateTime<Utc>,
    pub is_simulated: bool,
}

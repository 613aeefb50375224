//! Event types for the validation event stream
//!
//! `StreamEvent` is the wire shape pushed by the validation service over
//! its SSE endpoint. `SessionUpdate` is the broadcast shape the client
//! republishes to local observers (CLI, UI panels).

use serde::{Deserialize, Serialize};

use crate::types::{StatisticalFinding, ValidationResult};

/// One server-pushed message on the validation event stream.
///
/// Ephemeral: decoded, folded into session state, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Lifecycle status label (e.g. "validating", "completed")
    #[serde(default)]
    pub status: String,

    /// Raw progress percentage as reported by the server. May be out of
    /// range; clamped to [0,100] by the state machine on every update.
    #[serde(default)]
    pub progress: i64,

    /// Human-readable progress text, scanned for statistical-test lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Terminal payload, present on `completed` events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Server-side failure description, present on `failed` events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Server-assigned job identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// Validation job lifecycle phase.
///
/// The service reports status as a free-form string; this enum closes the
/// set. Unrecognized labels parse to `None` and fold as a no-op so an
/// unknown status can never corrupt the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPhase {
    Idle,
    Initializing,
    LoadingData,
    Configuring,
    Validating,
    Completed,
    Failed,
}

impl ValidationPhase {
    /// Parse a server status label. Case-insensitive; spaces and hyphens
    /// are treated as underscores. Unknown labels yield `None`.
    pub fn from_status(status: &str) -> Option<Self> {
        let normalized: String = status
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();

        match normalized.as_str() {
            "idle" => Some(Self::Idle),
            "initializing" => Some(Self::Initializing),
            "loading_data" => Some(Self::LoadingData),
            "configuring" => Some(Self::Configuring),
            "validating" => Some(Self::Validating),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Position in the fixed forward-only lifecycle order
    pub fn rank(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Initializing => 1,
            Self::LoadingData => 2,
            Self::Configuring => 3,
            Self::Validating => 4,
            Self::Completed => 5,
            Self::Failed => 5,
        }
    }

    /// Terminal phases accept further events but fold them to nothing
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::LoadingData => "loading_data",
            Self::Configuring => "configuring",
            Self::Validating => "validating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ValidationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session updates broadcast to local observers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionUpdate {
    /// Lifecycle phase and/or progress changed
    Progress {
        phase: ValidationPhase,
        progress: u8,
        message: Option<String>,
    },

    /// A statistical-test line was extracted from a progress message
    Finding { finding: StatisticalFinding },

    /// Session reached a final result (live or simulated)
    Completed { result: ValidationResult },

    /// Server explicitly failed the job
    Failed { error: String },
}

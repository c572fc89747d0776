use std::fmt;

use archive_core::models::Derivative;
use serde::Serialize;

/// Why a pass produced nothing without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No generator handles this file type.
    UnsupportedType,
    /// The document rendered no page.
    NoPages,
    /// The job did not ask for this pass.
    NotRequested,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedType => write!(f, "unsupported type"),
            SkipReason::NoPages => write!(f, "no pages"),
            SkipReason::NotRequested => write!(f, "not requested"),
        }
    }
}

/// Result of one derivative pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PassOutcome {
    Generated(Derivative),
    Skipped { reason: SkipReason },
    /// The generator ran and failed; the field was left untouched.
    Failed { reason: String },
}

impl PassOutcome {
    pub fn skipped(reason: SkipReason) -> Self {
        PassOutcome::Skipped { reason }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        PassOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            PassOutcome::Generated(derivative) => Some(&derivative.path),
            _ => None,
        }
    }
}

impl fmt::Display for PassOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassOutcome::Generated(d) => write!(f, "generated {}", d.path),
            PassOutcome::Skipped { reason } => write!(f, "skipped ({})", reason),
            PassOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

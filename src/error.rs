//! Error types for the engine.
//!
//! Mirrors the hand-rolled `LangErrorMsg`/`LangResult` pattern used elsewhere
//! in this codebase rather than pulling in `thiserror`/`anyhow`: this crate's
//! public surface is small and every failure mode is enumerable up front.

use std::fmt;

/// Something went wrong that the caller can recover from (bad rule string,
/// malformed macrocell file, or out-of-range cell state). Cooperative
/// cancellation is not an `EngineError`: it is reported through
/// [`crate::poller::StepOutcome`] instead, since an interrupted operation is
/// an expected outcome rather than a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A rule string did not parse, or named an unknown rule family.
    InvalidRule(String),
    /// A cell state was out of range for the current rule.
    InvalidCell { state: u32, max: u32 },
    /// A macrocell file line could not be parsed.
    MacrocellParse { line: usize, message: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRule(s) => write!(f, "invalid rule string: {:?}", s),
            Self::InvalidCell { state, max } => {
                write!(f, "cell state {} exceeds maximum {} for this rule", state, max)
            }
            Self::MacrocellParse { line, message } => {
                write!(f, "macrocell parse error at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

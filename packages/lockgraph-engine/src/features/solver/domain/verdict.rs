//! Check verdicts
//!
//! The three-valued answer the engine gives for each assertion-like check
//! point. Precision loss surfaces here as `Unknown`; it is never an
//! error.

use serde::Serialize;
use std::fmt;

use crate::shared::models::{CheckId, ProgramPoint};

/// Verdict for one check point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckVerdict {
    /// The condition holds in every modeled execution
    True,
    /// The condition fails in every modeled execution
    False,
    /// The abstraction cannot decide (includes unreachable checks)
    Unknown,
}

impl fmt::Display for CheckVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckVerdict::True => write!(f, "definitely true"),
            CheckVerdict::False => write!(f, "definitely false"),
            CheckVerdict::Unknown => write!(f, "unknown"),
        }
    }
}

/// Verdict attached to its check point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub id: CheckId,
    pub location: ProgramPoint,
    pub verdict: CheckVerdict,
}

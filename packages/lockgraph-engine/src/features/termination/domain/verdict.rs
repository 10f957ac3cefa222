//! Loop termination verdicts

use serde::Serialize;
use std::fmt;

use crate::shared::models::{ProgramPoint, ThreadId};

/// Verdict for one loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopVerdict {
    /// A bounded, strictly monotonic progress measure exists
    Terminating,
    /// No measure found; the loop may or may not terminate
    Unknown,
}

impl fmt::Display for LoopVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopVerdict::Terminating => write!(f, "terminating"),
            LoopVerdict::Unknown => write!(f, "unknown"),
        }
    }
}

/// Verdict attached to its loop header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopReport {
    pub thread: ThreadId,
    pub location: ProgramPoint,
    pub verdict: LoopVerdict,
}

//! Analysis report
//!
//! The surface the (external) reporting layer consumes: a verdict per
//! check point, a verdict per loop, the final global views, and run
//! diagnostics. Serializable so drivers can export JSON.

use serde::Serialize;

use crate::errors::{LockgraphError, Result};
use crate::features::abstract_domains::DomainValue;
use crate::features::lockset::LockDiagnostics;
use crate::features::solver::domain::verdict::{CheckReport, CheckVerdict};
use crate::features::solver::infrastructure::worklist::SolverStats;
use crate::features::termination::domain::verdict::{LoopReport, LoopVerdict};
use crate::shared::models::{CheckId, GlobalId, ProgramPoint};

/// Final view of one global: value range × protecting lockset
#[derive(Debug, Clone, Serialize)]
pub struct GlobalReport {
    pub global: GlobalId,
    pub value: DomainValue,
}

/// Run diagnostics bundled for the report
#[derive(Debug, Clone, Serialize)]
pub struct ReportDiagnostics {
    pub solver: SolverStats,
    pub locks: LockDiagnostics,
}

/// Everything one analysis run produced
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub checks: Vec<CheckReport>,
    pub loops: Vec<LoopReport>,
    pub globals: Vec<GlobalReport>,
    pub diagnostics: ReportDiagnostics,
}

impl AnalysisReport {
    /// Verdict of a check point by id
    pub fn check_verdict(&self, id: &CheckId) -> Option<CheckVerdict> {
        self.checks.iter().find(|c| &c.id == id).map(|c| c.verdict)
    }

    /// Verdict of the loop headed at `location`
    pub fn loop_verdict(&self, location: &ProgramPoint) -> Option<LoopVerdict> {
        self.loops
            .iter()
            .find(|l| &l.location == location)
            .map(|l| l.verdict)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LockgraphError::internal(e.to_string()))
    }
}

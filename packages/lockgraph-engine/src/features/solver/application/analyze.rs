//! Analysis use case
//!
//! Wires the pipeline end to end: validate config and program, compute
//! the protection map, run the thread-modular solver, then extract check
//! verdicts, loop verdicts and the per-global report.

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use tracing::info;

use crate::config::{AnalysisConfig, AnalysisKind};
use crate::errors::Result;
use crate::features::abstract_domains::{DomainValue, Lattice};
use crate::features::flow_graph::{Program, Stmt};
use crate::features::protection::ProtectionMap;
use crate::features::solver::application::report::{
    AnalysisReport, GlobalReport, ReportDiagnostics,
};
use crate::features::solver::domain::verdict::{CheckReport, CheckVerdict};
use crate::features::solver::infrastructure::transfer::TransferFunction;
use crate::features::solver::infrastructure::worklist::{
    SolveOutcome, SolverConfig, ThreadModularSolver,
};
use crate::features::termination::infrastructure::oracle::TerminationOracle;

/// End-to-end analysis service
pub struct AnalysisService {
    config: AnalysisConfig,
}

impl AnalysisService {
    /// Validate the configuration once; inconsistencies are fatal for
    /// the run, not for the engine
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        if config.is_active(AnalysisKind::Relational) {
            info!("relational backend requested; answering with intervals");
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a program and collect every verdict
    pub fn analyze(&self, program: &Program) -> Result<AnalysisReport> {
        program.validate()?;

        let protection = ProtectionMap::compute(program);
        let solver_config = SolverConfig {
            max_iterations: self.config.solver.max_iterations,
            widening_delay: self.config.solver.widening_delay,
            narrowing_passes: self.config.solver.narrowing_passes,
            track_intervals: self.config.ana.int.interval,
        };
        let outcome = ThreadModularSolver::new(program, &protection)
            .with_config(solver_config)
            .solve();

        let checks = extract_checks(program, &protection, &outcome, solver_config.track_intervals);
        let loops = if self.config.is_active(AnalysisKind::Termination) {
            TerminationOracle::new(program, &protection, &outcome).verdicts()
        } else {
            Vec::new()
        };
        let globals = outcome
            .store
            .invariants(program)
            .into_iter()
            .map(|(global, value)| GlobalReport {
                value: DomainValue::Pair(value, protection.protecting(&global).clone()),
                global,
            })
            .collect();

        Ok(AnalysisReport {
            checks,
            loops,
            globals,
            diagnostics: ReportDiagnostics {
                solver: outcome.stats.clone(),
                locks: outcome.lock_diagnostics.clone(),
            },
        })
    }
}

/// Evaluate every check point against the converged states
///
/// A budget-cut run reports every check as unknown: the stored states
/// are not a fixpoint, so no definite claim would be sound.
fn extract_checks(
    program: &Program,
    protection: &ProtectionMap,
    outcome: &SolveOutcome,
    track_intervals: bool,
) -> Vec<CheckReport> {
    let tf = TransferFunction::new(protection).with_intervals(track_intervals);
    let mut reports = Vec::new();

    for (tid, cfg) in program.threads.iter().enumerate() {
        let mut edges: Vec<(usize, NodeIndex, &Stmt)> = cfg
            .graph
            .edge_references()
            .filter(|e| matches!(e.weight().stmt, Stmt::Check { .. }))
            .map(|e| (e.id().index(), e.source(), &e.weight().stmt))
            .collect();
        edges.sort_by_key(|(eid, _, _)| *eid);

        for (_, src, stmt) in edges {
            let Stmt::Check { id, cond } = stmt else {
                continue;
            };
            let verdict = if outcome.stats.budget_exhausted {
                CheckVerdict::Unknown
            } else {
                match outcome.state_at((tid, src)) {
                    None => CheckVerdict::Unknown, // unreachable check
                    Some(state) if state.is_bottom() => CheckVerdict::Unknown,
                    Some(state) => {
                        let mut reads = Vec::new();
                        let truth = tf.eval(cond, state, &outcome.store, &mut reads).truthiness();
                        match truth.as_constant() {
                            Some(0) => CheckVerdict::False,
                            Some(_) => CheckVerdict::True,
                            None => CheckVerdict::Unknown,
                        }
                    }
                }
            };
            reports.push(CheckReport {
                id: id.clone(),
                location: cfg.point(src).clone(),
                verdict,
            });
        }
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::flow_graph::{CfgBuilder, Expr, Place, ProgramBuilder};
    use crate::shared::models::{CheckId, GlobalId, VarId};

    #[test]
    fn test_service_rejects_inconsistent_config() {
        let yaml = "ana:\n  activated: [value, termination]\n  int:\n    interval: false\n";
        let config = AnalysisConfig::from_yaml(yaml).unwrap();
        assert!(AnalysisService::new(config).is_err());
    }

    #[test]
    fn test_straight_line_check_verdicts() {
        let mut b = CfgBuilder::new("main");
        let entry = b.entry();
        let n1 = b.seq(
            entry,
            Stmt::Assign {
                target: Place::Local(VarId::new("x")),
                value: Expr::constant(3),
            },
        );
        let n2 = b.seq(
            n1,
            Stmt::Check {
                id: CheckId::new("x-positive"),
                cond: Expr::binary(
                    crate::features::flow_graph::BinOp::Gt,
                    Expr::local("x"),
                    Expr::constant(0),
                ),
            },
        );
        b.seq(
            n2,
            Stmt::Check {
                id: CheckId::new("x-is-five"),
                cond: Expr::equals(Expr::local("x"), Expr::constant(5)),
            },
        );
        let program = ProgramBuilder::new().thread(b.build()).build().unwrap();

        let service = AnalysisService::new(AnalysisConfig::default()).unwrap();
        let report = service.analyze(&program).unwrap();
        assert_eq!(
            report.check_verdict(&CheckId::new("x-positive")),
            Some(CheckVerdict::True)
        );
        assert_eq!(
            report.check_verdict(&CheckId::new("x-is-five")),
            Some(CheckVerdict::False)
        );
    }

    #[test]
    fn test_loops_omitted_unless_termination_active() {
        let mut b = CfgBuilder::new("main");
        let entry = b.entry();
        let header = b.seq(entry, Stmt::Skip);
        let body = b.seq(header, Stmt::Assume(Expr::Nondet));
        b.edge(body, header, Stmt::Skip);
        b.seq(header, Stmt::Skip);
        let program = ProgramBuilder::new().thread(b.build()).build().unwrap();

        let plain = AnalysisService::new(AnalysisConfig::default()).unwrap();
        assert!(plain.analyze(&program).unwrap().loops.is_empty());

        let with_term =
            AnalysisService::new(AnalysisConfig::default().activate(AnalysisKind::Termination))
                .unwrap();
        assert_eq!(with_term.analyze(&program).unwrap().loops.len(), 1);
    }

    #[test]
    fn test_global_report_carries_protection_pair() {
        let mut b = CfgBuilder::new("main");
        let entry = b.entry();
        let n1 = b.seq(entry, Stmt::Lock(crate::shared::models::LockId::new("A")));
        let n2 = b.seq(
            n1,
            Stmt::Assign {
                target: Place::Global(GlobalId::new("g")),
                value: Expr::constant(1),
            },
        );
        b.seq(n2, Stmt::Unlock(crate::shared::models::LockId::new("A")));
        let program = ProgramBuilder::new().global("g").thread(b.build()).build().unwrap();

        let service = AnalysisService::new(AnalysisConfig::default()).unwrap();
        let report = service.analyze(&program).unwrap();
        assert_eq!(report.globals.len(), 1);
        match &report.globals[0].value {
            DomainValue::Pair(value, locks) => {
                assert_eq!(*value, crate::features::abstract_domains::Interval::range(0, 1));
                assert!(locks.contains(&crate::shared::models::LockId::new("A")));
            }
            other => panic!("expected Pair, got {}", other),
        }
    }

    #[test]
    fn test_interval_toggle_off_degrades_checks() {
        let mut b = CfgBuilder::new("main");
        let entry = b.entry();
        let n1 = b.seq(
            entry,
            Stmt::Assign {
                target: Place::Local(VarId::new("x")),
                value: Expr::constant(3),
            },
        );
        b.seq(
            n1,
            Stmt::Check {
                id: CheckId::new("x-positive"),
                cond: Expr::binary(
                    crate::features::flow_graph::BinOp::Gt,
                    Expr::local("x"),
                    Expr::constant(0),
                ),
            },
        );
        let program = ProgramBuilder::new().thread(b.build()).build().unwrap();

        let mut config = AnalysisConfig::default();
        config.ana.int.interval = false;
        let report = AnalysisService::new(config)
            .unwrap()
            .analyze(&program)
            .unwrap();
        assert_eq!(
            report.check_verdict(&CheckId::new("x-positive")),
            Some(CheckVerdict::Unknown),
            "without the interval component no numeric claim is provable"
        );
    }

    #[test]
    fn test_budget_cut_degrades_checks_to_unknown() {
        let mut b = CfgBuilder::new("main");
        let entry = b.entry();
        let header = b.seq(
            entry,
            Stmt::Assign {
                target: Place::Local(VarId::new("i")),
                value: Expr::constant(1),
            },
        );
        let guard = Expr::le(Expr::local("i"), Expr::constant(5));
        let body = b.seq(header, Stmt::Assume(guard.clone()));
        b.edge(
            body,
            header,
            Stmt::Assign {
                target: Place::Local(VarId::new("i")),
                value: Expr::add(Expr::local("i"), Expr::constant(1)),
            },
        );
        let exit = b.seq(header, Stmt::Assume(guard.negated()));
        b.seq(
            exit,
            Stmt::Check {
                id: CheckId::new("after-loop"),
                cond: Expr::constant(1),
            },
        );
        let program = ProgramBuilder::new().thread(b.build()).build().unwrap();

        let mut config = AnalysisConfig::default();
        config.solver.max_iterations = 2;
        let service = AnalysisService::new(config).unwrap();
        let report = service.analyze(&program).unwrap();
        assert!(report.diagnostics.solver.budget_exhausted);
        assert_eq!(
            report.check_verdict(&CheckId::new("after-loop")),
            Some(CheckVerdict::Unknown)
        );
    }
}

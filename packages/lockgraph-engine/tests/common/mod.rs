//! Shared helpers for integration tests
#![allow(dead_code)] // each test crate uses a subset

use lockgraph_engine::{CheckId, Expr, GlobalId, LockId, Place, Stmt, ThreadId, VarId};

pub fn assign_local(var: &str, value: Expr) -> Stmt {
    Stmt::Assign {
        target: Place::Local(VarId::new(var)),
        value,
    }
}

pub fn assign_global(global: &str, value: Expr) -> Stmt {
    Stmt::Assign {
        target: Place::Global(GlobalId::new(global)),
        value,
    }
}

pub fn lock(name: &str) -> Stmt {
    Stmt::Lock(LockId::new(name))
}

pub fn unlock(name: &str) -> Stmt {
    Stmt::Unlock(LockId::new(name))
}

pub fn spawn(thread: &str) -> Stmt {
    Stmt::Spawn(ThreadId::new(thread))
}

pub fn check(id: &str, cond: Expr) -> Stmt {
    Stmt::Check {
        id: CheckId::new(id),
        cond,
    }
}

/// `var = var + 1`
pub fn increment(var: &str) -> Stmt {
    assign_local(var, Expr::add(Expr::local(var), Expr::constant(1)))
}

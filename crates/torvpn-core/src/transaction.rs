//! Compensating actions for multi-step host mutations
//!
//! Each successful mutation records how to undo itself. If a later step
//! fails, [`Transaction::rollback`] runs the recorded undos newest-first;
//! once every step succeeded, [`Transaction::commit`] discards them.
//!
//! ```rust
//! use torvpn_core::Transaction;
//!
//! let mut log: Vec<&str> = Vec::new();
//! let mut tx = Transaction::new();
//! tx.record("first", |log: &mut Vec<&str>| { log.push("undo first"); Ok(()) });
//! tx.record("second", |log: &mut Vec<&str>| { log.push("undo second"); Ok(()) });
//!
//! let report = tx.rollback(&mut log);
//! assert!(report.is_clean());
//! assert_eq!(log, ["undo second", "undo first"]);
//! ```

use std::fmt;
use tracing::{debug, warn};

type Undo<C> = Box<dyn FnOnce(&mut C) -> anyhow::Result<()>>;

struct Compensation<C> {
    name: &'static str,
    undo: Undo<C>,
}

/// Stack of undo actions over a context `C`
pub struct Transaction<C> {
    steps: Vec<Compensation<C>>,
}

impl<C> Transaction<C> {
    /// Empty transaction
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Record how to undo a mutation that just took effect
    pub fn record<F>(&mut self, name: &'static str, undo: F)
    where
        F: FnOnce(&mut C) -> anyhow::Result<()> + 'static,
    {
        debug!(compensation = name, "Recorded compensation");
        self.steps.push(Compensation {
            name,
            undo: Box::new(undo),
        });
    }

    /// Number of pending compensations
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when nothing would be undone
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Keep every mutation; drop the undo list
    pub fn commit(self) {
        debug!(discarded = self.steps.len(), "Transaction committed");
    }

    /// Undo every recorded mutation, newest first
    ///
    /// Best effort: a failing undo is logged and the rest still run.
    pub fn rollback(self, ctx: &mut C) -> RollbackReport {
        let mut report = RollbackReport::default();

        for step in self.steps.into_iter().rev() {
            match (step.undo)(ctx) {
                Ok(()) => {
                    debug!(compensation = step.name, "Compensation applied");
                    report.undone.push(step.name);
                }
                Err(e) => {
                    warn!(compensation = step.name, error = %e, "Compensation failed");
                    report.failed.push((step.name, format!("{e:#}")));
                }
            }
        }

        report
    }
}

impl<C> Default for Transaction<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Transaction<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.steps.iter().map(|s| s.name).collect();
        f.debug_struct("Transaction").field("steps", &names).finish()
    }
}

/// Outcome of a rollback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Compensations that ran cleanly, in execution order
    pub undone: Vec<&'static str>,
    /// Compensations that failed, with the error text
    pub failed: Vec<(&'static str, String)>,
}

impl RollbackReport {
    /// True when every compensation succeeded
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.undone.is_empty() && self.failed.is_empty() {
            return write!(f, "nothing to roll back");
        }
        write!(f, "rolled back: [{}]", self.undone.join(", "))?;
        if !self.failed.is_empty() {
            let failed: Vec<String> = self
                .failed
                .iter()
                .map(|(name, err)| format!("{name}: {err}"))
                .collect();
            write!(f, "; failed: [{}]", failed.join(", "))?;
        }
        Ok(())
    }
}

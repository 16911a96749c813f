//! Ingestion outcomes and progress events

use std::fmt;

use serde::Serialize;

use crate::Error;

/// Rows written for one debtor's subtree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DebtorStats {
    pub companies: usize,
    pub employees: usize,
    pub tags_linked: usize,
}

/// Totals for a fully successful run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub debtors: usize,
    pub companies: usize,
    pub employees: usize,
    pub employee_types: usize,
    pub tags_linked: usize,
}

impl IngestReport {
    pub(crate) fn absorb(&mut self, stats: DebtorStats) {
        self.debtors += 1;
        self.companies += stats.companies;
        self.employees += stats.employees;
        self.tags_linked += stats.tags_linked;
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ingestion Summary:")?;
        writeln!(f, "  Debtors: {}", self.debtors)?;
        writeln!(f, "  Companies: {}", self.companies)?;
        writeln!(f, "  Employees: {}", self.employees)?;
        writeln!(f, "  Employee types: {}", self.employee_types)?;
        writeln!(f, "  Tag links: {}", self.tags_linked)
    }
}

/// One debtor whose subtree could not be ingested
#[derive(Debug)]
pub struct DebtorFailure {
    pub debtor_id: i64,
    pub error: Error,
}

/// Every failed debtor of a run, plus the debtors that made it.
///
/// Debtors listed in `succeeded` have their full subtree committed; failed
/// debtors may have a partial subtree (everything committed before the
/// failing step).
#[derive(Debug, Default)]
pub struct IngestionFailure {
    pub succeeded: Vec<i64>,
    pub failed: Vec<DebtorFailure>,
}

impl IngestionFailure {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn failed_ids(&self) -> Vec<i64> {
        self.failed.iter().map(|f| f.debtor_id).collect()
    }
}

impl fmt::Display for IngestionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} debtors failed to ingest", self.failed.len(), self.total())?;
        for failure in &self.failed {
            write!(f, "; debtor {}: {}", failure.debtor_id, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for IngestionFailure {}

/// Progress notifications emitted by ingestion workers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    Started { debtor_id: i64, name: String },
    Finished { debtor_id: i64, stats: DebtorStats },
    Failed { debtor_id: i64, reason: String },
}

impl IngestEvent {
    /// Finished or failed
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IngestEvent::Started { .. })
    }
}

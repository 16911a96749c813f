//! Ingestion Pipeline
//!
//! Walks debtor → companies → employees-by-type and writes the rows.
//!
//! 1. Employee types are fetched and committed once, before any worker runs.
//! 2. Debtors go into a shared queue drained by a bounded set of worker
//!    threads, each holding its own session for one debtor at a time.
//! 3. Within a debtor everything is sequential and committed step by step,
//!    so partial subtrees become visible while the run is in flight.
//! 4. The run joins every worker and reports all failures together.

pub mod report;

use std::io;
use std::num::NonZeroUsize;
use std::thread::{self, ScopedJoinHandle};

use crossbeam::channel::Sender;
use crossbeam::queue::SegQueue;

use crate::api::NmbrsApi;
use crate::model::{Company, Debtor, EMPLOYEE_TYPE_CODES};
use crate::storage::{session_scope, Session, StorePool};
use crate::Result;

pub use report::{DebtorFailure, DebtorStats, IngestEvent, IngestReport, IngestionFailure};

/// Worker pool sizing
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub workers: NonZeroUsize,
}

impl PipelineOptions {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: NonZeroUsize::new(workers).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }
}

type DebtorOutcome = (i64, Result<DebtorStats>);

/// Concurrent fan-out over debtors sharing one connection pool
pub struct Pipeline<'a> {
    api: &'a dyn NmbrsApi,
    pool: &'a StorePool,
    options: PipelineOptions,
    events: Option<Sender<IngestEvent>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(api: &'a dyn NmbrsApi, pool: &'a StorePool, options: PipelineOptions) -> Self {
        Self {
            api,
            pool,
            options,
            events: None,
        }
    }

    /// Send progress events to `events` while running
    pub fn with_events(mut self, events: Sender<IngestEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Mirror the given debtors and everything below them.
    ///
    /// An empty list is a no-op. Fails before any worker starts if the
    /// employee types cannot be loaded; otherwise every debtor is attempted
    /// and all failures come back in one [`IngestionFailure`].
    pub fn create(&self, debtors: &[Debtor]) -> Result<IngestReport> {
        if debtors.is_empty() {
            tracing::info!("No debtors to ingest");
            return Ok(IngestReport::default());
        }

        let employee_types = self.api.list_employee_types()?;
        let inserted_types = session_scope(self.pool, |session| {
            let inserted = session.insert_employee_types(&employee_types)?;
            session.commit()?;
            Ok(inserted)
        })?;
        tracing::debug!("Inserted {} employee types", inserted_types);

        // Each worker holds a pooled connection for a whole debtor
        let pool_size = usize::try_from(self.pool.max_size()).unwrap_or(usize::MAX);
        let workers = self
            .options
            .workers
            .get()
            .min(debtors.len())
            .min(pool_size);
        tracing::info!("Ingesting {} debtors with {} workers", debtors.len(), workers);

        let queue = SegQueue::new();
        for debtor in debtors {
            queue.push(debtor);
        }

        let outcomes = self.fan_out(&queue, workers);

        let mut report = IngestReport {
            employee_types: inserted_types,
            ..IngestReport::default()
        };
        let mut failure = IngestionFailure::default();
        for (debtor_id, outcome) in outcomes {
            match outcome {
                Ok(stats) => {
                    report.absorb(stats);
                    failure.succeeded.push(debtor_id);
                }
                Err(error) => failure.failed.push(DebtorFailure { debtor_id, error }),
            }
        }

        if failure.failed.is_empty() {
            tracing::info!(
                "Ingested {} debtors, {} companies, {} employees",
                report.debtors,
                report.companies,
                report.employees
            );
            return Ok(report);
        }

        failure.succeeded.sort_unstable();
        failure.failed.sort_by_key(|f| f.debtor_id);
        tracing::error!("{}", failure);
        Err(failure.into())
    }

    /// Run `workers` threads until the queue is drained and join them all
    fn fan_out(&self, queue: &SegQueue<&Debtor>, workers: usize) -> Vec<DebtorOutcome> {
        thread::scope(|scope| {
            let spawned = (0..workers)
                .map(|worker| {
                    thread::Builder::new()
                        .name(format!("ingest-{}", worker))
                        .spawn_scoped(scope, move || self.drain(queue))
                })
                .collect();
            self.gather(queue, spawned)
        })
    }

    /// Join the workers that did start, then drain whatever is left on the
    /// calling thread. A worker that could not be spawned only costs
    /// parallelism.
    fn gather<'scope>(
        &self,
        queue: &SegQueue<&Debtor>,
        spawned: Vec<io::Result<ScopedJoinHandle<'scope, Vec<DebtorOutcome>>>>,
    ) -> Vec<DebtorOutcome> {
        let mut outcomes = Vec::new();
        let mut running = 0;
        for handle in spawned {
            match handle {
                Ok(handle) => {
                    running += 1;
                    match handle.join() {
                        Ok(batch) => outcomes.extend(batch),
                        Err(panic) => std::panic::resume_unwind(panic),
                    }
                }
                Err(e) => tracing::warn!("Could not start an ingest worker: {}", e),
            }
        }
        if running == 0 {
            tracing::warn!("No ingest worker started, ingesting on the calling thread");
        }
        outcomes.extend(self.drain(queue));
        outcomes
    }

    /// Worker loop: take debtors until the queue is empty
    fn drain(&self, queue: &SegQueue<&Debtor>) -> Vec<DebtorOutcome> {
        let mut outcomes = Vec::new();
        while let Some(debtor) = queue.pop() {
            self.emit(IngestEvent::Started {
                debtor_id: debtor.id,
                name: debtor.name.clone(),
            });

            let outcome = self.process_debtor(debtor);
            match &outcome {
                Ok(stats) => {
                    tracing::debug!(
                        "Debtor {} done: {} companies, {} employees",
                        debtor.id,
                        stats.companies,
                        stats.employees
                    );
                    self.emit(IngestEvent::Finished {
                        debtor_id: debtor.id,
                        stats: *stats,
                    });
                }
                Err(e) => {
                    tracing::error!("Debtor {} ({}) failed: {}", debtor.id, debtor.name, e);
                    self.emit(IngestEvent::Failed {
                        debtor_id: debtor.id,
                        reason: e.to_string(),
                    });
                }
            }
            outcomes.push((debtor.id, outcome));
        }
        outcomes
    }

    fn emit(&self, event: IngestEvent) {
        if let Some(events) = &self.events {
            // Nobody listening is fine
            events.send(event).ok();
        }
    }

    /// Insert one debtor and its whole subtree inside a single session
    pub fn process_debtor(&self, debtor: &Debtor) -> Result<DebtorStats> {
        session_scope(self.pool, |session| {
            let mut stats = DebtorStats::default();

            session.insert_debtor(debtor)?;
            session.commit()?;

            stats.tags_linked = self.resolve_tags(session, debtor)?;

            let companies = self.api.list_companies_by_debtor(debtor.id)?;
            for company in &companies {
                stats.employees += self.process_company(session, debtor, company)?;
                stats.companies += 1;
            }

            Ok(stats)
        })
    }

    /// Get-or-create each of the debtor's tags and link them, then commit once
    fn resolve_tags(&self, session: &mut Session, debtor: &Debtor) -> Result<usize> {
        let tags = self.api.list_tags_by_debtor(debtor.id)?;
        let mut linked = 0;
        for tag in &tags {
            let tag_id = session.resolve_tag(tag)?;
            if session.link_tag(debtor.id, tag_id)? {
                linked += 1;
            }
        }
        session.commit()?;
        Ok(linked)
    }

    fn process_company(&self, session: &mut Session, debtor: &Debtor, company: &Company) -> Result<usize> {
        session.insert_company(debtor.id, company)?;
        session.commit()?;

        let mut inserted = 0;
        for type_id in EMPLOYEE_TYPE_CODES {
            let employees = self
                .api
                .list_employees_by_company_and_type(company.id, type_id)?;
            inserted += session.insert_employees(company.id, type_id, &employees)?;
            session.commit()?;
        }
        Ok(inserted)
    }
}

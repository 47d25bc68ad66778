//! Bulk import through a bounded worker pool.
//!
//! One dispatcher hands jobs to `workers` long-lived tasks over a
//! single-slot channel, so at most `workers + 1` jobs are in flight and the
//! dispatcher blocks while every worker is busy. Outcomes flow back over a
//! second channel to a single collector that folds them into an
//! [`ImportResult`].

use super::context::Context;
use super::ledger::Ledger;
use crate::domain::transaction::Transaction;
use crate::domain::validation::Validate;
use crate::error::LedgerError;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug)]
pub struct ImportJob {
    pub index: usize,
    pub transaction: Transaction,
}

#[derive(Debug)]
pub struct ImportOutcome {
    pub index: usize,
    pub error: Option<LedgerError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    pub index: usize,
    pub error: String,
}

/// Summary of one import call.
///
/// `errors` is in completion order, not submission order: workers finish
/// concurrently. Sort by `index` if submission order matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub accepted: u64,
    pub rejected: u64,
    pub errors: Vec<ImportFailure>,
}

impl ImportResult {
    /// Number of outcomes folded in so far.
    pub fn processed(&self) -> u64 {
        self.accepted + self.rejected
    }

    fn record(&mut self, outcome: ImportOutcome) {
        match outcome.error {
            None => self.accepted += 1,
            Some(e) => {
                self.rejected += 1;
                self.errors.push(ImportFailure {
                    index: outcome.index,
                    error: e.to_string(),
                });
            }
        }
    }
}

/// An import that stopped early. `result` holds every outcome produced
/// before the context fired or a worker died.
#[derive(Error, Debug)]
#[error("import stopped after {} of {total} transactions: {cause}", .result.processed())]
pub struct PartialImport {
    pub result: ImportResult,
    pub total: usize,
    #[source]
    pub cause: LedgerError,
}

pub struct BulkImportEngine {
    ledger: Arc<Ledger>,
    default_workers: usize,
}

impl BulkImportEngine {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            default_workers: DEFAULT_WORKERS,
        }
    }

    /// Worker count used when a caller passes zero.
    pub fn with_default_workers(mut self, workers: usize) -> Self {
        self.default_workers = workers.max(1);
        self
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Validates and commits `transactions` with `workers` concurrent tasks.
    ///
    /// Per-item failures never abort siblings; they are counted as rejected.
    /// If `ctx` fires before every item was processed, no new jobs are
    /// dispatched, in-flight commits finish, and the partial result comes
    /// back inside [`PartialImport`]. A context that fires after the last
    /// outcome still yields `Ok`: nothing was left undone.
    ///
    /// Any outcome missing for another reason (a worker that died) is also
    /// reported as [`PartialImport`], never as `Ok`.
    pub async fn import(
        &self,
        ctx: &Context,
        transactions: Vec<Transaction>,
        workers: usize,
    ) -> Result<ImportResult, PartialImport> {
        let total = transactions.len();
        if total == 0 {
            return Ok(ImportResult::default());
        }

        let workers = if workers == 0 {
            self.default_workers
        } else {
            workers
        };
        let submitted_at = Utc::now();
        tracing::info!(total, workers, "starting bulk import");

        let (job_tx, job_rx) = mpsc::channel::<ImportJob>(1);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (outcome_tx, mut outcome_rx) = mpsc::channel::<ImportOutcome>(workers);

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            pool.spawn(run_worker(
                worker,
                ctx.clone(),
                Arc::clone(&self.ledger),
                Arc::clone(&job_rx),
                outcome_tx.clone(),
            ));
        }
        drop(job_rx);
        drop(outcome_tx);

        let dispatch = async move {
            for (index, tx) in transactions.into_iter().enumerate() {
                let job = ImportJob {
                    index,
                    transaction: tx.stamped(submitted_at),
                };
                tokio::select! {
                    biased;
                    interrupt = ctx.done() => {
                        tracing::warn!(index, ?interrupt, "import dispatch stopped");
                        break;
                    }
                    sent = job_tx.send(job) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
        };

        let collect = async {
            let mut result = ImportResult::default();
            while let Some(outcome) = outcome_rx.recv().await {
                result.record(outcome);
            }
            result
        };

        let ((), result) = tokio::join!(dispatch, collect);

        let mut worker_failure = None;
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "import worker panicked");
                worker_failure.get_or_insert_with(|| format!("import worker failed: {e}"));
            }
        }

        if result.accepted > 0 {
            self.ledger.invalidate_reports();
        }

        let processed = result.processed();
        tracing::info!(
            accepted = result.accepted,
            rejected = result.rejected,
            total,
            "bulk import finished"
        );

        if processed == total as u64 {
            return Ok(result);
        }
        let cause = match (ctx.err(), worker_failure) {
            (Some(interrupt), _) => interrupt.into(),
            (None, Some(failure)) => LedgerError::Internal(failure),
            (None, None) => {
                LedgerError::Internal("import ended with missing outcomes".to_string())
            }
        };
        Err(PartialImport {
            result,
            total,
            cause,
        })
    }
}

async fn run_worker(
    worker: usize,
    ctx: Context,
    ledger: Arc<Ledger>,
    jobs: Arc<Mutex<mpsc::Receiver<ImportJob>>>,
    outcomes: mpsc::Sender<ImportOutcome>,
) {
    loop {
        let job = {
            let mut jobs = jobs.lock().await;
            tokio::select! {
                biased;
                _ = ctx.done() => None,
                job = jobs.recv() => job,
            }
        };
        let Some(job) = job else {
            break;
        };

        // Runs to completion even if the context fires meanwhile.
        let outcome = process(&ledger, job).await;
        if outcomes.send(outcome).await.is_err() {
            break;
        }
    }
    tracing::trace!(worker, "import worker exiting");
}

async fn process(ledger: &Ledger, job: ImportJob) -> ImportOutcome {
    let ImportJob { index, transaction } = job;

    if let Err(e) = transaction.validate(ledger.validation_mode()) {
        tracing::debug!(index, error = %e, "rejected invalid transaction");
        return ImportOutcome {
            index,
            error: Some(e.into()),
        };
    }

    let error = match ledger.commit(transaction).await {
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(index, error = %e, "commit rejected");
            Some(e)
        }
    };
    ImportOutcome { index, error }
}

//! Pass execution engine
//!
//! [`PassRunner`] measures one pass; [`RunScheduler`] runs N passes in
//! batches of overlapping tasks and returns their outcomes in pass order.
//! A pass that panics is recorded as a [`PassFailure`] without disturbing
//! the other passes of its batch.

pub mod pass;

pub use pass::{sample_latency, PassExecutor, PassRunner, PassSettings};
pub use crate::models::{PassFailure, PassOutcome};

use crate::{
    logging::{Logger, PerformanceLogger},
    models::{outcome_id, Config},
    output::ReportSink,
    types::PassId,
};
use futures::future::join_all;
use std::any::Any;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Runs passes in consecutive batches
pub struct RunScheduler {
    executor: Arc<dyn PassExecutor>,
    report: Option<Arc<ReportSink>>,
    progress: Option<mpsc::UnboundedSender<PassOutcome>>,
    logger: Logger,
    perf: PerformanceLogger,
}

impl RunScheduler {
    pub fn new(executor: Arc<dyn PassExecutor>, config: &Config) -> Self {
        Self {
            executor,
            report: None,
            progress: None,
            logger: Logger::with_config("SCHED".to_string(), config),
            perf: PerformanceLogger::new(config),
        }
    }

    /// Append every finished pass to a report file
    pub fn with_report(mut self, report: Arc<ReportSink>) -> Self {
        self.report = Some(report);
        self
    }

    /// Forward every finished pass, in order, as soon as its batch completes
    pub fn with_progress(mut self, progress: mpsc::UnboundedSender<PassOutcome>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run `runs` passes, at most `concurrency` at a time
    pub async fn run(&self, runs: u32, concurrency: u32) -> Vec<PassOutcome> {
        let mut outcomes = Vec::new();

        for range in batch_ranges(runs, concurrency) {
            let (first, last) = (*range.start(), *range.end());
            let batch: Vec<PassId> = range.collect();

            self.logger
                .info(&format!("Starting runs {}-{} of {}", first, last, runs))
                .field("batch_size", batch.len())
                .log()
                .await;

            let started = Instant::now();
            let finished = self.run_batch(&batch).await;
            self.perf
                .log_batch_summary(batch.len(), started.elapsed(), Some(&format!("runs {}-{}", first, last)))
                .await;

            for outcome in finished {
                self.publish(&outcome).await;
                outcomes.push(outcome);
            }
        }

        outcomes.sort_by_key(outcome_id);
        outcomes
    }

    async fn run_batch(&self, batch: &[PassId]) -> Vec<PassOutcome> {
        let handles: Vec<_> = batch
            .iter()
            .map(|&pass_id| {
                let executor = Arc::clone(&self.executor);
                tokio::spawn(async move { executor.run_pass(pass_id).await })
            })
            .collect();

        let joined = join_all(handles).await;

        let mut outcomes: Vec<PassOutcome> = batch
            .iter()
            .zip(joined)
            .map(|(&pass_id, joined)| {
                joined.map_err(|e| {
                    let reason = if e.is_panic() {
                        format!("pass panicked: {}", panic_message(e.into_panic()))
                    } else {
                        "pass was cancelled".to_string()
                    };
                    PassFailure::new(pass_id, reason)
                })
            })
            .collect();

        outcomes.sort_by_key(outcome_id);
        outcomes
    }

    async fn publish(&self, outcome: &PassOutcome) {
        if let Err(failure) = outcome {
            self.logger
                .error(&failure.to_string())
                .field("pass_id", failure.pass_id)
                .log()
                .await;
        }

        if let Some(report) = &self.report {
            if let Err(e) = report.append_pass(outcome).await {
                self.logger
                    .warn(&format!("Could not write run {} to report: {}", outcome_id(outcome), e))
                    .error_info(&e)
                    .log()
                    .await;
            }
        }

        if let Some(progress) = &self.progress {
            // A closed receiver only means nobody is watching
            let _ = progress.send(outcome.clone());
        }
    }
}

/// Consecutive pass id ranges of at most `lanes` ids covering `1..=runs`
fn batch_ranges(runs: PassId, lanes: u32) -> impl Iterator<Item = RangeInclusive<PassId>> {
    let lanes = lanes.max(1);
    let mut next = Some(1);
    std::iter::from_fn(move || {
        let first = next.filter(|&id| id <= runs)?;
        let last = runs.min(first.saturating_add(lanes - 1));
        next = last.checked_add(1);
        Some(first..=last)
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

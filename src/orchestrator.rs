use crate::{
    aggregate::ResultAggregator,
    batch_plan::BatchPlan,
    config::Config,
    error::ValidationError,
    model::{Batch, BatchOutcome, ItemResult, Settlement, SourceItem},
    progress::{EstimatorSettings, ProgressEstimator, ProgressWindow},
    recognizer::{Readiness, Recognizer},
    report::{BatchReport, JobReport},
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Job bookkeeping. Only the orchestrator mutates it, and only while `running`.
#[derive(Debug, Default)]
pub struct JobState {
    pub batches: Vec<Batch>,
    pub current_batch_index: usize,
    pub progress_percent: f64,
    pub running: bool,
    pub success_count: usize,
    pub failed_count: usize,
}

/// Read-only view handed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub running: bool,
    pub current_batch: usize,
    pub total_batches: usize,
    pub progress_percent: f64,
    pub success_count: usize,
    pub failed_count: usize,
}

impl JobSnapshot {
    pub const IDLE: JobSnapshot = JobSnapshot {
        running: false,
        current_batch: 0,
        total_batches: 0,
        progress_percent: 0.0,
        success_count: 0,
        failed_count: 0,
    };
}

/// Checks that hold before any job state exists: the service is ready and
/// there is something to submit.
pub fn validate_submission(
    items: &[SourceItem],
    readiness: Readiness,
) -> Result<(), ValidationError> {
    if !readiness.is_ready() {
        return Err(ValidationError::NotReady {
            ocr: readiness.ocr_configured,
            llm: readiness.llm_configured,
        });
    }
    if items.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    Ok(())
}

pub struct JobOutput {
    pub results: Vec<ItemResult>,
    pub report: JobReport,
}

/// Drives one job at a time: partition, sequential dispatch with synthetic
/// progress, aggregation, and a single completion callback.
pub struct Orchestrator<R: Recognizer> {
    cfg: Config,
    recognizer: R,
    settings: EstimatorSettings,
    state: RefCell<JobState>,
    snapshot_tx: watch::Sender<JobSnapshot>,
}

impl<R: Recognizer> Orchestrator<R> {
    pub fn new(cfg: &Config, recognizer: R) -> Self {
        let (snapshot_tx, _) = watch::channel(JobSnapshot::IDLE);
        Self {
            cfg: cfg.clone(),
            recognizer,
            settings: EstimatorSettings::from_config(cfg),
            state: RefCell::new(JobState::default()),
            snapshot_tx,
        }
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Last published snapshot.
    pub fn snapshot(&self) -> JobSnapshot {
        *self.snapshot_tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    /// Validates, partitions `items`, and runs every batch to completion.
    pub async fn start<F>(
        &self,
        items: Vec<SourceItem>,
        readiness: Readiness,
        on_complete: F,
    ) -> Result<JobOutput, ValidationError>
    where
        F: FnOnce(&[ItemResult]),
    {
        validate_submission(&items, readiness)?;
        if self.is_running() {
            return Err(ValidationError::AlreadyRunning);
        }
        let plan = BatchPlan::from_items(&self.cfg, items)?;
        self.run_plan(plan, on_complete).await
    }

    /// Runs an already-partitioned plan. A plan with no batches completes
    /// immediately at 100%.
    pub async fn run_plan<F>(
        &self,
        plan: BatchPlan,
        on_complete: F,
    ) -> Result<JobOutput, ValidationError>
    where
        F: FnOnce(&[ItemResult]),
    {
        let started = Instant::now();
        let max_batch_size = plan.max_batch_size;
        let item_count = plan.item_count();
        let total = plan.batches.len();
        self.begin(plan.batches)?;
        let mut guard = RunGuard {
            orch: self,
            armed: true,
        };

        info!("job start items={item_count} batches={total} max_batch_size={max_batch_size}");

        let mut agg = ResultAggregator::new();
        for index in 0..total {
            let batch = {
                let mut st = self.state.borrow_mut();
                st.current_batch_index = index;
                st.batches[index].clone()
            };
            self.publish();

            let (outcome, error) = self.dispatch(&batch, index, total).await;
            if let Some(err) = &error {
                warn!("batch {}/{} failed: {}", index + 1, total, err);
            }
            info!(
                "batch {}/{} done: success={} failed={}",
                index + 1,
                total,
                outcome.success_count,
                outcome.failed_count
            );

            agg.push(index, outcome, error);
            {
                let mut st = self.state.borrow_mut();
                st.success_count = agg.success_count();
                st.failed_count = agg.failed_count();
            }
            self.publish();
        }

        let (results, batch_reports) = self.complete(agg);
        info!(
            "job done total={} success={} failed={}",
            results.len(),
            batch_reports.iter().map(|b| b.success_count).sum::<usize>(),
            batch_reports.iter().map(|b| b.failed_count).sum::<usize>()
        );

        on_complete(&results);
        *self.state.borrow_mut() = JobState::default();
        guard.armed = false;

        let report = JobReport {
            job_name: self.cfg.global.job_name.clone(),
            total: results.len(),
            success_count: results.iter().filter(|r| r.success).count(),
            failed_count: results.iter().filter(|r| !r.success).count(),
            max_batch_size,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            batch_reports,
        };
        Ok(JobOutput { results, report })
    }

    fn begin(&self, batches: Vec<Batch>) -> Result<(), ValidationError> {
        let mut st = self.state.borrow_mut();
        if st.running {
            return Err(ValidationError::AlreadyRunning);
        }
        *st = JobState {
            batches,
            running: true,
            ..JobState::default()
        };
        drop(st);
        self.publish();
        Ok(())
    }

    /// One outstanding call; the estimator ticks only while it is in flight.
    async fn dispatch(
        &self,
        batch: &Batch,
        index: usize,
        total: usize,
    ) -> (BatchOutcome, Option<String>) {
        let window = ProgressWindow::for_batch(index, total);
        self.set_progress(window.start);

        let mut estimator = ProgressEstimator::start(window, self.settings);
        let call = self.recognizer.recognize_batch(batch);
        tokio::pin!(call);

        let settled = loop {
            tokio::select! {
                biased;
                res = &mut call => break res,
                pct = estimator.tick() => {
                    debug!("batch {} estimated progress {:.1}%", index + 1, pct);
                    self.set_progress(pct);
                }
            }
        };

        let end = estimator.stop();
        // The final window end is reported by `complete`.
        if index + 1 < total {
            self.set_progress(end);
        }

        let settlement = match settled {
            Ok(outcome) => Settlement::Recognized(outcome),
            Err(err) => Settlement::Failed(err),
        };
        settlement.into_outcome(batch)
    }

    fn set_progress(&self, pct: f64) {
        let changed = {
            let mut st = self.state.borrow_mut();
            if !st.running || pct <= st.progress_percent {
                false
            } else {
                st.progress_percent = pct.min(100.0);
                true
            }
        };
        if changed {
            self.publish();
        }
    }

    fn complete(&self, agg: ResultAggregator) -> (Vec<ItemResult>, Vec<BatchReport>) {
        {
            let mut st = self.state.borrow_mut();
            st.progress_percent = 100.0;
            st.running = false;
        }
        self.publish();
        agg.finish()
    }

    fn publish(&self) {
        let snap = {
            let st = self.state.borrow();
            JobSnapshot {
                running: st.running,
                current_batch: if st.batches.is_empty() {
                    0
                } else {
                    st.current_batch_index + 1
                },
                total_batches: st.batches.len(),
                progress_percent: st.progress_percent,
                success_count: st.success_count,
                failed_count: st.failed_count,
            }
        };
        self.snapshot_tx.send_if_modified(|cur| {
            if *cur == snap {
                false
            } else {
                *cur = snap;
                true
            }
        });
    }
}

/// Puts the orchestrator back to idle if a job future is dropped or unwinds
/// before it completes.
struct RunGuard<'a, R: Recognizer> {
    orch: &'a Orchestrator<R>,
    armed: bool,
}

impl<R: Recognizer> Drop for RunGuard<'_, R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(mut st) = self.orch.state.try_borrow_mut() else {
            return;
        };
        *st = JobState::default();
        drop(st);
        warn!("job interrupted before completion; orchestrator reset to idle");
        self.orch.publish();
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use voucher_batch::{
    error::BatchError,
    model::{Batch, BatchOutcome, ItemResult, SourceItem},
    orchestrator::JobSnapshot,
    recognizer::{Readiness, Recognizer},
};

/// What the scripted recognizer does for one call.
#[derive(Debug, Clone)]
pub enum Step {
    Ok { secs: u64 },
    Fail { secs: u64, error: BatchError },
    Short { secs: u64 },
}

/// Plays back `Step`s in order; unscripted calls succeed after one second.
/// Items whose name starts with "bad" come back as per-item failures.
pub struct ScriptedRecognizer {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Vec<String>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    readiness: Readiness,
}

impl ScriptedRecognizer {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            readiness: Readiness::READY,
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn health(&self) -> anyhow::Result<Readiness> {
        Ok(self.readiness)
    }

    async fn recognize_batch(&self, batch: &Batch) -> Result<BatchOutcome, BatchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push(batch.items.iter().map(|i| i.name.clone()).collect());

        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Ok { secs: 1 });

        let secs = match &step {
            Step::Ok { secs } | Step::Fail { secs, .. } | Step::Short { secs } => *secs,
        };
        tokio::time::sleep(Duration::from_secs(secs)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match step {
            Step::Ok { .. } => Ok(recognized(batch)),
            Step::Fail { error, .. } => Err(error),
            Step::Short { .. } => {
                let mut outcome = recognized(batch);
                outcome.results.pop();
                Ok(BatchOutcome::from_results(outcome.results))
            }
        }
    }
}

fn recognized(batch: &Batch) -> BatchOutcome {
    let results = batch
        .items
        .iter()
        .map(|item| {
            if item.name.starts_with("bad") {
                ItemResult::failed(&item.name, "OCR found no text")
            } else {
                ItemResult::ok(&item.name, serde_json::json!({ "batch": batch.index }))
            }
        })
        .collect();
    BatchOutcome::from_results(results)
}

pub fn items(n: usize) -> Vec<SourceItem> {
    (1..=n)
        .map(|i| SourceItem::new(format!("voucher_{i:03}.jpg"), vec![0u8; i]))
        .collect()
}

pub fn timeout() -> BatchError {
    BatchError::Transport("timeout".into())
}

/// Collects snapshots until the job reports completion.
pub async fn collect(mut rx: tokio::sync::watch::Receiver<JobSnapshot>) -> Vec<JobSnapshot> {
    let mut seen = Vec::new();
    while rx.changed().await.is_ok() {
        let snap = *rx.borrow_and_update();
        seen.push(snap);
        if !snap.running && snap.progress_percent >= 100.0 {
            break;
        }
    }
    seen
}

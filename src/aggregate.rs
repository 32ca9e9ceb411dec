use crate::{
    model::{BatchOutcome, ItemResult},
    report::BatchReport,
};

/// Concatenates batch outcomes in dispatch order. No dedup, no reordering.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Vec<ItemResult>,
    batches: Vec<BatchReport>,
    success_count: usize,
    failed_count: usize,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, batch_index: usize, outcome: BatchOutcome, error: Option<String>) {
        self.success_count += outcome.success_count;
        self.failed_count += outcome.failed_count;
        self.batches.push(BatchReport {
            batch_index,
            size: outcome.results.len(),
            success_count: outcome.success_count,
            failed_count: outcome.failed_count,
            error,
        });
        self.results.extend(outcome.results);
    }

    pub fn results(&self) -> &[ItemResult] {
        &self.results
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn batch_reports(&self) -> &[BatchReport] {
        &self.batches
    }

    pub fn finish(self) -> (Vec<ItemResult>, Vec<BatchReport>) {
        (self.results, self.batches)
    }
}

use crate::error::BatchError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One input document. Identity is its position in the submission order.
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub name: String,
    pub size: u64,
    pub data: Arc<[u8]>,
}

impl SourceItem {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self {
            name: name.into(),
            size,
            data: data.into(),
        }
    }
}

/// An ordered, non-empty run of items sent together in one remote call.
#[derive(Debug, Clone)]
pub struct Batch {
    pub index: usize,
    pub items: Vec<SourceItem>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(|i| i.size).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    pub success: bool,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemResult {
    pub fn ok(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            success: true,
            name: name.into(),
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            name: name.into(),
            payload: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub success_count: usize,
    pub failed_count: usize,
    pub results: Vec<ItemResult>,
}

impl BatchOutcome {
    /// Builds an outcome with counts derived from `results`.
    pub fn from_results(results: Vec<ItemResult>) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        Self {
            success_count,
            failed_count: results.len() - success_count,
            results,
        }
    }

    /// Every item of `batch` fails with the same error text.
    pub fn all_failed(batch: &Batch, error: &str) -> Self {
        let results = batch
            .items
            .iter()
            .map(|item| ItemResult::failed(&item.name, error))
            .collect();
        Self::from_results(results)
    }
}

/// How one dispatched batch settled.
#[derive(Debug)]
pub enum Settlement {
    Recognized(BatchOutcome),
    Failed(BatchError),
}

impl Settlement {
    /// Checks the result count against the batch and folds failures into
    /// per-item results, so every settlement yields exactly `batch.len()` items.
    pub fn into_outcome(self, batch: &Batch) -> (BatchOutcome, Option<String>) {
        match self {
            Settlement::Recognized(outcome) if outcome.results.len() == batch.len() => {
                (BatchOutcome::from_results(outcome.results), None)
            }
            Settlement::Recognized(outcome) => {
                let err = BatchError::Protocol {
                    expected: batch.len(),
                    got: outcome.results.len(),
                };
                Settlement::Failed(err).into_outcome(batch)
            }
            Settlement::Failed(err) => {
                let msg = err.to_string();
                (BatchOutcome::all_failed(batch, &msg), Some(msg))
            }
        }
    }
}

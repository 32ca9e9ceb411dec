use crate::{
    config::Config,
    error::ValidationError,
    model::{Batch, SourceItem},
};
use serde::{Deserialize, Serialize};

/// Splits `items` into consecutive batches of at most `max` items.
/// Every batch but the last holds exactly `max`; order is preserved.
pub fn partition(items: Vec<SourceItem>, max: usize) -> Result<Vec<Batch>, ValidationError> {
    if max < 1 {
        return Err(ValidationError::InvalidBatchSize(max));
    }

    let mut batches = Vec::with_capacity(items.len().div_ceil(max));
    let mut current = Vec::with_capacity(max.min(items.len()));

    for item in items {
        current.push(item);
        if current.len() == max {
            batches.push(Batch {
                index: batches.len(),
                items: std::mem::take(&mut current),
            });
        }
    }
    if !current.is_empty() {
        batches.push(Batch {
            index: batches.len(),
            items: current,
        });
    }

    Ok(batches)
}

#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub max_batch_size: usize,
    pub batches: Vec<Batch>,
}

impl BatchPlan {
    pub fn from_items(cfg: &Config, items: Vec<SourceItem>) -> Result<Self, ValidationError> {
        let max_batch_size = cfg.batching.max_batch_size;
        Ok(Self {
            max_batch_size,
            batches: partition(items, max_batch_size)?,
        })
    }

    pub fn empty(max_batch_size: usize) -> Self {
        Self {
            max_batch_size,
            batches: Vec::new(),
        }
    }

    pub fn item_count(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            max_batch_size: self.max_batch_size,
            item_count: self.item_count(),
            batches: self
                .batches
                .iter()
                .map(|b| PlannedBatch {
                    index: b.index,
                    bytes: b.total_bytes(),
                    items: b.items.iter().map(|i| i.name.clone()).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    pub max_batch_size: usize,
    pub item_count: usize,
    pub batches: Vec<PlannedBatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedBatch {
    pub index: usize,
    pub bytes: u64,
    pub items: Vec<String>,
}

pub mod http;
pub mod types;

use crate::{
    error::BatchError,
    model::{Batch, BatchOutcome},
};
use anyhow::Result;
use async_trait::async_trait;

pub use types::{HealthOut, Readiness, WireBatchResult, WireItemResult};

/// The remote batch recognition call. Implementations bound each call with
/// their own timeout and report it as a `BatchError`.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn health(&self) -> Result<Readiness>;
    async fn recognize_batch(&self, batch: &Batch) -> Result<BatchOutcome, BatchError>;
}

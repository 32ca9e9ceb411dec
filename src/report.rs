use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_name: String,
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub max_batch_size: usize,
    pub elapsed_ms: u64,
    pub batch_reports: Vec<BatchReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_index: usize,
    pub size: usize,
    pub success_count: usize,
    pub failed_count: usize,
    #[serde(default)]
    pub error: Option<String>,
}

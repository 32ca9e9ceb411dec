use crate::model::{BatchOutcome, ItemResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    pub ocr_configured: bool,
    pub llm_configured: bool,
}

impl Readiness {
    pub const READY: Readiness = Readiness {
        ocr_configured: true,
        llm_configured: true,
    };

    pub fn is_ready(&self) -> bool {
        self.ocr_configured && self.llm_configured
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthOut {
    pub status: String,
    pub ocr_configured: bool,
    pub llm_configured: bool,
}

impl From<HealthOut> for Readiness {
    fn from(h: HealthOut) -> Self {
        Self {
            ocr_configured: h.ocr_configured,
            llm_configured: h.llm_configured,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireItemResult {
    pub success: bool,
    pub filename: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub ocr_text: Option<String>,
    #[serde(default)]
    pub voucher_data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<WireItemResult> for ItemResult {
    fn from(w: WireItemResult) -> Self {
        if !w.success {
            return ItemResult {
                success: false,
                name: w.filename,
                payload: None,
                error: Some(w.error.unwrap_or_else(|| "recognition failed".to_string())),
            };
        }
        let payload = serde_json::json!({
            "image_url": w.image_url,
            "ocr_text": w.ocr_text,
            "voucher_data": w.voucher_data,
        });
        ItemResult::ok(w.filename, payload)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireBatchResult {
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub results: Vec<WireItemResult>,
}

impl From<WireBatchResult> for BatchOutcome {
    /// Counts are recomputed from the results rather than trusted.
    fn from(w: WireBatchResult) -> Self {
        BatchOutcome::from_results(w.results.into_iter().map(ItemResult::from).collect())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

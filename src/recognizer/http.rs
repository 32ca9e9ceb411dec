use super::{
    Recognizer,
    types::{ErrorBody, HealthOut, Readiness, WireBatchResult},
};
use crate::{
    config::Config,
    error::BatchError,
    model::{Batch, BatchOutcome, SourceItem},
};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

pub struct HttpRecognizer {
    client: reqwest::Client,
    batch_url: String,
    health_url: String,
    timeout_seconds: u64,
}

impl HttpRecognizer {
    pub fn new(cfg: &Config) -> Result<Self> {
        let base = cfg.remote.base_url.trim_end_matches('/');
        if base.is_empty() {
            return Err(anyhow!("remote.base_url is empty"));
        }
        let mut builder = reqwest::Client::builder();
        if cfg.remote.timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(cfg.remote.timeout_seconds));
        }
        let client = builder.build().with_context(|| "building HTTP client")?;
        Ok(Self {
            client,
            batch_url: join_url(base, &cfg.remote.batch_path),
            health_url: join_url(base, &cfg.remote.health_path),
            timeout_seconds: cfg.remote.timeout_seconds,
        })
    }

    fn build_form(batch: &Batch) -> Result<Form, BatchError> {
        let mut form = Form::new();
        for item in &batch.items {
            let part = Part::bytes(item.data.to_vec())
                .file_name(item.name.clone())
                .mime_str(mime_for(item))
                .map_err(|e| BatchError::Transport(format!("invalid MIME type: {e}")))?;
            form = form.part("files", part);
        }
        Ok(form)
    }

    fn map_send_error(&self, err: reqwest::Error) -> BatchError {
        if err.is_timeout() {
            BatchError::Timeout {
                seconds: self.timeout_seconds,
            }
        } else {
            BatchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn health(&self) -> Result<Readiness> {
        debug!("GET {}", self.health_url);
        let resp = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .with_context(|| format!("health check: {}", self.health_url))?
            .error_for_status()
            .with_context(|| "health check status")?;
        let health: HealthOut = resp.json().await.with_context(|| "parsing health JSON")?;
        debug!(status = %health.status, "health");
        Ok(health.into())
    }

    async fn recognize_batch(&self, batch: &Batch) -> Result<BatchOutcome, BatchError> {
        let form = Self::build_form(batch)?;
        debug!(
            "POST {} batch={} items={} bytes={}",
            self.batch_url,
            batch.index,
            batch.len(),
            batch.total_bytes()
        );

        let resp = self
            .client
            .post(&self.batch_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(BatchError::Status {
                status: status.as_u16(),
                detail: error_detail(&body, status.canonical_reason()),
            });
        }

        let wire: WireBatchResult =
            serde_json::from_slice(&body).map_err(|e| BatchError::Decode(e.to_string()))?;
        Ok(wire.into())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base, path.trim_start_matches('/'))
}

/// Prefers the `detail` field of a JSON error body, then the raw body text.
pub fn error_detail(body: &[u8], reason: Option<&str>) -> String {
    if let Ok(err) = serde_json::from_slice::<ErrorBody>(body) {
        return match err.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if !text.is_empty() {
        return text;
    }
    reason.unwrap_or("request failed").to_string()
}

pub fn mime_for(item: &SourceItem) -> &'static str {
    let ext = item
        .name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "bmp" => "image/bmp",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

use crate::{config::Config, model::SourceItem};
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use time::format_description::well_known::Rfc3339;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Stable id for a submission: effective config plus item names, sizes and contents.
pub fn job_id(cfg: &Config, items: &[SourceItem]) -> String {
    let mut h = Sha256::new();
    h.update(sha256_hex(cfg.normalized_for_hash().as_bytes()));
    for item in items {
        h.update(item.name.as_bytes());
        h.update(item.size.to_le_bytes());
        h.update(&item.data[..]);
    }
    format!("{:x}", h.finalize())
}

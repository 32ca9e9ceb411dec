use crate::{config::Config, model::SourceItem};
use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file left out of the submission because it exceeds `input.max_file_bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Default)]
pub struct LoadedItems {
    pub items: Vec<SourceItem>,
    pub skipped: Vec<SkippedFile>,
}

impl LoadedItems {
    /// Logs one warning per skipped file. Call once a subscriber is installed.
    pub fn warn_skipped(&self, max_file_bytes: u64) {
        for s in &self.skipped {
            warn!(
                "skipping {}: {} bytes exceeds max_file_bytes {}",
                s.path.display(),
                s.bytes,
                max_file_bytes
            );
        }
    }
}

/// Expands `inputs` (files or directories, in order) into submission-ordered
/// items. Directory entries are taken non-recursively, sorted by name.
pub fn load_items(cfg: &Config, inputs: &[PathBuf]) -> Result<LoadedItems> {
    let mut loaded = LoadedItems::default();
    for input in inputs {
        validate_input(cfg, input)?;
        if input.is_dir() {
            for path in list_dir(input)? {
                if accepts_extension(cfg, &path) {
                    push_item(cfg, &path, &mut loaded)?;
                } else {
                    debug!("skipping unsupported file: {}", path.display());
                }
            }
        } else if accepts_extension(cfg, input) {
            push_item(cfg, input, &mut loaded)?;
        } else {
            return Err(anyhow!("unsupported file type: {}", input.display()));
        }
    }
    Ok(loaded)
}

fn push_item(cfg: &Config, path: &Path, loaded: &mut LoadedItems) -> Result<()> {
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    if cfg.input.max_file_bytes > 0 && meta.len() > cfg.input.max_file_bytes {
        loaded.skipped.push(SkippedFile {
            path: path.to_path_buf(),
            bytes: meta.len(),
        });
        return Ok(());
    }
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    loaded.items.push(SourceItem::new(name, data));
    Ok(())
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read_dir {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn accepts_extension(cfg: &Config, path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
        return false;
    };
    cfg.input
        .extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(ext))
}

fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    Ok(())
}

fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}

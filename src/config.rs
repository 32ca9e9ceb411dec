use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub batching: Batching,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub remote: Remote,
    #[serde(default)]
    pub input: Input,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batching.max_batch_size < 1 {
            bail!("batching.max_batch_size must be >= 1");
        }
        if self.progress.tick_millis == 0 {
            bail!("progress.tick_millis must be > 0");
        }
        if !(self.progress.step_percent > 0.0) {
            bail!("progress.step_percent must be > 0");
        }
        let cap = self.progress.cap_fraction;
        if !(cap > 0.0 && cap < 1.0) {
            bail!("progress.cap_fraction must be in (0, 1), got {cap}");
        }
        Ok(())
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub job_name: String,
    pub overwrite: bool,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            job_name: "default".into(),
            overwrite: false,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub out_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batching {
    pub max_batch_size: usize,
}
impl Default for Batching {
    fn default() -> Self {
        Self { max_batch_size: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub tick_millis: u64,
    pub step_percent: f64,
    pub cap_fraction: f64,
}
impl Default for Progress {
    fn default() -> Self {
        Self {
            tick_millis: 2000,
            step_percent: 2.0,
            cap_fraction: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remote {
    pub base_url: String,
    pub batch_path: String,
    pub health_path: String,
    /// Per batch call. 0 disables the client timeout.
    pub timeout_seconds: u64,
    pub check_health: bool,
}
impl Default for Remote {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".into(),
            batch_path: "/recognize/batch".into(),
            health_path: "/health".into(),
            timeout_seconds: 600,
            check_health: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Input {
    pub extensions: Vec<String>,
    pub max_file_bytes: u64,
}
impl Default for Input {
    fn default() -> Self {
        Self {
            extensions: ["jpg", "jpeg", "png", "bmp", "webp", "gif"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_file_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub write_results_json: bool,
    pub write_report_json: bool,
    pub write_index_json: bool,
    pub results_filename: String,
    pub report_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_results_json: true,
            write_report_json: true,
            write_index_json: true,
            results_filename: "results.json".into(),
            report_filename: "report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debug {
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_effective_config: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub reject_url_inputs: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
        }
    }
}

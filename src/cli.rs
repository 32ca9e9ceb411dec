use crate::{
    batch_plan::BatchPlan,
    config::Config,
    orchestrator::{JobOutput, JobSnapshot, Orchestrator, validate_submission},
    recognizer::{Readiness, Recognizer, http::HttpRecognizer},
    source::{LoadedItems, load_items},
    util::{ensure_dir, job_id, now_rfc3339},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "voucher-batch")]
#[command(about = "Batch orchestrator for a slow voucher recognition service")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./voucher-batch.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Query the recognition service's readiness.
    Doctor {},
    /// Print how the inputs would be split into batches.
    Plan {
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// Recognize all inputs and write the aggregated results.
    Run {
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            doctor(&cfg)
        }
        Command::Plan { input } => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            plan(&cfg, input)
        }
        Command::Run { input, out_dir } => run(&args, &cfg, input, out_dir.as_deref()),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("voucher-batch.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("voucher-batch.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .with_context(|| "building tokio runtime")
}

fn doctor(cfg: &Config) -> Result<()> {
    let recognizer = HttpRecognizer::new(cfg)?;
    let readiness = runtime()?.block_on(recognizer.health())?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "base_url": cfg.remote.base_url,
            "ocr_configured": readiness.ocr_configured,
            "llm_configured": readiness.llm_configured,
            "ready": readiness.is_ready(),
        }))?
    );
    Ok(())
}

fn plan(cfg: &Config, inputs: &[PathBuf]) -> Result<()> {
    let loaded = load_items(cfg, inputs)?;
    loaded.warn_skipped(cfg.input.max_file_bytes);
    let plan = BatchPlan::from_items(cfg, loaded.items)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "plan": plan.summary(),
            "skipped": loaded.skipped,
        }))?
    );
    Ok(())
}

/// Everything `run` decides before touching the output directory.
pub struct PreparedRun {
    pub loaded: LoadedItems,
    pub job_id: String,
    pub job_dir: PathBuf,
}

/// Loads inputs and rejects the submission (not ready, nothing to send, job
/// dir already present) without creating anything on disk, so a failed
/// attempt can be retried as-is.
pub fn prepare_run(
    cfg: &Config,
    inputs: &[PathBuf],
    out_override: Option<&Path>,
    readiness: Readiness,
) -> Result<PreparedRun> {
    let loaded = load_items(cfg, inputs)?;
    validate_submission(&loaded.items, readiness)?;
    let job_id = job_id(cfg, &loaded.items);

    let out_root = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
    let job_dir = out_root.join(&job_id);

    if job_dir.exists() && !cfg.global.overwrite {
        return Err(anyhow!(
            "job_dir already exists and overwrite=false: {}",
            job_dir.display()
        ));
    }

    Ok(PreparedRun {
        loaded,
        job_id,
        job_dir,
    })
}

fn run(args: &Args, cfg: &Config, inputs: &[PathBuf], out_override: Option<&Path>) -> Result<()> {
    let recognizer = HttpRecognizer::new(cfg)?;
    let rt = runtime()?;
    let readiness = if cfg.remote.check_health {
        rt.block_on(recognizer.health())?
    } else {
        Readiness::READY
    };

    let PreparedRun {
        loaded,
        job_id,
        job_dir,
    } = prepare_run(cfg, inputs, out_override, readiness)?;

    ensure_dir(&job_dir)?;
    ensure_dir(&job_dir.join("logs"))?;

    let log_path = resolve_log_path(cfg, Some(&job_dir));
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    loaded.warn_skipped(cfg.input.max_file_bytes);
    info!(
        "job_id={job_id} items={} skipped={} out={}",
        loaded.items.len(),
        loaded.skipped.len(),
        job_dir.display()
    );

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(job_dir.join("effective-config.toml"), raw)?;
    }

    let started = now_rfc3339();
    let LoadedItems { items, skipped } = loaded;

    let output = rt.block_on(async {
        let orch = Orchestrator::new(cfg, recognizer);
        drive_with_progress(&orch, items, readiness).await
    })?;

    if cfg.output.write_results_json {
        std::fs::write(
            job_dir.join(&cfg.output.results_filename),
            serde_json::to_string_pretty(&output.results)?,
        )?;
    }

    if cfg.output.write_report_json {
        std::fs::write(
            job_dir.join(&cfg.output.report_filename),
            serde_json::to_string_pretty(&output.report)?,
        )?;
    }

    if cfg.output.write_index_json {
        let index = serde_json::json!({
            "job_id": job_id,
            "started": started,
            "finished": now_rfc3339(),
            "results": cfg.output.results_filename,
            "report": cfg.output.report_filename,
            "skipped": &skipped,
        });
        std::fs::write(job_dir.join("index.json"), serde_json::to_string_pretty(&index)?)?;
    }

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "job_id": job_id,
                "job_dir": job_dir,
                "total": output.report.total,
                "success_count": output.report.success_count,
                "failed_count": output.report.failed_count,
                "skipped": skipped.len(),
            }))?
        );
    }

    Ok(())
}

/// Runs the job while rendering snapshots from the orchestrator's watch channel.
async fn drive_with_progress<R: Recognizer>(
    orch: &Orchestrator<R>,
    items: Vec<crate::model::SourceItem>,
    readiness: Readiness,
) -> Result<JobOutput> {
    let mut rx = orch.subscribe();
    let job = orch.start(items, readiness, |results| {
        info!("recognition finished: {} results", results.len());
    });
    tokio::pin!(job);

    loop {
        tokio::select! {
            out = &mut job => {
                eprintln!();
                return out.map_err(anyhow::Error::from);
            }
            Ok(()) = rx.changed() => {
                let snap = *rx.borrow_and_update();
                render_progress(&snap);
            }
        }
    }
}

fn render_progress(snap: &JobSnapshot) {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(
        stderr,
        "\r[batch {}/{}] {:>3}%  ok={} failed={}",
        snap.current_batch,
        snap.total_batches,
        snap.progress_percent.floor() as u32,
        snap.success_count,
        snap.failed_count
    );
    let _ = stderr.flush();
}

fn resolve_log_path(cfg: &Config, job_dir: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    if let Some(job_dir) = job_dir {
        return Some(job_dir.join("logs").join("voucher-batch.log"));
    }

    Some(PathBuf::from(&cfg.paths.out_dir).join("voucher-batch.log"))
}

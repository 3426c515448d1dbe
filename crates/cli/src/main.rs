use alttext_core::api::ApiError;
use alttext_core::config;
use alttext_core::models::{BatchCursor, RunId};
use alttext_core::pipeline::Engine;
use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::bulk;
use cli::report;
use cli::settings::{self as settings_cmd, SettingsPatch};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    let token = cli
        .token
        .or_else(|| std::env::var("ALTTEXT_TOKEN").ok())
        .unwrap_or_default();
    let engine = Engine::open(cfg).await?;
    debug!(config = ?cli.config, "engine opened");

    match cli.command {
        Commands::Scan { paths, json } => run_scan(&engine, paths, json).await,
        Commands::Run {
            offset,
            run,
            all,
            json,
        } => run_batch(&engine, &token, offset, run, all, json).await,
        Commands::Select { ids, json } => run_select(&engine, &token, &ids, json).await,
        Commands::Settings { action } => run_settings(&engine, &token, action).await,
        Commands::Status {
            missing,
            limit,
            json,
        } => run_status(&engine, missing, limit, json).await,
        Commands::Log { tail, json } => run_log(&engine, tail, json),
    }
}

#[derive(Parser)]
#[command(name = "alttext")]
#[command(about = "Fill in missing image alt text from titles and filenames", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    /// Access token (falls back to ALTTEXT_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import image files into the catalog
    Scan {
        /// Directories to walk; defaults to scan.include from config
        paths: Vec<String>,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Generate missing alt text, one batch or the whole catalog
    Run {
        /// Cursor to resume from
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,
        /// Run id printed by the previous call, to continue that run
        #[arg(long)]
        run: Option<RunId>,
        /// Keep going until the catalog is exhausted
        #[arg(long, default_value_t = false)]
        all: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate alt text for selected assets only
    Select {
        /// Comma-separated asset IDs
        #[arg(long)]
        ids: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change engine settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Alt text status per asset
    Status {
        /// Only assets without alt text
        #[arg(long, default_value_t = false)]
        missing: bool,
        /// Maximum number of rows
        #[arg(long)]
        limit: Option<u64>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recent audit log entries
    Log {
        /// Number of entries
        #[arg(long, default_value_t = 20)]
        tail: usize,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print all settings
    Show,
    /// Print one setting
    Get { key: String },
    /// Change settings; values are validated and clamped
    Set {
        /// title_only | title_site | filename_clean
        #[arg(long)]
        mode: Option<String>,
        /// Items per batch (5-200)
        #[arg(long)]
        batch_size: Option<i64>,
        /// Allowed MIME types (comma-separated)
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        allowed_mimes: Option<Vec<String>>,
        /// Write the audit log
        #[arg(long)]
        enable_logging: Option<bool>,
        /// Generate alt text when assets are imported
        #[arg(long)]
        auto_generate: Option<bool>,
    },
}

fn fail(err: ApiError) -> anyhow::Error {
    eprintln!("{}", serde_json::to_string(&err.body()).unwrap_or_default());
    anyhow::anyhow!("request failed ({}): {}", err.status(), err)
}

async fn run_scan(engine: &Engine, paths: Vec<String>, json: bool) -> Result<()> {
    let summary = engine.import(&paths).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "scan: discovered {}, imported {}, refreshed {}, alt generated {}",
            summary.discovered, summary.imported, summary.refreshed, summary.generated
        );
    }
    Ok(())
}

async fn run_batch(
    engine: &Engine,
    token: &str,
    offset: i64,
    run: Option<RunId>,
    all: bool,
    json: bool,
) -> Result<()> {
    if all {
        let start = u64::try_from(offset).map_err(|_| {
            fail(ApiError::Validation(format!(
                "offset must be non-negative, got {offset}"
            )))
        })?;
        let cursor = BatchCursor { offset: start, run };
        let summary = bulk::run_all(engine, token, cursor, json).await.map_err(fail)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!(
                "Done. Processed: {} | Skipped: {} ({} batches)",
                summary.processed, summary.skipped, summary.calls
            );
        }
        return Ok(());
    }

    let resp = bulk::run_once(engine, token, offset, run).await.map_err(fail)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else {
        println!(
            "offset {}: fetched {}, processed {}, skipped {}; next offset {}{}",
            resp.offset,
            resp.count,
            resp.processed,
            resp.skipped,
            resp.next_offset,
            if resp.more {
                format!(" (more, --run {})", resp.run)
            } else {
                " (done)".to_string()
            }
        );
    }
    Ok(())
}

async fn run_select(engine: &Engine, token: &str, ids: &str, json: bool) -> Result<()> {
    let ids = bulk::parse_ids(ids)?;
    let resp = bulk::select(engine, token, ids).await.map_err(|e| {
        eprintln!("{{\"error\":\"{}\"}}", e.selection_code());
        anyhow::anyhow!("selection failed: {e}")
    })?;
    if json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
    } else {
        println!(
            "{} images updated, {} skipped.",
            resp.processed, resp.skipped
        );
    }
    Ok(())
}

async fn run_settings(engine: &Engine, token: &str, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let settings = settings_cmd::show(engine).await.map_err(fail)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::Get { key } => match settings_cmd::get(engine, &key).await? {
            Some(value) => println!("{value}"),
            None => anyhow::bail!("unknown setting: {key}"),
        },
        SettingsAction::Set {
            mode,
            batch_size,
            allowed_mimes,
            enable_logging,
            auto_generate,
        } => {
            let patch = SettingsPatch {
                mode,
                batch_size,
                allowed_mimes,
                enable_logging,
                auto_generate_on_upload: auto_generate,
            };
            if patch.is_empty() {
                anyhow::bail!("nothing to change");
            }
            let settings = settings_cmd::set(engine, token, &patch).await.map_err(fail)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}

async fn run_status(engine: &Engine, missing: bool, limit: Option<u64>, json: bool) -> Result<()> {
    let report = report::status(engine, missing, limit).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    for asset in &report.assets {
        println!(
            "{:>6}  {:<8} {:<14} {}  {}",
            asset.id,
            asset.status,
            asset.mime,
            asset.filename,
            asset.alt.as_deref().unwrap_or("")
        );
    }
    println!(
        "total {}, alt present {}, missing {}",
        report.counts.total, report.counts.present, report.counts.missing
    );
    Ok(())
}

fn run_log(engine: &Engine, tail: usize, json: bool) -> Result<()> {
    let lines = report::log_tail(engine, tail)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
    } else if lines.is_empty() {
        println!("audit log is empty ({})", engine.audit.path().display());
    } else {
        for l in lines {
            println!("[{}] {}: Asset {} alt set to: {}", l.timestamp, l.context, l.asset_id, l.alt);
        }
    }
    Ok(())
}

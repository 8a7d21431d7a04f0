//! asi: run the autonomous control loop
//!
//! Usage:
//!   asi                                   → run until Ctrl-C
//!   asi --ticks 100 --json                → run 100 ticks, print the final state
//!   asi --task '{"type":"visual","nodeId":"n1","data":{"faces":3}}'
//!   asi --dump-config > asi.toml          → write the default config

use asi::Heartbeat;
use asi_runtime::{AsiConfig, InitConfig, Scheduler};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "asi",
    about = "Autonomous control loop: parts, task queue, knowledge store",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(long, default_value = "asi.toml")]
    config: PathBuf,

    /// Dump default config as TOML and exit
    #[arg(long, default_value_t = false)]
    dump_config: bool,

    /// Stop after this many ticks (default: run until Ctrl-C)
    #[arg(long)]
    ticks: Option<u64>,

    /// Queue a task before the loop starts, as JSON (repeatable)
    #[arg(long = "task")]
    tasks: Vec<String>,

    /// Start with the safety lockdown engaged
    #[arg(long, default_value_t = false)]
    lockdown: bool,

    /// Print the final inspection snapshot as JSON on exit
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Write logs to a file (in addition to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.dump_config {
        println!("{}", AsiConfig::default().to_toml());
        return Ok(());
    }

    let _log_guard = init_tracing(cli.log_file.as_deref())?;
    let config = AsiConfig::load(&cli.config);
    let heartbeat = config.heartbeat.clone();

    let scheduler = Arc::new(Scheduler::new(config));
    for raw in &cli.tasks {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| anyhow::anyhow!("invalid --task {}: {}", raw, e))?;
        if !scheduler.add_task_value(&value) {
            warn!("Task not admitted: {}", raw);
        }
    }

    let mut init = InitConfig::new();
    if heartbeat.enabled {
        init = init.part("heartbeat", Heartbeat::new(Arc::downgrade(&scheduler), heartbeat.node));
    }
    scheduler.init(init);
    if cli.lockdown {
        scheduler.lockdown(true);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            ctrl_c.cancel();
        }
    });

    scheduler.clone().run(cancel, cli.ticks).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&scheduler.inspect())?);
    }
    Ok(())
}

fn init_tracing(
    log_file: Option<&std::path::Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "asi=info,asi_runtime=info".into());
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let Some(path) = log_file else {
        tracing_subscriber::registry().with(filter).with(stderr).init();
        return Ok(None);
    };

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(std::path::Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("--log-file needs a file name: {}", path.display()))?;
    std::fs::create_dir_all(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use zbakd::config::AppConfig;
use zbakd::core::{
    Alerter, BackupPipeline, Monitor, Notifier, ProcessRunner, TtyBell, ZfsAutobackupCli,
    notifications,
};
use zbakd::logging::{self, LogConfig};
use zbakd::{adapters, daemon};

#[derive(Parser)]
#[command(name = "zbakd")]
#[command(about = "Triggers zfs-autobackup jobs on disk hotplug events", long_about = None)]
struct Cli {
    /// Path to the TOML config file (required except for --stop)
    config_file: Option<PathBuf>,

    #[command(flatten)]
    mode: Mode,

    /// Enable verbose (debug) logging
    #[arg(long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
#[group(multiple = false)]
struct Mode {
    /// Start as a daemon process
    #[arg(long)]
    start: bool,

    /// Stop a running daemon process
    #[arg(long)]
    stop: bool,

    /// Restart a running daemon process
    #[arg(long)]
    restart: bool,

    /// Run a one-time backup for all connected configured pools, then exit
    #[arg(long)]
    test: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.mode.stop || cli.mode.restart {
        if let Err(error) = daemon::stop_existing() {
            eprintln!("Error stopping daemon: {error:#}");
            return ExitCode::FAILURE;
        }
        if cli.mode.stop {
            return ExitCode::SUCCESS;
        }
    }

    let Some(config_file) = &cli.config_file else {
        eprintln!("error: config file argument is required");
        return ExitCode::FAILURE;
    };
    let config = match AppConfig::load(config_file) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Error in configuration file: {error}");
            return ExitCode::FAILURE;
        }
    };

    // Fork before the runtime exists; tokio does not survive a fork.
    if (cli.mode.start || cli.mode.restart)
        && let Err(error) = daemon::daemonize()
    {
        eprintln!("Failed to daemonize: {error:#}");
        return ExitCode::FAILURE;
    }

    logging::init(LogConfig {
        json: cli.json,
        verbose: cli.verbose,
    });

    let outcome = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime.block_on(run(config, cli.mode.test)),
        Err(error) => Err(error).context("failed to start async runtime"),
    };

    // A stale pid file would make a later --stop signal a recycled pid.
    if cli.mode.start || cli.mode.restart {
        daemon::remove_pid_file();
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig, test: bool) -> Result<()> {
    let config = Arc::new(config);
    let pipeline = BackupPipeline::new(Arc::new(ProcessRunner), Arc::new(ZfsAutobackupCli::new()));
    let alerter: Arc<dyn Alerter> = Arc::new(TtyBell::default());

    if test {
        let monitor = Monitor::new(config, pipeline, Vec::new(), alerter);
        return monitor.run_once().await;
    }

    let notifiers: Vec<Arc<dyn Notifier>> = notifications::create_notifiers(&config);
    let monitor = Monitor::new(config, pipeline, notifiers, alerter);

    // Unbounded: the udev thread must never block behind a slow backup.
    let (tx, rx) = mpsc::unbounded_channel();
    let adapter = adapters::get_adapter();
    adapter.start(tx);

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    monitor.run(rx, shutdown).await;
    adapter.stop();

    Ok(())
}

fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        tracing::info!("received shutdown signal");
        shutdown.cancel();
    });
}

//! linelog Server Binary
//!
//! Starts the TCP server for linelog.

use std::fs::OpenOptions;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use linelog::config::{ConfigBuilder, StoreSyncStrategy};
use linelog::signal::SignalListener;
use linelog::{daemon, Config, Result, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// linelog Server
#[derive(Parser, Debug)]
#[command(name = "linelog-server")]
#[command(about = "Append newline-delimited messages to a shared log and echo it back")]
#[command(version)]
struct Args {
    /// Run as a daemon (detach from the terminal; stderr goes to /dev/null,
    /// so pair with --log-file to keep logs)
    #[arg(short = 'd', long = "daemon")]
    daemon: bool,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TCP port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (default: every interface)
    #[arg(long)]
    host: Option<IpAddr>,

    /// Store backing file
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    /// Seconds between timestamp records
    #[arg(long)]
    announce_secs: Option<u64>,

    /// Store sync strategy (every-write, os-buffered)
    #[arg(long)]
    sync: Option<StoreSyncStrategy>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.log_file.as_deref()) {
        eprintln!("Failed to open log file: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!("linelog server v{}", linelog::VERSION);

    match run(args) {
        Ok(()) => {
            tracing::info!("Server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing/logging, to `log_file` when given
///
/// The file is opened before daemonizing, so a relative path resolves
/// against the starting directory.
fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,linelog=debug"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            subscriber.with_ansi(false).with_writer(Arc::new(file)).init();
        }
        None => subscriber.with_writer(io::stderr).init(),
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;

    // Before any thread exists, so every thread inherits the mask
    let signals = SignalListener::install()?;

    let server = Server::bind(config.clone())?;

    if config.daemonize {
        tracing::info!("Daemonizing");
        daemon::daemonize()?;
    }

    let signal_thread = signals.spawn(server.shutdown_handle())?;

    // `run` always leaves the shutdown flag set, which stops the listener
    let outcome = server.run();
    if signal_thread.join().is_err() {
        tracing::error!("Signal listener panicked");
    }

    outcome
}

fn build_config(args: &Args) -> Result<Config> {
    let base = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let mut builder = ConfigBuilder::from_config(base).daemonize(args.daemon);
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    if let Some(host) = args.host {
        builder = builder.bind_host(host);
    }
    if let Some(path) = &args.data_file {
        builder = builder.data_file(path);
    }
    if let Some(secs) = args.announce_secs {
        builder = builder.announce_interval(Duration::from_secs(secs));
    }
    if let Some(sync) = args.sync {
        builder = builder.sync_strategy(sync);
    }
    let mut config = builder.build();

    // The daemon runs from `/`
    if config.data_file.is_relative() {
        config.data_file = std::env::current_dir()?.join(&config.data_file);
    }

    config.validate()?;
    Ok(config)
}

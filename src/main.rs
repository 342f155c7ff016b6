//! radiant-input - Input Virtualization Engine
//!
//! Host bridge binary: speaks JSON lines on stdin/stdout with the browser
//! shell's UI process and logs to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use radiant_input::config::{Config, LoggingConfig};
use radiant_input::server::InputRouter;
use radiant_input::surface::stdio::{self, StdioBridge};
use radiant_input::surface::{SettingsSnapshot, SharedSettings};

/// Command-line arguments for radiant-input
#[derive(Parser, Debug)]
#[command(name = "radiant-input")]
#[command(version, about = "Input virtualization engine for the Radiant browser shell", long_about = None)]
pub struct Args {
    /// Configuration file path (defaults to the per-user config dir)
    #[arg(short, long, env = "RADIANT_INPUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Shortcut platform (auto|macos|other)
    #[arg(long, env = "RADIANT_PLATFORM")]
    pub platform: Option<String>,

    /// Virtual cursor sensitivity
    #[arg(long, env = "RADIANT_SENSITIVITY")]
    pub sensitivity: Option<f64>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Write logs to file (in addition to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    pub print_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        let text = toml::to_string_pretty(&Config::default_config())
            .context("Failed to render default config")?;
        print!("{}", text);
        return Ok(());
    }

    let config_path = args.config.clone().or_else(Config::default_path);
    let (config, load_error) = match &config_path {
        Some(path) if path.exists() => match Config::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Config::default_config(), Some(e)),
        },
        _ => (Config::default_config(), None),
    };

    // Override config with CLI args
    let config = config.with_overrides(
        args.platform.clone(),
        args.sensitivity,
        args.log_format.clone(),
        args.log_file.clone(),
    );
    if let Err(e) = config.validate().context("Invalid configuration") {
        eprintln!("{}", radiant_input::utils::format_user_error(&e));
        return Err(e);
    }

    let _log_guard = match init_logging(args.verbose, &config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", radiant_input::utils::format_user_error(&e));
            return Err(e);
        }
    };

    info!("════════════════════════════════════════════════════════");
    info!("  radiant-input v{}", env!("CARGO_PKG_VERSION"));
    info!("  Built: {} {}", env!("BUILD_DATE"), env!("BUILD_TIME"));
    info!("  Commit: {}", env!("GIT_HASH"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");

    if let Some(e) = load_error {
        tracing::warn!("Failed to load config: {:#}, using defaults", e);
    } else if let Some(path) = &config_path {
        info!("Configuration: {}", path.display());
    }

    radiant_input::utils::log_startup_diagnostics(&config);
    tracing::debug!("Config: {:?}", config);

    let settings = Arc::new(SharedSettings::new(SettingsSnapshot::from_config(&config)));
    let (outbound_tx, outbound_rx) = mpsc::channel(config.throttle.dispatch_queue.max(1));
    let bridge = Arc::new(StdioBridge::new(outbound_tx));
    let router = InputRouter::spawn(&config, bridge.clone(), settings.clone());

    info!("Serving host on stdin/stdout");
    let serve = stdio::serve(
        tokio::io::stdin(),
        tokio::io::stdout(),
        router,
        bridge,
        settings,
        outbound_rx,
    );

    tokio::select! {
        result = serve => {
            if let Err(e) = result {
                eprintln!("{}", radiant_input::utils::format_user_error(&e));
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    info!("radiant-input shut down");
    Ok(())
}

fn init_logging(verbose: u8, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let log_level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("radiant_input={},warn", log_level))
    });

    // Stdout carries the host protocol, so the console layer writes to stderr
    let console_layer = match logging.format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        "compact" => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let (file_layer, guard) = match &logging.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = if logging.format == "json" {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .boxed()
            } else {
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = &logging.log_file {
        info!("Logging to file: {}", path.display());
    }

    Ok(guard)
}

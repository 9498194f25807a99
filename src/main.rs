use clap::{Parser, Subcommand};
use log_relay::bus::dbus::{DbusSink, DbusSource, connect};
use log_relay::bus::{SignalPublisher, SignalSubscriber};
use log_relay::error::Result;
use log_relay::extract::ContentExtractor;
#[cfg(feature = "metrics")]
use log_relay::metrics::RelayMetrics;
use log_relay::relay::{DashboardLoop, RelayLoop};
use log_relay::settings::{RelaySettings, SettingsLoader};
use log_relay::watch::ChangeWatcher;
use log_relay::writer::append_entry;
use std::backtrace::Backtrace;
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;
#[cfg(feature = "metrics")]
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Relay appended log content to local subscribers over D-Bus signals.
#[derive(Parser)]
#[command(name = "log-relay", version, about)]
struct Cli {
    /// Settings file (TOML, YAML or JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Append one timestamped entry to the log file.
    Write,
    /// Publish the log file's content on every change.
    Watch,
    /// Print every log payload received from the bus.
    Dashboard,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();
    install_panic_hook();

    let result = match load_settings(cli.config) {
        Ok(settings) => match cli.mode {
            Mode::Write => write(&settings),
            Mode::Watch => watch(&settings).await,
            Mode::Dashboard => dashboard(&settings).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "log-relay failed");
            ExitCode::FAILURE
        }
    }
}

/// How often the time-since-last-publish gauge is refreshed.
#[cfg(feature = "metrics")]
const GAUGE_REFRESH: Duration = Duration::from_secs(10);

#[cfg(feature = "metrics")]
fn relay_metrics() -> RelayMetrics {
    RelayMetrics::new(opentelemetry::global::meter("log-relay"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn install_panic_hook() {
    let prev = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let backtrace = Backtrace::force_capture();
        error!(panic = %info, %backtrace, "log-relay crashed");
        prev(info);
    }));
}

fn load_settings(config: Option<PathBuf>) -> Result<RelaySettings> {
    let loader = SettingsLoader::new();
    match config {
        Some(path) => loader.with_file(path).load(),
        None => loader.load(),
    }
}

fn write(settings: &RelaySettings) -> Result<()> {
    append_entry(&settings.log_path)?;
    println!(
        "Log entry written successfully to {}",
        settings.log_path.display()
    );
    Ok(())
}

async fn watch(settings: &RelaySettings) -> Result<()> {
    let changes = ChangeWatcher::watch(&settings.log_path)?;
    let sink = DbusSink::connect(settings.bus, settings.bus_address.as_deref()).await?;

    let relay = RelayLoop::new(
        changes,
        ContentExtractor::new(&settings.log_path, settings.max_payload),
        SignalPublisher::new(sink, settings.channel.clone()),
    );

    #[cfg(feature = "metrics")]
    let relay = {
        let metrics = relay_metrics();
        let gauge = metrics.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(GAUGE_REFRESH);
            loop {
                ticker.tick().await;
                gauge.update_since_last_publish();
            }
        });
        relay.with_metrics(metrics)
    };

    println!("Monitoring {} for changes...", settings.log_path.display());
    tokio::select! {
        summary = relay.run() => {
            info!(published = summary.published, "watcher closed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
        }
    }
    Ok(())
}

async fn dashboard(settings: &RelaySettings) -> Result<()> {
    let conn = connect(settings.bus, settings.bus_address.as_deref()).await?;
    let source = DbusSource::subscribe(&conn, &settings.channel).await?;
    let subscriber = SignalSubscriber::new(source, settings.channel.clone())
        .with_poll_interval(settings.poll_interval());

    let dashboard = DashboardLoop::new(subscriber, |payload: &str| {
        println!("Received message: {}", payload);
    });
    #[cfg(feature = "metrics")]
    let dashboard = dashboard.with_metrics(relay_metrics());

    println!("Listening for D-Bus signals...");
    tokio::select! {
        summary = dashboard.run() => {
            Err(log_relay::error::RelayError::BusUnavailable(format!(
                "bus connection closed after {} messages",
                summary.received
            )))
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            Ok(())
        }
    }
}

//! ==============================================================================
//! main.rs - lifepath panel cli
//! ==============================================================================
//!
//! purpose:
//!     command line stand-in for the printer's browser panel. `watch` keeps a
//!     live view of the device (log tail, wifi, schedule); the other commands
//!     are the panel's one-shot buttons.
//!
//! relationships:
//!     - uses: config.rs (panel.toml), client.rs, poller.rs, mirror.rs
//!
//! architecture (watch):
//!
//!     ┌──────────────────────────────────────────────────────────┐
//!     │                    cli (this file)                        │
//!     │  ┌──────────────┐  ┌──────────────┐  ┌────────────────┐  │
//!     │  │ startup      │  │ log poller   │  │ status mirror  │  │
//!     │  │ (first read) │  │ (1s cycle)   │  │ (optional)     │  │
//!     │  └──────┬───────┘  └──────┬───────┘  └───────┬────────┘  │
//!     │         └─────────────────┼──────────────────┘           │
//!     │                    ┌──────┴──────┐                        │
//!     │                    │   client    │ <- client.rs           │
//!     │                    └──────┬──────┘                        │
//!     └───────────────────────────┼──────────────────────────────┘
//!                                 │ http
//!                          ┌──────┴──────┐
//!                          │   printer   │
//!                          └─────────────┘
//!
//! ==============================================================================

use lifepath_panel::config::PanelConfig;
use lifepath_panel::domain::{is_low_on_chars, remaining_chars, MESSAGE_MAX_CHARS};
use lifepath_panel::{mirror, DeviceStatusClient, HttpDevice, LogPoller, TracingObserver};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lifepath-panel", about = "Control panel for the lifepath receipt printer")]
struct Cli {
    /// path to panel.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// device base url, overrides the config file
    #[arg(long, global = true)]
    device: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// tail device logs and show wifi/schedule (default)
    Watch {
        /// also serve the cached status locally
        #[arg(long)]
        mirror: bool,
    },
    /// fetch logs, wifi and schedule once and print them
    Status,
    /// send a message to be printed
    Submit {
        message: String,
        /// YYYY-MM-DD stamped on the receipt instead of today
        #[arg(long)]
        date: Option<String>,
    },
    /// print a joke now
    PrintJoke,
    /// show the daily print time, or change it
    Schedule {
        /// new daily print time, HH:MM
        #[arg(long)]
        set: Option<String>,
    },
    /// clear the device's wifi credentials and restart it
    ForgetWifi {
        #[arg(long)]
        yes: bool,
    },
}

type Client = DeviceStatusClient<HttpDevice>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // step 1: load configuration
    let (mut config, source) = PanelConfig::load_or_default(cli.config.as_deref())?;
    if let Some(device) = &cli.device {
        config.device.base_url = device.clone();
    }

    // step 2: logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str())),
        )
        .init();
    match &source {
        Some(path) => tracing::debug!("[CONFIG] Loaded from {}", path.display()),
        None => tracing::debug!("[CONFIG] No config file found - using defaults"),
    }

    // step 3: client
    let device = HttpDevice::new(&config.device.base_url, config.device.timeout_ms)
        .context("invalid device address")?;
    let observer = Arc::new(TracingObserver::new(config.logging.show_logs));
    let client = Arc::new(DeviceStatusClient::with_observer(device, observer));

    match cli.command.unwrap_or(Command::Watch { mirror: false }) {
        Command::Watch { mirror } => watch(client, &config, mirror || config.mirror.enabled).await,
        Command::Status => status(&client, &config).await,
        Command::Submit { message, date } => submit(&client, &message, date.as_deref()).await,
        Command::PrintJoke => {
            let result = client.print_joke().await?;
            println!("{}", result.trim());
            Ok(())
        }
        Command::Schedule { set } => schedule(&client, set.as_deref()).await,
        Command::ForgetWifi { yes } => {
            if !yes {
                bail!("this clears the device's wifi credentials and restarts it; pass --yes to confirm");
            }
            client.forget_wifi().await?;
            println!("WiFi credentials forgotten. Device will restart now.");
            Ok(())
        }
    }
}

async fn watch(client: Arc<Client>, config: &PanelConfig, with_mirror: bool) -> Result<()> {
    config.log_summary();

    if with_mirror {
        let bind = config.mirror.bind.clone();
        let mirror_client = client.clone();
        tokio::spawn(async move {
            if let Err(e) = mirror::serve(&bind, mirror_client).await {
                tracing::error!("[MIRROR] server error: {:#}", e);
            }
        });
    }

    // startup does the immediate log poll; the poller takes over one period later
    client.startup(config.polling.startup_delay()).await;
    let period = config.polling.log_interval();
    let poller = LogPoller::spawn_at(client.clone(), Instant::now() + period, period);

    tracing::info!("[RUNTIME] Watching {} (ctrl-c to stop)", client.device().base_url());
    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    poller.shutdown().await;
    Ok(())
}

async fn status(client: &Client, config: &PanelConfig) -> Result<()> {
    client.startup(config.polling.startup_delay()).await;
    let snapshot = client.snapshot().await;

    println!("WiFi:      {} ({})", snapshot.wifi.ssid_label(), snapshot.wifi.ip_label());
    match &snapshot.schedule {
        Some(schedule) => {
            println!("Print at:  {}", schedule.daily_print_time);
            println!("{}", schedule.last_print().line(chrono::Local::now().date_naive()));
        }
        None => println!("Schedule:  unavailable"),
    }
    println!("---- device log ----");
    println!("{}", snapshot.logs.display_text());
    Ok(())
}

async fn submit(client: &Client, message: &str, date: Option<&str>) -> Result<()> {
    let remaining = remaining_chars(message);
    if remaining < 0 {
        bail!("message is {} characters over the {} limit", -remaining, MESSAGE_MAX_CHARS);
    }
    if is_low_on_chars(message) {
        tracing::debug!("[SUBMIT] {} characters left", remaining);
    }
    match date {
        Some(date) => client.submit_message_with_date(message, date).await?,
        None => client.submit_message(message).await?,
    }
    println!("Message sent ({} characters left)", remaining);
    Ok(())
}

async fn schedule(client: &Client, set: Option<&str>) -> Result<()> {
    if let Some(time) = set {
        client.save_schedule(time).await?;
        println!("Print time saved: {}", time);
        return Ok(());
    }
    match client.load_schedule().await {
        Some(schedule) => {
            println!("Daily print time: {}", schedule.daily_print_time);
            println!("{}", schedule.last_print().line(chrono::Local::now().date_naive()));
            Ok(())
        }
        None => bail!("could not load the schedule from the device"),
    }
}

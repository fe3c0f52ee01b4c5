use clap::{Parser, Subcommand};
use stock_watch_agent::{
    config::AppConfig,
    runtime::{setup_logger, Runtime},
    watchlist, SessionOutcome,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "stock-agent", version, about = "LLM agent that manages a stock watchlist")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one agent session for a natural-language request
    Ask {
        /// e.g. "watch Tesla with 3% threshold"
        request: Vec<String>,
        /// Print every transcript entry
        #[arg(long)]
        verbose: bool,
    },
    /// Show the watchlist
    Watchlist,
    /// Remove a symbol from the watchlist
    Remove { symbol: String },
    /// Replace a symbol's alert band
    SetThresholds { symbol: String, low: f64, high: f64 },
    /// Show stored agent logs, most recent last
    Logs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Re-price the watchlist once, or keep checking with --watch
    Monitor {
        #[arg(long)]
        watch: bool,
    },
    /// Show or change stored settings
    Settings {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long)]
        notifications: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    setup_logger("warn,stock_watch_agent=info");

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let runtime = Runtime::build(&config).await?;

    match cli.command {
        Command::Ask { request, verbose } => {
            let request = request.join(" ");
            let report = runtime.agent.run(&request).await?;

            if verbose {
                for entry in &report.transcript {
                    println!("[{}] {}", entry.kind, entry.payload);
                }
                println!();
            }

            println!("{}", report.outcome.summary());
            if !matches!(report.outcome, SessionOutcome::Succeeded { .. }) {
                std::process::exit(1);
            }
        }

        Command::Watchlist => {
            let list = runtime.store.load_watchlist().await?;
            println!("{}", watchlist::render(&list));
        }

        Command::Remove { symbol } => {
            if watchlist::remove(runtime.store.as_ref(), &symbol).await? {
                println!("Removed {}", symbol.to_uppercase());
            } else {
                println!("{} not found in watchlist", symbol.to_uppercase());
            }
        }

        Command::SetThresholds { symbol, low, high } => {
            let entry =
                watchlist::update_thresholds(runtime.store.as_ref(), &symbol, low, high).await?;
            println!(
                "{}: Low={:.2}, High={:.2}",
                entry.symbol, entry.low, entry.high
            );
        }

        Command::Logs { limit } => {
            let logs = runtime.store.load_logs().await?;
            let start = logs.len().saturating_sub(limit);
            for entry in &logs[start..] {
                println!(
                    "{} {} {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.iteration,
                    entry.kind,
                    entry.payload
                );
            }
        }

        Command::Monitor { watch } => {
            if watch {
                info!("Starting price monitor, Ctrl-C to stop");
                let handle = runtime.monitor.clone().spawn();
                tokio::signal::ctrl_c().await?;
                handle.abort();
            } else {
                let report = runtime.monitor.check_all().await?;
                for alert in &report.alerts {
                    println!("ALERT {}", alert.message());
                }
                for failure in &report.failures {
                    println!("{}", failure);
                }
                println!(
                    "Checked {} symbols, {} prices updated, {} alerts",
                    report.checked,
                    report.updated,
                    report.alerts.len()
                );
            }
        }

        Command::Settings {
            api_key,
            interval,
            notifications,
        } => {
            let mut settings = runtime.store.load_settings().await?;
            let changed = api_key.is_some() || interval.is_some() || notifications.is_some();

            if let Some(key) = api_key {
                settings.credential = key.trim().to_string();
            }
            if let Some(minutes) = interval {
                settings.check_interval_minutes = minutes.max(1);
            }
            if let Some(enabled) = notifications {
                settings.notifications_enabled = enabled;
            }
            if changed {
                runtime.store.save_settings(&settings).await?;
            }

            println!(
                "API key: {}",
                if settings.credential.is_empty() { "not set" } else { "set" }
            );
            println!("Check interval: {} min", settings.check_interval_minutes);
            println!("Notifications: {}", settings.notifications_enabled);
        }
    }

    Ok(())
}

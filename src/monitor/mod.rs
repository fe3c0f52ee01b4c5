//! Background price monitor
//!
//! Re-fetches every watched symbol, records the fresh price, and raises
//! one aggregated notification for all symbols outside their band.

use crate::models::{Breach, Watchlist};
use crate::quotes::QuoteSource;
use crate::state::StateStore;
use crate::watchlist;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Name of the periodic check task
pub const CHECK_TASK_NAME: &str = "stockCheck";

/// Fire-and-forget alert sink
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Emits alerts as log events
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, title: &str, message: &str) {
        warn!(title = %title, "{}", message);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceAlert {
    pub symbol: String,
    pub price: f64,
    pub low: f64,
    pub high: f64,
    pub breach: Breach,
}

impl PriceAlert {
    pub fn message(&self) -> String {
        format!(
            "{} price ${:.2} is {} threshold range ({:.2}, {:.2})",
            self.symbol, self.price, self.breach, self.low, self.high
        )
    }
}

/// Outcome of one monitoring pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorReport {
    pub checked: usize,
    pub updated: usize,
    pub alerts: Vec<PriceAlert>,
    pub failures: Vec<String>,
}

impl MonitorReport {
    pub fn notification_text(&self) -> Option<String> {
        if self.alerts.is_empty() {
            return None;
        }
        Some(
            self.alerts
                .iter()
                .map(PriceAlert::message)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

pub struct PriceMonitor {
    quotes: Arc<dyn QuoteSource>,
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
}

impl PriceMonitor {
    pub fn new(
        quotes: Arc<dyn QuoteSource>,
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            quotes,
            store,
            notifier,
        }
    }

    /// One pass over the whole watchlist
    pub async fn check_all(&self) -> Result<MonitorReport> {
        let list: Watchlist = self.store.load_watchlist().await?;
        let mut report = MonitorReport {
            checked: list.len(),
            ..MonitorReport::default()
        };

        if list.is_empty() {
            debug!("Watchlist empty, nothing to check");
            return Ok(report);
        }

        let mut prices = Vec::with_capacity(list.len());
        for entry in list.values() {
            let price = match self.quotes.get_price(&entry.symbol).await {
                Ok(Some(price)) => price,
                Ok(None) => {
                    report
                        .failures
                        .push(format!("{}: could not fetch price", entry.symbol));
                    continue;
                }
                Err(e) => {
                    warn!(symbol = %entry.symbol, error = %e, "Price fetch failed");
                    report
                        .failures
                        .push(format!("{}: could not fetch price ({})", entry.symbol, e));
                    continue;
                }
            };

            if let Some(breach) = entry.breach(price) {
                report.alerts.push(PriceAlert {
                    symbol: entry.symbol.clone(),
                    price,
                    low: entry.low,
                    high: entry.high,
                    breach,
                });
            }
            prices.push((entry.symbol.clone(), price));
        }

        report.updated = watchlist::record_prices(self.store.as_ref(), &prices).await?;

        if let Some(text) = report.notification_text() {
            let settings = self.store.load_settings().await?;
            if settings.notifications_enabled {
                self.notifier.notify("Stock Price Alert", &text);
            } else {
                debug!(alerts = report.alerts.len(), "Notifications disabled, alerts not sent");
            }
        }

        info!(
            checked = report.checked,
            updated = report.updated,
            alerts = report.alerts.len(),
            failures = report.failures.len(),
            "Price check complete"
        );
        Ok(report)
    }

    /// Run `check_all` forever, re-reading the interval from settings each tick
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(task = CHECK_TASK_NAME, "Price monitor started");
            loop {
                let minutes = match self.store.load_settings().await {
                    Ok(settings) => settings.check_interval_minutes.max(1),
                    Err(e) => {
                        error!(task = CHECK_TASK_NAME, error = %e, "Failed to read settings");
                        5
                    }
                };
                tokio::time::sleep(Duration::from_secs(minutes * 60)).await;

                if let Err(e) = self.check_all().await {
                    error!(task = CHECK_TASK_NAME, error = %e, "Price check failed");
                }
            }
        })
    }
}

//! Watchlist operations on top of the state store
//!
//! Writers load, modify and save the whole watchlist. There is no isolation
//! between concurrent writers; the last save wins.

use crate::error::AgentError;
use crate::models::{normalize_symbol, Watchlist, WatchlistEntry};
use crate::state::StateStore;
use crate::Result;
use tracing::info;

/// Insert or replace the entry keyed by its symbol
pub async fn upsert(store: &dyn StateStore, entry: WatchlistEntry) -> Result<()> {
    let mut watchlist = store.load_watchlist().await?;
    let replaced = watchlist.insert(entry.symbol.clone(), entry.clone()).is_some();
    store.save_watchlist(&watchlist).await?;

    info!(symbol = %entry.symbol, low = entry.low, high = entry.high, replaced, "Watchlist entry saved");
    Ok(())
}

/// Returns false when the symbol was not on the watchlist
pub async fn remove(store: &dyn StateStore, symbol: &str) -> Result<bool> {
    let symbol = normalize_symbol(symbol);
    let mut watchlist = store.load_watchlist().await?;

    if watchlist.remove(&symbol).is_none() {
        return Ok(false);
    }

    store.save_watchlist(&watchlist).await?;
    info!(symbol = %symbol, "Watchlist entry removed");
    Ok(true)
}

/// Edit an existing entry's band. Rejects bands with low >= high.
pub async fn update_thresholds(
    store: &dyn StateStore,
    symbol: &str,
    low: f64,
    high: f64,
) -> Result<WatchlistEntry> {
    if !low.is_finite() || !high.is_finite() || low <= 0.0 || high <= 0.0 {
        return Err(AgentError::Validation(
            "Thresholds must be positive numbers".to_string(),
        ));
    }
    if low >= high {
        return Err(AgentError::Validation(format!(
            "Low threshold ({}) must be below high threshold ({})",
            low, high
        )));
    }

    let symbol = normalize_symbol(symbol);
    let mut watchlist = store.load_watchlist().await?;

    let entry = watchlist.get_mut(&symbol).ok_or_else(|| {
        AgentError::Validation(format!("{} is not on the watchlist", symbol))
    })?;
    entry.low = low;
    entry.high = high;
    let updated = entry.clone();

    store.save_watchlist(&watchlist).await?;
    info!(symbol = %symbol, low, high, "Thresholds updated");
    Ok(updated)
}

/// Store fresh prices for symbols still on the watchlist
pub async fn record_prices(store: &dyn StateStore, prices: &[(String, f64)]) -> Result<usize> {
    let mut watchlist = store.load_watchlist().await?;
    let mut updated = 0;

    for (symbol, price) in prices {
        if let Some(entry) = watchlist.get_mut(symbol) {
            entry.current_price = Some(*price);
            updated += 1;
        }
    }

    if updated > 0 {
        store.save_watchlist(&watchlist).await?;
    }
    Ok(updated)
}

/// Human-readable listing
pub fn render(watchlist: &Watchlist) -> String {
    if watchlist.is_empty() {
        return "Watchlist is empty".to_string();
    }

    let mut out = String::from("Current Watchlist:");
    for entry in watchlist.values() {
        out.push_str(&format!(
            "\n- {}: Low={:.2}, High={:.2}",
            entry.symbol, entry.low, entry.high
        ));
        if let Some(price) = entry.current_price {
            out.push_str(&format!(", Last=${:.2}", price));
        }
    }
    out
}

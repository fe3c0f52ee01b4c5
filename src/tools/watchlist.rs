//! Watchlist actions: add, remove, list

use super::{parse_number, required_arg, Action, ActionResult};
use crate::error::ActionError;
use crate::models::{normalize_symbol, WatchlistEntry};
use crate::quotes::QuoteSource;
use crate::state::StateStore;
use crate::watchlist;
use std::sync::Arc;
use tracing::warn;

pub struct AddToWatchlistAction {
    quotes: Arc<dyn QuoteSource>,
    store: Arc<dyn StateStore>,
}

impl AddToWatchlistAction {
    pub fn new(quotes: Arc<dyn QuoteSource>, store: Arc<dyn StateStore>) -> Self {
        Self { quotes, store }
    }
}

#[async_trait::async_trait]
impl Action for AddToWatchlistAction {
    fn name(&self) -> &'static str {
        "add_to_watchlist"
    }

    fn description(&self) -> &'static str {
        "Add or update a stock on the watchlist with low/high thresholds"
    }

    async fn execute(&self, args: &[String]) -> ActionResult {
        let name = self.name();
        let symbol = normalize_symbol(required_arg(name, args, 0, "symbol")?);
        let low = parse_number(name, required_arg(name, args, 1, "low")?, "low")?;
        let high = parse_number(name, required_arg(name, args, 2, "high")?, "high")?;

        let current_price = self
            .quotes
            .get_price(&symbol)
            .await
            .map_err(|e| ActionError::upstream(name, e.to_string()))?;

        if current_price.is_none() {
            warn!(symbol = %symbol, "No current price, storing entry without one");
        }

        let entry = WatchlistEntry::new(&symbol, low, high, current_price, "agent");
        watchlist::upsert(self.store.as_ref(), entry)
            .await
            .map_err(|e| ActionError::upstream(name, e.to_string()))?;

        let price_note = current_price
            .map(|p| format!(" (current price {:.2})", p))
            .unwrap_or_default();

        Ok(format!(
            "Added {} to watchlist: low={:.2}, high={:.2}{}",
            symbol, low, high, price_note
        ))
    }
}

pub struct RemoveFromWatchlistAction {
    store: Arc<dyn StateStore>,
}

impl RemoveFromWatchlistAction {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Action for RemoveFromWatchlistAction {
    fn name(&self) -> &'static str {
        "remove_from_watchlist"
    }

    fn description(&self) -> &'static str {
        "Remove a stock from the watchlist"
    }

    async fn execute(&self, args: &[String]) -> ActionResult {
        let symbol = normalize_symbol(required_arg(self.name(), args, 0, "symbol")?);

        let removed = watchlist::remove(self.store.as_ref(), &symbol)
            .await
            .map_err(|e| ActionError::upstream(self.name(), e.to_string()))?;

        if removed {
            Ok(format!("Removed {} from watchlist", symbol))
        } else {
            Ok(format!("{} not found in watchlist", symbol))
        }
    }
}

pub struct GetWatchlistAction {
    store: Arc<dyn StateStore>,
}

impl GetWatchlistAction {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Action for GetWatchlistAction {
    fn name(&self) -> &'static str {
        "get_watchlist"
    }

    fn description(&self) -> &'static str {
        "List the watchlist"
    }

    async fn execute(&self, _args: &[String]) -> ActionResult {
        let list = self
            .store
            .load_watchlist()
            .await
            .map_err(|e| ActionError::upstream(self.name(), e.to_string()))?;

        Ok(watchlist::render(&list))
    }
}

//! Market data actions: symbol lookup and price fetch

use super::{required_arg, Action, ActionResult};
use crate::error::ActionError;
use crate::models::normalize_symbol;
use crate::quotes::QuoteSource;
use std::sync::Arc;
use tracing::{debug, warn};

/// Offline name → ticker table used when the provider search finds nothing
const KNOWN_COMPANIES: &[(&str, &str)] = &[
    ("apple", "AAPL"),
    ("microsoft", "MSFT"),
    ("google", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("amazon", "AMZN"),
    ("tesla", "TSLA"),
    ("meta", "META"),
    ("facebook", "META"),
    ("nvidia", "NVDA"),
    ("netflix", "NFLX"),
    ("amd", "AMD"),
    ("intel", "INTC"),
    ("ibm", "IBM"),
    ("oracle", "ORCL"),
    ("salesforce", "CRM"),
    ("disney", "DIS"),
    ("coca-cola", "KO"),
    ("coca cola", "KO"),
    ("walmart", "WMT"),
    ("jpmorgan", "JPM"),
];

fn name_words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Ticker for a company name from the static table. A table name matches
/// only as a whole-word sequence of the input, a ticker only exactly.
pub fn known_symbol(company: &str) -> Option<&'static str> {
    let words = name_words(company);
    if words.is_empty() {
        return None;
    }

    KNOWN_COMPANIES
        .iter()
        .find(|(name, ticker)| {
            let name = name_words(name);
            words.windows(name.len()).any(|w| w == name.as_slice())
                || company.trim().eq_ignore_ascii_case(ticker)
        })
        .map(|(_, ticker)| *ticker)
}

pub struct LookupSymbolAction {
    quotes: Arc<dyn QuoteSource>,
}

impl LookupSymbolAction {
    pub fn new(quotes: Arc<dyn QuoteSource>) -> Self {
        Self { quotes }
    }
}

#[async_trait::async_trait]
impl Action for LookupSymbolAction {
    fn name(&self) -> &'static str {
        "lookup_symbol"
    }

    fn description(&self) -> &'static str {
        "Find the ticker symbol for a company name"
    }

    async fn execute(&self, args: &[String]) -> ActionResult {
        let company = required_arg(self.name(), args, 0, "company_name")?;

        let remote = match self.quotes.search_symbol(company).await {
            Ok(symbol) => symbol,
            Err(e) => {
                warn!(company, error = %e, "Symbol search failed, using offline table");
                None
            }
        };

        let symbol = remote
            .filter(|s| !s.is_empty())
            .or_else(|| known_symbol(company).map(str::to_string))
            .ok_or_else(|| {
                ActionError::upstream(self.name(), format!("No symbol found for '{}'", company))
            })?;

        debug!(company, symbol = %symbol, "Symbol resolved");
        Ok(format!("Symbol for {}: {}", company, symbol))
    }
}

pub struct GetPriceAction {
    quotes: Arc<dyn QuoteSource>,
}

impl GetPriceAction {
    pub fn new(quotes: Arc<dyn QuoteSource>) -> Self {
        Self { quotes }
    }
}

#[async_trait::async_trait]
impl Action for GetPriceAction {
    fn name(&self) -> &'static str {
        "get_price"
    }

    fn description(&self) -> &'static str {
        "Get the current price of a stock"
    }

    async fn execute(&self, args: &[String]) -> ActionResult {
        let symbol = normalize_symbol(required_arg(self.name(), args, 0, "symbol")?);

        let price = self
            .quotes
            .get_price(&symbol)
            .await
            .map_err(|e| ActionError::upstream(self.name(), e.to_string()))?
            .ok_or_else(|| {
                ActionError::upstream(self.name(), format!("No price available for {}", symbol))
            })?;

        Ok(format!("Current price of {}: {:.2}", symbol, price))
    }
}

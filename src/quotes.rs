//! Quote provider access
//!
//! Current price and company-name search against the Yahoo Finance
//! chart/search endpoints. No authentication.

use crate::error::AgentError;
use crate::models::{normalize_symbol, round_cents};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Market data provider used by actions and the price monitor
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Latest price, or `None` when the provider has no quote
    async fn get_price(&self, symbol: &str) -> Result<Option<f64>>;

    /// Best ticker match for a free-text company name
    async fn search_symbol(&self, query: &str) -> Result<Option<String>>;
}

pub struct YahooQuoteSource {
    client: Client,
    base_url: String,
}

impl YahooQuoteSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("stock-watch-agent/0.1")
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AgentError::Quote(format!("Request to {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Quote(format!(
                "Quote provider returned {} for {}",
                status, path
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AgentError::Quote(format!("Invalid JSON response: {}", e)))
    }
}

#[async_trait]
impl QuoteSource for YahooQuoteSource {
    async fn get_price(&self, symbol: &str) -> Result<Option<f64>> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Ok(None);
        }

        let path = format!("/v8/finance/chart/{}", symbol);
        let chart: ChartResponse = match self
            .get_json(&path, &[("interval", "1d"), ("range", "1d")])
            .await
        {
            Ok(chart) => chart,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Price lookup failed");
                return Err(e);
            }
        };

        let price = chart
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|r| r.meta.regular_market_price)
            .map(round_cents);

        debug!(symbol = %symbol, ?price, "Price fetched");
        Ok(price)
    }

    async fn search_symbol(&self, query: &str) -> Result<Option<String>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        let search: SearchResponse = self
            .get_json(
                "/v1/finance/search",
                &[("q", query), ("quotesCount", "5"), ("newsCount", "0")],
            )
            .await?;

        let symbol = search
            .quotes
            .into_iter()
            .find(|q| {
                q.quote_type
                    .as_deref()
                    .map_or(true, |t| t.eq_ignore_ascii_case("EQUITY"))
            })
            .map(|q| normalize_symbol(&q.symbol));

        debug!(query, ?symbol, "Symbol search finished");
        Ok(symbol)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuote {
    symbol: String,
    quote_type: Option<String>,
}

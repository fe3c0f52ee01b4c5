//! Action trait and registry
//!
//! Actions take positional string arguments from the model and return a
//! human-readable result line that is fed back into the next prompt.

use crate::config::AgentConfig;
use crate::error::ActionError;
use crate::quotes::QuoteSource;
use crate::state::StateStore;
use std::collections::HashMap;
use std::sync::Arc;

pub mod market;
pub mod thresholds;
pub mod watchlist;

pub use market::{GetPriceAction, LookupSymbolAction};
pub use thresholds::{
    CalculateThresholdsAction, CheckPriceLimitAction, SuggestThresholdPercentageAction,
    ValidateThresholdsAction,
};
pub use watchlist::{AddToWatchlistAction, GetWatchlistAction, RemoveFromWatchlistAction};

pub type ActionResult = std::result::Result<String, ActionError>;

/// A single named action the model can call
#[async_trait::async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, args: &[String]) -> ActionResult;
}

/// Action registry for looking up actions by name
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    pub fn register(&mut self, action: Arc<dyn Action>) {
        self.actions.insert(action.name().to_string(), action);
    }

    /// Names are matched case-insensitively
    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(&name.trim().to_lowercase()).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Positional argument `index`, trimmed and non-empty
pub(crate) fn required_arg<'a>(
    action: &str,
    args: &'a [String],
    index: usize,
    name: &str,
) -> std::result::Result<&'a str, ActionError> {
    args.get(index)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ActionError::missing(action, name))
}

/// Decimal number, tolerating a leading '$', a trailing '%' and thousands separators
pub(crate) fn parse_number(
    action: &str,
    raw: &str,
    name: &str,
) -> std::result::Result<f64, ActionError> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ActionError::invalid(action, format!("{} '{}' is not a number", name, raw)))
}

/// Create the default registry with the full action catalog
pub fn create_default_registry(
    quotes: Arc<dyn QuoteSource>,
    store: Arc<dyn StateStore>,
    config: &AgentConfig,
) -> ActionRegistry {
    let mut registry = ActionRegistry::new();

    registry.register(Arc::new(LookupSymbolAction::new(quotes.clone())));
    registry.register(Arc::new(GetPriceAction::new(quotes.clone())));

    registry.register(Arc::new(CalculateThresholdsAction::new(
        config.default_threshold_pct,
    )));
    registry.register(Arc::new(SuggestThresholdPercentageAction));
    registry.register(Arc::new(ValidateThresholdsAction));
    registry.register(Arc::new(CheckPriceLimitAction));

    registry.register(Arc::new(AddToWatchlistAction::new(quotes, store.clone())));
    registry.register(Arc::new(RemoveFromWatchlistAction::new(store.clone())));
    registry.register(Arc::new(GetWatchlistAction::new(store)));

    registry
}


#[cfg(test)]
mod tests {
    use super::test_support::FixedQuotes;
    use super::*;
    use crate::error::ActionErrorKind;
    use crate::state::InMemoryStateStore;

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number("t", "$1,234.50", "price").unwrap(), 1234.5);
        assert_eq!(parse_number("t", " 3% ", "pct").unwrap(), 3.0);
        assert_eq!(parse_number("t", "-2.5", "pct").unwrap(), -2.5);

        let err = parse_number("t", "abc", "price").unwrap_err();
        assert_eq!(err.kind(), ActionErrorKind::InvalidArgument);
        assert!(parse_number("t", "NaN", "price").is_err());
        assert!(parse_number("t", "inf", "price").is_err());
    }

    #[test]
    fn test_required_arg() {
        let args = vec!["TSLA".to_string(), "  ".to_string()];
        assert_eq!(required_arg("t", &args, 0, "symbol").unwrap(), "TSLA");

        let err = required_arg("t", &args, 1, "low").unwrap_err();
        assert_eq!(err.kind(), ActionErrorKind::MissingArgument);
        assert!(required_arg("t", &args, 2, "high").is_err());
    }

    #[test]
    fn test_default_registry_catalog() {
        let registry = create_default_registry(
            Arc::new(FixedQuotes::default()),
            Arc::new(InMemoryStateStore::new()),
            &AgentConfig::default(),
        );

        assert_eq!(
            registry.list(),
            vec![
                "add_to_watchlist",
                "calculate_thresholds",
                "check_price_limit",
                "get_price",
                "get_watchlist",
                "lookup_symbol",
                "remove_from_watchlist",
                "suggest_threshold_percentage",
                "validate_thresholds",
            ]
        );
        assert!(registry.get(" Get_Price ").is_some());
        assert!(registry.get("delete_everything").is_none());
    }
}

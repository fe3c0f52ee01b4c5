//! Pure threshold arithmetic actions, no network access

use super::{parse_number, required_arg, Action, ActionResult};
use crate::error::ActionError;
use crate::models::{normalize_symbol, round_cents};

/// Band percentage suggested when a symbol has no volatility entry
pub const DEFAULT_SUGGESTED_PCT: f64 = 5.0;

/// Rough per-symbol daily volatility, in percent
const VOLATILITY_TABLE: &[(&str, f64)] = &[
    ("TSLA", 5.0),
    ("NVDA", 4.0),
    ("AMD", 4.0),
    ("NFLX", 3.5),
    ("META", 3.0),
    ("AMZN", 2.5),
    ("CRM", 2.5),
    ("GOOGL", 2.0),
    ("AAPL", 2.0),
    ("INTC", 2.0),
    ("MSFT", 1.5),
    ("ORCL", 1.5),
    ("DIS", 1.5),
    ("JPM", 1.5),
    ("IBM", 1.0),
    ("KO", 1.0),
    ("WMT", 1.0),
];

pub fn suggested_percentage(symbol: &str) -> f64 {
    let symbol = normalize_symbol(symbol);
    VOLATILITY_TABLE
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, pct)| *pct)
        .unwrap_or(DEFAULT_SUGGESTED_PCT)
}

/// (low, high) rounded to cents
pub fn threshold_band(price: f64, percentage: f64) -> (f64, f64) {
    (
        round_cents(price * (1.0 - percentage / 100.0)),
        round_cents(price * (1.0 + percentage / 100.0)),
    )
}

pub struct CalculateThresholdsAction {
    default_pct: f64,
}

impl CalculateThresholdsAction {
    pub fn new(default_pct: f64) -> Self {
        Self { default_pct }
    }
}

#[async_trait::async_trait]
impl Action for CalculateThresholdsAction {
    fn name(&self) -> &'static str {
        "calculate_thresholds"
    }

    fn description(&self) -> &'static str {
        "Compute low and high alert thresholds from a price and percentage"
    }

    async fn execute(&self, args: &[String]) -> ActionResult {
        let price = parse_number(
            self.name(),
            required_arg(self.name(), args, 0, "price")?,
            "price",
        )?;

        let percentage = match args.get(1).map(|s| s.trim()).filter(|s| !s.is_empty()) {
            Some(raw) => parse_number(self.name(), raw, "percentage")?,
            None => self.default_pct,
        };

        if price <= 0.0 {
            return Err(ActionError::invalid(self.name(), "price must be positive"));
        }
        if percentage <= 0.0 || percentage >= 100.0 {
            return Err(ActionError::invalid(
                self.name(),
                "percentage must be between 0 and 100",
            ));
        }

        let (low, high) = threshold_band(price, percentage);
        Ok(format!(
            "Thresholds for {:.2} at {}%: low={:.2}, high={:.2}",
            price, percentage, low, high
        ))
    }
}

pub struct SuggestThresholdPercentageAction;

#[async_trait::async_trait]
impl Action for SuggestThresholdPercentageAction {
    fn name(&self) -> &'static str {
        "suggest_threshold_percentage"
    }

    fn description(&self) -> &'static str {
        "Suggest an alert band percentage based on typical volatility"
    }

    async fn execute(&self, args: &[String]) -> ActionResult {
        let symbol = normalize_symbol(required_arg(self.name(), args, 0, "symbol")?);
        let pct = suggested_percentage(&symbol);
        Ok(format!("Suggested threshold percentage for {}: {}%", symbol, pct))
    }
}

pub struct ValidateThresholdsAction;

#[async_trait::async_trait]
impl Action for ValidateThresholdsAction {
    fn name(&self) -> &'static str {
        "validate_thresholds"
    }

    fn description(&self) -> &'static str {
        "Check that thresholds make sense for the current price"
    }

    /// Inconsistent bands produce a warning result, not an error
    async fn execute(&self, args: &[String]) -> ActionResult {
        let name = self.name();
        let price = parse_number(name, required_arg(name, args, 0, "current_price")?, "current_price")?;
        let low = parse_number(name, required_arg(name, args, 1, "low")?, "low")?;
        let high = parse_number(name, required_arg(name, args, 2, "high")?, "high")?;

        if low >= high {
            return Ok(format!(
                "Warning: low threshold {:.2} is not below high threshold {:.2}",
                low, high
            ));
        }

        if price < low || price > high {
            return Ok(format!(
                "Warning: current price {:.2} is already outside the band [{:.2}, {:.2}], an alert will fire on the next check",
                price, low, high
            ));
        }

        let below = (price - low) / price * 100.0;
        let above = (high - price) / price * 100.0;
        Ok(format!(
            "Valid: current price {:.2} is inside [{:.2}, {:.2}] ({:.2}% above low, {:.2}% below high)",
            price, low, high, below, above
        ))
    }
}

pub struct CheckPriceLimitAction;

#[async_trait::async_trait]
impl Action for CheckPriceLimitAction {
    fn name(&self) -> &'static str {
        "check_price_limit"
    }

    fn description(&self) -> &'static str {
        "Check whether a price is outside a threshold band"
    }

    async fn execute(&self, args: &[String]) -> ActionResult {
        let name = self.name();
        let price = parse_number(name, required_arg(name, args, 0, "price")?, "price")?;
        let low = parse_number(name, required_arg(name, args, 1, "low")?, "low")?;
        let high = parse_number(name, required_arg(name, args, 2, "high")?, "high")?;

        let position = if price < low {
            "BELOW"
        } else if price > high {
            "ABOVE"
        } else {
            return Ok(format!(
                "No alert: price {:.2} is within range ({:.2}, {:.2})",
                price, low, high
            ));
        };

        Ok(format!(
            "ALERT: price {:.2} is {} threshold range ({:.2}, {:.2})",
            price, position, low, high
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionErrorKind;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_threshold_band() {
        assert_eq!(threshold_band(100.0, 5.0), (95.0, 105.0));
        assert_eq!(threshold_band(100.0, 1.0), (99.0, 101.0));
        assert_eq!(threshold_band(250.37, 3.0), (242.86, 257.88));
    }

    #[tokio::test]
    async fn test_calculate_with_explicit_percentage() {
        let action = CalculateThresholdsAction::new(1.0);
        let result = action.execute(&args(&["100", "5"])).await.unwrap();
        assert_eq!(result, "Thresholds for 100.00 at 5%: low=95.00, high=105.00");
    }

    #[tokio::test]
    async fn test_calculate_uses_configured_default() {
        let one = CalculateThresholdsAction::new(1.0);
        assert!(one
            .execute(&args(&["100"]))
            .await
            .unwrap()
            .ends_with("low=99.00, high=101.00"));

        let five = CalculateThresholdsAction::new(5.0);
        assert!(five
            .execute(&args(&["100"]))
            .await
            .unwrap()
            .ends_with("low=95.00, high=105.00"));
    }

    #[tokio::test]
    async fn test_calculate_rejects_non_numeric() {
        let action = CalculateThresholdsAction::new(1.0);

        let err = action.execute(&args(&["lots", "5"])).await.unwrap_err();
        assert_eq!(err.kind(), ActionErrorKind::InvalidArgument);

        let err = action.execute(&args(&["100", "some"])).await.unwrap_err();
        assert_eq!(err.kind(), ActionErrorKind::InvalidArgument);

        let err = action.execute(&[]).await.unwrap_err();
        assert_eq!(err.kind(), ActionErrorKind::MissingArgument);
    }

    #[tokio::test]
    async fn test_calculate_rejects_out_of_range_values() {
        let action = CalculateThresholdsAction::new(1.0);

        for bad in [["0", "5"], ["-10", "5"], ["100", "0"], ["100", "100"], ["100", "-3"]] {
            let err = action.execute(&args(&bad)).await.unwrap_err();
            assert_eq!(err.kind(), ActionErrorKind::InvalidArgument, "{:?}", bad);
        }
    }

    #[tokio::test]
    async fn test_suggest_percentage() {
        let action = SuggestThresholdPercentageAction;
        assert_eq!(
            action.execute(&args(&["msft"])).await.unwrap(),
            "Suggested threshold percentage for MSFT: 1.5%"
        );
        assert_eq!(
            action.execute(&args(&["ZZZZ"])).await.unwrap(),
            "Suggested threshold percentage for ZZZZ: 5%"
        );
    }

    #[tokio::test]
    async fn test_validate_warns_instead_of_failing() {
        let action = ValidateThresholdsAction;

        let inverted = action.execute(&args(&["100", "110", "90"])).await.unwrap();
        assert!(inverted.starts_with("Warning: low threshold"));

        let outside = action.execute(&args(&["120", "90", "110"])).await.unwrap();
        assert!(outside.contains("already outside"));

        let valid = action.execute(&args(&["100", "95", "105"])).await.unwrap();
        assert!(valid.starts_with("Valid"));
    }

    #[tokio::test]
    async fn test_check_price_limit() {
        let action = CheckPriceLimitAction;

        let below = action.execute(&args(&["99", "100", "110"])).await.unwrap();
        assert!(below.contains("BELOW"));

        let above = action.execute(&args(&["111", "100", "110"])).await.unwrap();
        assert!(above.contains("ABOVE"));

        let inside = action.execute(&args(&["105", "100", "110"])).await.unwrap();
        assert!(inside.starts_with("No alert"));
    }
}

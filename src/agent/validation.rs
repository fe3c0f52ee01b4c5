//! Request validation and keyword heuristics for user input

use crate::error::AgentError;
use crate::tools::market::known_symbol;
use crate::Result;

pub const MIN_REQUEST_LEN: usize = 5;

/// Words that express a monitoring intent
const INTENT_WORDS: &[&str] = &[
    "add", "watch", "monitor", "track", "alert", "notify", "remove", "delete", "show", "list",
    "check", "set", "follow",
];

/// Words that refer to stocks or prices
const MARKET_WORDS: &[&str] = &[
    "stock", "stocks", "share", "shares", "ticker", "symbol", "price", "prices", "watchlist",
    "threshold", "thresholds", "band", "range",
];

/// Stripped from a request before the implicit symbol lookup
const COMMAND_WORDS: &[&str] = &[
    "add", "watch", "monitor", "track", "alert", "notify", "follow", "set", "please", "can",
    "you", "i", "want", "to", "my", "me", "the", "a", "an", "for", "of", "on", "at", "with",
    "and", "when", "if", "it", "its", "stock", "stocks", "share", "shares", "price", "watchlist",
    "threshold", "thresholds", "percent", "band", "range", "alerts", "goes", "above", "below",
];

/// Split into words, keeping letters, digits and a few ticker characters
fn words(input: &str) -> impl Iterator<Item = &str> {
    input
        .split(|c: char| !(c.is_alphanumeric() || c == '.' || c == '-' || c == '%' || c == '$'))
        .map(|w| w.trim_matches(|c: char| c == '.' || c == '-'))
        .filter(|w| !w.is_empty())
}

fn looks_like_ticker(word: &str) -> bool {
    (2..=5).contains(&word.len()) && word.chars().all(|c| c.is_ascii_uppercase())
}

fn is_number_like(word: &str) -> bool {
    word.trim_start_matches('$')
        .trim_end_matches('%')
        .parse::<f64>()
        .is_ok()
}

/// Reject input that is too short or that names neither an intent nor a stock
pub fn validate_request(input: &str) -> Result<()> {
    let input = input.trim();

    if input.chars().count() < MIN_REQUEST_LEN {
        return Err(AgentError::Validation(format!(
            "Request is too short (minimum {} characters)",
            MIN_REQUEST_LEN
        )));
    }

    let has_intent = words(input).any(|w| INTENT_WORDS.contains(&w.to_lowercase().as_str()));
    let has_market_word = input.contains('%')
        || input.contains('$')
        || words(input).any(|w| MARKET_WORDS.contains(&w.to_lowercase().as_str()));
    let names_stock = known_symbol(input).is_some()
        || words(input).any(|w| looks_like_ticker(w) || known_symbol(w).is_some());

    if has_intent || has_market_word || names_stock {
        Ok(())
    } else {
        Err(AgentError::Validation(
            "Request does not look like a stock monitoring task. Try: \"watch Tesla with 3% threshold\""
                .to_string(),
        ))
    }
}

/// What is left of the request once command words and numbers are removed
pub fn derive_lookup_query(input: &str) -> Option<String> {
    let residual: Vec<&str> = words(input)
        .filter(|w| !COMMAND_WORDS.contains(&w.to_lowercase().as_str()))
        .filter(|w| !is_number_like(w))
        .collect();

    if residual.is_empty() {
        None
    } else {
        Some(residual.join(" "))
    }
}

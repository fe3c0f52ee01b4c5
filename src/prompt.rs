//! Prompt assembly for each model call
//!
//! The model is stateless, so every prompt carries the system prompt, the
//! original request and the calls made so far in the current session.

use crate::models::{LogEntry, LogKind, SessionId};

/// Fixed system prompt describing the directive protocol and action catalog
pub const SYSTEM_PROMPT: &str = r#"You are a stock watchlist assistant. You help the user monitor stocks by calling functions one at a time.

Respond with EXACTLY ONE line in one of these formats:
FUNCTION_CALL: function_name|arg1|arg2
FINAL_ANSWER: message for the user
ERROR: what went wrong

Available functions:
- lookup_symbol|company_name - Find the ticker symbol for a company name
- get_price|symbol - Get the current price of a stock
- suggest_threshold_percentage|symbol - Suggest an alert band percentage for a stock
- calculate_thresholds|price|percentage - Compute low and high alert thresholds (percentage optional)
- validate_thresholds|current_price|low|high - Check that thresholds make sense
- add_to_watchlist|symbol|low|high - Add or update a stock on the watchlist
- remove_from_watchlist|symbol - Remove a stock from the watchlist
- get_watchlist - List the watchlist
- check_price_limit|price|low|high - Check whether a price is outside a threshold band

Rules:
- Call exactly one function per response, then wait for its result
- Use a ticker symbol, not a company name, for price and watchlist functions
- When the task is done, reply with FINAL_ANSWER summarising what was done
- Never write FUNCTION_CALL as the function name"#;

/// Build the prompt for the next step of a session
pub fn build_prompt(
    system_prompt: &str,
    user_input: &str,
    session_log: &[LogEntry],
    session: SessionId,
) -> String {
    let mut prompt = format!("{}\n\nUser request: {}", system_prompt, user_input);

    let entries: Vec<&LogEntry> = session_log
        .iter()
        .filter(|e| e.iteration == session)
        .collect();

    if entries.len() <= 1 {
        return prompt;
    }

    let steps: Vec<String> = entries
        .iter()
        .filter(|e| matches!(e.kind, LogKind::FunctionCall | LogKind::Result))
        .map(|e| match e.kind {
            LogKind::FunctionCall => format!("Called: {}", e.payload),
            _ => format!("Result: {}", e.payload),
        })
        .collect();

    if steps.is_empty() {
        return prompt;
    }

    prompt.push_str("\n\nSteps completed so far:\n");
    prompt.push_str(&steps.join("\n"));
    prompt.push_str(
        "\n\nContinue the multi-step process. Reply with the next FUNCTION_CALL, or FINAL_ANSWER if the task is complete.",
    );

    prompt
}

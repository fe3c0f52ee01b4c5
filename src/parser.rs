//! Response parser for the directive protocol
//!
//! Turns one raw model reply into a `ParsedInstruction`. Never fails: replies
//! without a directive are mapped to an error message the user can act on.

use crate::models::ParsedInstruction;
use tracing::{debug, warn};

pub const FUNCTION_CALL: &str = "FUNCTION_CALL:";
pub const FINAL_ANSWER: &str = "FINAL_ANSWER:";
pub const ERROR: &str = "ERROR:";

/// Markers in priority order
const MARKERS: [&str; 3] = [FUNCTION_CALL, FINAL_ANSWER, ERROR];

const INTENT_KEYWORDS: &[&str] = &["add", "watch", "monitor", "track"];

/// Parse a raw model reply
pub fn parse_response(raw: &str) -> ParsedInstruction {
    let text = raw.trim();

    for line in text.lines() {
        // ASCII-only uppercasing keeps byte offsets aligned with `line`
        let upper = line.to_ascii_uppercase();
        let Some((marker, offset)) = MARKERS
            .into_iter()
            .find_map(|m| upper.find(m).map(|offset| (m, offset)))
        else {
            continue;
        };

        debug!(marker, line = %line.trim(), "Directive found");

        let payload = line[offset + marker.len()..].trim();
        return match marker {
            FUNCTION_CALL => parse_function_call(line, payload),
            FINAL_ANSWER => ParsedInstruction::FinalAnswer {
                message: payload_or(payload, "Task completed"),
            },
            _ => ParsedInstruction::ErrorSignal {
                message: payload_or(payload, "Unknown error"),
                inferred: false,
            },
        };
    }

    infer_error(text)
}

fn parse_function_call(line: &str, payload: &str) -> ParsedInstruction {
    let mut segments = payload.split('|').map(str::trim);

    let name = segments.next().unwrap_or_default();
    let marker_token = FUNCTION_CALL.trim_end_matches(':');

    // Echoed marker, either bare or as a second "FUNCTION_CALL: name"
    let echoed = name
        .get(..marker_token.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(marker_token));

    if name.is_empty() || echoed {
        warn!(line = %line.trim(), "Rejected function call with invalid action name");
        return ParsedInstruction::Unparseable;
    }

    let args = segments
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    ParsedInstruction::FunctionCall {
        name: name.to_string(),
        args,
    }
}

fn payload_or(payload: &str, default: &str) -> String {
    if payload.is_empty() {
        default.to_string()
    } else {
        payload.to_string()
    }
}

fn infer_error(text: &str) -> ParsedInstruction {
    let lowered = text.to_lowercase();

    let message = if (lowered.contains("function_call") || lowered.contains("function call"))
        && lowered.contains(':')
    {
        "Malformed function call. Use the format FUNCTION_CALL: name|arg1|arg2"
    } else if INTENT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        "Response did not follow the required format. Reply with FUNCTION_CALL: or FINAL_ANSWER:"
    } else {
        "Could not understand the response"
    };

    debug!(message, "No directive in response, inferred error");

    ParsedInstruction::ErrorSignal {
        message: message.to_string(),
        inferred: true,
    }
}

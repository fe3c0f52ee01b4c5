//! Core data models for the stock watch agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

//
// ================= Watchlist =================
//

/// One monitored symbol and its alert band
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub low: f64,
    pub high: f64,
    pub current_price: Option<f64>,
    /// Free-text provenance tag ("agent", "manual", ...)
    pub method: String,
    pub added_at: DateTime<Utc>,
}

impl WatchlistEntry {
    pub fn new(symbol: &str, low: f64, high: f64, current_price: Option<f64>, method: &str) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            low,
            high,
            current_price,
            method: method.to_string(),
            added_at: Utc::now(),
        }
    }

    /// Price strictly outside [low, high]
    pub fn breach(&self, price: f64) -> Option<Breach> {
        if price < self.low {
            Some(Breach::Below)
        } else if price > self.high {
            Some(Breach::Above)
        } else {
            None
        }
    }
}

/// Watchlist keyed by uppercase ticker
pub type Watchlist = BTreeMap<String, WatchlistEntry>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Breach {
    Below,
    Above,
}

impl fmt::Display for Breach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Breach::Below => "BELOW",
            Breach::Above => "ABOVE",
        };
        write!(f, "{}", s)
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Round to cents: scale by 100 in f64, then `f64::round` (half away from
/// zero). Values such as 1.005 that sit just below the boundary in binary
/// round down.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

//
// ================= Settings =================
//

/// Synced settings partition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub credential: String,
    pub check_interval_minutes: u64,
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credential: String::new(),
            check_interval_minutes: 5,
            notifications_enabled: true,
        }
    }
}

//
// ================= Session transcript =================
//

/// Identifier generated once per user submission
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogKind {
    Input,
    LlmResponse,
    FunctionCall,
    Result,
    Error,
    Final,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogKind::Input => "input",
            LogKind::LlmResponse => "llm-response",
            LogKind::FunctionCall => "function-call",
            LogKind::Result => "result",
            LogKind::Error => "error",
            LogKind::Final => "final",
        };
        write!(f, "{}", s)
    }
}

/// Payload carried by a transcript entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LogPayload {
    Call { name: String, args: Vec<String> },
    Text(String),
}

impl fmt::Display for LogPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogPayload::Call { name, args } => write!(f, "{}({})", name, args.join(", ")),
            LogPayload::Text(text) => write!(f, "{}", text),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    /// Session this entry belongs to
    pub iteration: SessionId,
    pub kind: LogKind,
    pub payload: LogPayload,
}

impl LogEntry {
    pub fn text(session: SessionId, kind: LogKind, text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            iteration: session,
            kind,
            payload: LogPayload::Text(text.into()),
        }
    }

    pub fn call(session: SessionId, name: &str, args: &[String]) -> Self {
        Self {
            timestamp: Utc::now(),
            iteration: session,
            kind: LogKind::FunctionCall,
            payload: LogPayload::Call {
                name: name.to_string(),
                args: args.to_vec(),
            },
        }
    }
}

//
// ================= Agent protocol =================
//

/// One LLM reply, interpreted
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedInstruction {
    FunctionCall { name: String, args: Vec<String> },
    FinalAnswer { message: String },
    /// `inferred` is set when no directive was present and the message was
    /// derived from keywords in the reply
    ErrorSignal { message: String, inferred: bool },
    Unparseable,
}

/// Result of one loop iteration
#[derive(Debug, Clone, PartialEq)]
pub enum AgentStepOutcome {
    Continue,
    Done { message: String },
    Failed { reason: String },
}

/// Terminal state of a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    Succeeded { message: String },
    Failed { reason: String },
    BudgetExhausted { steps: u32 },
}

impl SessionOutcome {
    /// Text shown to the user for this outcome
    pub fn summary(&self) -> String {
        match self {
            SessionOutcome::Succeeded { message } => message.clone(),
            SessionOutcome::Failed { reason } => format!("Error: {}", reason),
            SessionOutcome::BudgetExhausted { steps } => format!(
                "Warning: stopped after {} steps, task may be incomplete",
                steps
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub outcome: SessionOutcome,
    pub steps: u32,
    pub transcript: Vec<LogEntry>,
}

impl SessionReport {
    pub fn count(&self, kind: LogKind) -> usize {
        self.transcript.iter().filter(|e| e.kind == kind).count()
    }
}

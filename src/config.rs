//! Configuration loaded from environment variables

use crate::error::AgentError;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const MIN_STEPS: u32 = 6;
pub const MAX_STEPS: u32 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub quote_base_url: String,
    pub data_dir: PathBuf,
    pub agent: AgentConfig,
    pub check_interval_minutes: u64,
    pub port: u16,
}

/// Knobs for the agent loop and the action catalog
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Step ceiling, always within [MIN_STEPS, MAX_STEPS]
    pub max_steps: u32,
    pub default_threshold_pct: f64,
}

impl AgentConfig {
    pub fn new(max_steps: u32, default_threshold_pct: f64) -> Self {
        Self {
            max_steps: max_steps.clamp(MIN_STEPS, MAX_STEPS),
            default_threshold_pct,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new(8, 1.0)
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let max_steps = parse_var("AGENT_MAX_STEPS", 8u32)?;
        let default_threshold_pct = parse_var("DEFAULT_THRESHOLD_PCT", 1.0f64)?;

        if default_threshold_pct <= 0.0 {
            return Err(AgentError::Config(
                "DEFAULT_THRESHOLD_PCT must be positive".to_string(),
            ));
        }

        Ok(Self {
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_base_url: env::var("GEMINI_BASE_URL").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta/models".to_string()
            }),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            quote_base_url: env::var("QUOTE_BASE_URL")
                .unwrap_or_else(|_| "https://query1.finance.yahoo.com".to_string()),
            data_dir: env::var("STOCK_AGENT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            agent: AgentConfig::new(max_steps, default_threshold_pct),
            check_interval_minutes: parse_var("CHECK_INTERVAL_MINUTES", 5u64)?,
            port: env::var("PORT")
                .or_else(|_| env::var("API_PORT"))
                .ok()
                .map(|v| {
                    v.parse().map_err(|_| {
                        AgentError::Config(format!("Invalid port: {}", v))
                    })
                })
                .transpose()?
                .unwrap_or(8080),
        })
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AgentError::Config(format!("Invalid value for {}: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

//! Process wiring shared by the binaries

use crate::agent::AgentLoop;
use crate::config::AppConfig;
use crate::execution::ActionExecutor;
use crate::gemini::GeminiClient;
use crate::models::Settings;
use crate::monitor::{PriceMonitor, TracingNotifier};
use crate::quotes::{QuoteSource, YahooQuoteSource};
use crate::state::{JsonFileStateStore, StateStore};
use crate::tools::create_default_registry;
use crate::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over `default_directive`
pub fn setup_logger(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .compact()
        .with_env_filter(filter)
        .init();
}

pub struct Runtime {
    pub store: Arc<dyn StateStore>,
    pub agent: Arc<AgentLoop>,
    pub monitor: Arc<PriceMonitor>,
}

impl Runtime {
    /// Open the data directory and build every component.
    ///
    /// Environment values only seed settings the store does not have yet.
    pub async fn build(config: &AppConfig) -> Result<Self> {
        let store: Arc<dyn StateStore> = Arc::new(JsonFileStateStore::open(&config.data_dir).await?);

        let mut settings = store.load_settings().await?;
        let mut seeded = false;
        if settings == Settings::default() {
            settings.check_interval_minutes = config.check_interval_minutes.max(1);
            seeded = true;
        }
        if settings.credential.trim().is_empty() && !config.gemini_api_key.is_empty() {
            settings.credential = config.gemini_api_key.clone();
            seeded = true;
        }
        if seeded {
            store.save_settings(&settings).await?;
        }

        let quotes: Arc<dyn QuoteSource> = Arc::new(YahooQuoteSource::new(&config.quote_base_url)?);
        let transport = Arc::new(GeminiClient::new(
            settings.credential.clone(),
            &config.gemini_base_url,
            &config.gemini_model,
        )?);

        let registry = create_default_registry(quotes.clone(), store.clone(), &config.agent);
        let agent = AgentLoop::new(
            transport,
            ActionExecutor::new(registry),
            store.clone(),
            config.agent.clone(),
        );
        let monitor = PriceMonitor::new(quotes, store.clone(), Arc::new(TracingNotifier));

        info!(
            data_dir = %config.data_dir.display(),
            model = %config.gemini_model,
            max_steps = config.agent.max_steps,
            "Components initialized"
        );

        Ok(Self {
            store,
            agent: Arc::new(agent),
            monitor: Arc::new(monitor),
        })
    }
}

use stock_watch_agent::{
    api::{start_server, ApiState},
    config::AppConfig,
    runtime::{setup_logger, Runtime},
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();
    setup_logger("info,tower_http=debug");

    let config = AppConfig::from_env()?;
    if config.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY not set; set it through PUT /api/settings before running the agent");
    }

    info!("Stock Watch Agent - API Server");
    info!("Port: {}", config.port);

    let runtime = Runtime::build(&config).await?;

    // Background price checks
    let _monitor = runtime.monitor.clone().spawn();

    let state = ApiState {
        agent: runtime.agent,
        store: runtime.store,
        monitor: runtime.monitor,
    };

    info!("Starting API server...");
    start_server(state, config.port).await?;

    Ok(())
}

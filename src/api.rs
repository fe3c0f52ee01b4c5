//! REST API for the stock watch agent
//!
//! Exposes agent sessions, the watchlist, stored logs, settings and an
//! on-demand price check over HTTP.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::AgentLoop;
use crate::error::AgentError;
use crate::monitor::PriceMonitor;
use crate::state::StateStore;
use crate::watchlist;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    pub request: String,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdUpdate {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    pub api_key: Option<String>,
    pub check_interval_minutes: Option<u64>,
    pub notifications_enabled: Option<bool>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(data: T) -> ApiResult {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn fail(e: AgentError) -> ApiResult {
    let status = match e {
        AgentError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(status = %status, error = %e, "Request failed");
    (status, Json(ApiResponse::error(e.to_string())))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<AgentLoop>,
    pub store: Arc<dyn StateStore>,
    pub monitor: Arc<PriceMonitor>,
}

/// =============================
/// Handlers
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn run_agent(
    State(state): State<ApiState>,
    Json(req): Json<AgentRequest>,
) -> ApiResult {
    info!("Received agent request: {}", req.request);

    match state.agent.run(&req.request).await {
        Ok(report) => ok(report),
        Err(e) => fail(e),
    }
}

async fn get_watchlist(State(state): State<ApiState>) -> ApiResult {
    match state.store.load_watchlist().await {
        Ok(list) => ok(list),
        Err(e) => fail(e),
    }
}

async fn remove_symbol(
    State(state): State<ApiState>,
    Path(symbol): Path<String>,
) -> ApiResult {
    match watchlist::remove(state.store.as_ref(), &symbol).await {
        Ok(true) => ok(serde_json::json!({ "removed": symbol.to_uppercase() })),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "{} not found in watchlist",
                symbol.to_uppercase()
            ))),
        ),
        Err(e) => fail(e),
    }
}

async fn update_thresholds(
    State(state): State<ApiState>,
    Path(symbol): Path<String>,
    Json(update): Json<ThresholdUpdate>,
) -> ApiResult {
    match watchlist::update_thresholds(state.store.as_ref(), &symbol, update.low, update.high)
        .await
    {
        Ok(entry) => ok(entry),
        Err(e) => fail(e),
    }
}

async fn get_logs(State(state): State<ApiState>) -> ApiResult {
    match state.store.load_logs().await {
        Ok(logs) => ok(logs),
        Err(e) => fail(e),
    }
}

fn settings_view(settings: &crate::models::Settings) -> serde_json::Value {
    serde_json::json!({
        "api_key_configured": !settings.credential.trim().is_empty(),
        "check_interval_minutes": settings.check_interval_minutes,
        "notifications_enabled": settings.notifications_enabled,
    })
}

async fn get_settings(State(state): State<ApiState>) -> ApiResult {
    match state.store.load_settings().await {
        Ok(settings) => ok(settings_view(&settings)),
        Err(e) => fail(e),
    }
}

async fn put_settings(
    State(state): State<ApiState>,
    Json(update): Json<SettingsUpdate>,
) -> ApiResult {
    if update.check_interval_minutes == Some(0) {
        return fail(AgentError::Validation(
            "check_interval_minutes must be at least 1".to_string(),
        ));
    }

    let mut settings = match state.store.load_settings().await {
        Ok(settings) => settings,
        Err(e) => return fail(e),
    };

    if let Some(key) = update.api_key {
        settings.credential = key.trim().to_string();
    }
    if let Some(minutes) = update.check_interval_minutes {
        settings.check_interval_minutes = minutes;
    }
    if let Some(enabled) = update.notifications_enabled {
        settings.notifications_enabled = enabled;
    }

    match state.store.save_settings(&settings).await {
        Ok(()) => ok(settings_view(&settings)),
        Err(e) => fail(e),
    }
}

async fn check_prices(State(state): State<ApiState>) -> ApiResult {
    match state.monitor.check_all().await {
        Ok(report) => ok(report),
        Err(e) => fail(e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/agent", post(run_agent))
        .route("/api/watchlist", get(get_watchlist))
        .route(
            "/api/watchlist/:symbol",
            delete(remove_symbol).put(update_thresholds),
        )
        .route("/api/logs", get(get_logs))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/monitor/check", post(check_prices))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::error::TransportError;
    use crate::execution::ActionExecutor;
    use crate::gemini::LlmTransport;
    use crate::models::{Settings, WatchlistEntry};
    use crate::monitor::TracingNotifier;
    use crate::state::InMemoryStateStore;
    use crate::tools::create_default_registry;
    use crate::tools::test_support::FixedQuotes;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct FinalAnswerTransport;

    #[async_trait::async_trait]
    impl LlmTransport for FinalAnswerTransport {
        async fn send(&self, _prompt: &str) -> std::result::Result<String, TransportError> {
            Ok("FINAL_ANSWER: Nothing to do".to_string())
        }
    }

    async fn app() -> (Router, Arc<InMemoryStateStore>) {
        let store = Arc::new(InMemoryStateStore::with_settings(Settings {
            credential: "secret".to_string(),
            ..Settings::default()
        }));
        watchlist::upsert(
            store.as_ref(),
            WatchlistEntry::new("TSLA", 240.0, 260.0, Some(250.0), "agent"),
        )
        .await
        .unwrap();

        let quotes = Arc::new(FixedQuotes::default().with_price("TSLA", 270.0));
        let config = AgentConfig::default();
        let registry = create_default_registry(quotes.clone(), store.clone(), &config);
        let agent = AgentLoop::new(
            Arc::new(FinalAnswerTransport),
            ActionExecutor::new(registry),
            store.clone(),
            config,
        );
        let monitor = PriceMonitor::new(quotes, store.clone(), Arc::new(TracingNotifier));

        let state = ApiState {
            agent: Arc::new(agent),
            store: store.clone(),
            monitor: Arc::new(monitor),
        };
        (create_router(state), store)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, ApiResponse) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_agent_endpoint_runs_session() {
        let (router, store) = app().await;
        let (status, body) = send(
            router,
            json_request("POST", "/api/agent", serde_json::json!({ "request": "watch TSLA" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = body.data.unwrap();
        assert_eq!(data["outcome"]["status"], "succeeded");
        assert!(!store.load_logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_agent_endpoint_rejects_invalid_request() {
        let (router, _) = app().await;
        let (status, body) = send(
            router,
            json_request("POST", "/api/agent", serde_json::json!({ "request": "hi" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_update_and_remove_watchlist_entry() {
        let (router, store) = app().await;

        let (status, _) = send(
            router.clone(),
            json_request(
                "PUT",
                "/api/watchlist/tsla",
                serde_json::json!({ "low": 230.0, "high": 270.0 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.load_watchlist().await.unwrap()["TSLA"].low, 230.0);

        let (status, _) = send(
            router.clone(),
            json_request(
                "PUT",
                "/api/watchlist/TSLA",
                serde_json::json!({ "low": 280.0, "high": 270.0 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let delete = Request::builder()
            .method("DELETE")
            .uri("/api/watchlist/TSLA")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(router.clone(), delete).await;
        assert_eq!(status, StatusCode::OK);

        let delete_again = Request::builder()
            .method("DELETE")
            .uri("/api/watchlist/TSLA")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(router, delete_again).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_settings_hide_credential() {
        let (router, store) = app().await;

        let (status, body) = send(
            router,
            json_request(
                "PUT",
                "/api/settings",
                serde_json::json!({ "check_interval_minutes": 15, "notifications_enabled": false }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let data = body.data.unwrap();
        assert_eq!(data["api_key_configured"], true);
        assert!(data.get("credential").is_none());

        let settings = store.load_settings().await.unwrap();
        assert_eq!(settings.check_interval_minutes, 15);
        assert!(!settings.notifications_enabled);
        assert_eq!(settings.credential, "secret");
    }

    #[tokio::test]
    async fn test_monitor_check_endpoint() {
        let (router, store) = app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/monitor/check")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router, request).await;

        assert_eq!(status, StatusCode::OK);
        let data = body.data.unwrap();
        assert_eq!(data["alerts"][0]["breach"], "above");
        assert_eq!(
            store.load_watchlist().await.unwrap()["TSLA"].current_price,
            Some(270.0)
        );
    }
}

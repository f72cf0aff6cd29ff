//! HTTP and WebSocket surface for the TokenScope scanner.

pub mod api;
pub mod config;
pub mod ws;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use ts_scanner::ScannerService;

pub use config::{ConfigError, ServerConfig};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub scanner: Arc<ScannerService>,
    pub subscriber_buffer: usize,
}

impl AppState {
    pub fn new(scanner: Arc<ScannerService>, subscriber_buffer: usize) -> Self {
        Self {
            scanner,
            subscriber_buffer,
        }
    }
}

/// Build the complete router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/tokens", get(api::list_tokens))
        .route("/api/tokens/:address", get(api::get_token))
        .route("/api/alerts", get(api::list_alerts))
        .route("/api/stats", get(api::stats))
        .route("/api/scan/start", post(api::start_scan))
        .route("/api/scan/stop", post(api::stop_scan))
        .route("/api/scan/status", get(api::scan_status))
        .route("/ws", get(ws::upgrade))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use serde_json::Value;
    use tower::ServiceExt;
    use ts_data::{MemoryStore, ReplayFeed, Store};
    use ts_scanner::ScanLoopConfig;
    use ts_types::alerts::{AlertKind, AlertRecord};
    use ts_types::asset::{
        AssetObservation, PersistedAsset, RiskTier, ScoredAsset, SecuritySnapshot,
    };

    fn persisted(address: &str, tier: RiskTier) -> PersistedAsset {
        let scored = ScoredAsset {
            observation: AssetObservation {
                address: address.to_string(),
                name: "CHAD".into(),
                symbol: "CHAD".into(),
                market_cap: dec!(12000),
                volume_24h: dec!(3000),
                liquidity: dec!(4500),
                price_change_24h: dec!(1.25),
                holders: 220,
                security: SecuritySnapshot::hardened(),
                timestamp: Utc::now(),
            },
            risk_score: if tier == RiskTier::Safe { 100 } else { 30 },
            tier,
        };
        PersistedAsset::detected(scored, Utc::now())
    }

    async fn app_with(store: Arc<MemoryStore>) -> Router {
        let scanner = ScannerService::new(
            Box::new(ReplayFeed::new(Vec::new())),
            store,
            ScanLoopConfig::default(),
        );
        router(AppState::new(Arc::new(scanner), 8))
    }

    async fn seeded() -> Router {
        let store = Arc::new(MemoryStore::new());
        store.upsert_asset(persisted("safe-1", RiskTier::Safe)).await.unwrap();
        store.upsert_asset(persisted("high-1", RiskTier::High)).await.unwrap();
        store
            .insert_alert(AlertRecord::new(
                "high-1",
                AlertKind::HighRisk,
                "HIGH RISK: CHAD - Review security parameters".into(),
                Utc::now(),
            ))
            .await
            .unwrap();
        app_with(store).await
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(seeded().await, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_i64());
    }

    #[tokio::test]
    async fn test_tokens_filter_by_risk_level() {
        let (status, body) = send(seeded().await, get("/api/tokens?riskLevel=safe")).await;
        assert_eq!(status, StatusCode::OK);
        let tokens = body.as_array().unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0]["address"], "safe-1");
        assert_eq!(tokens[0]["riskLevel"], "safe");

        let (_, body) = send(seeded().await, get("/api/tokens?limit=1")).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = send(seeded().await, get("/api/tokens?riskLevel=extreme")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("extreme"));
    }

    #[tokio::test]
    async fn test_single_token_lookup() {
        let (status, body) = send(seeded().await, get("/api/tokens/high-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["riskLevel"], "high");
        assert!(body.get("firstDetected").is_some());

        let (status, body) = send(seeded().await, get("/api/tokens/unknown")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Token not found");
    }

    #[tokio::test]
    async fn test_alerts_and_stats() {
        let (status, body) = send(seeded().await, get("/api/alerts?type=high_risk")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["alertType"], "high_risk");

        let (_, body) = send(seeded().await, get("/api/alerts?type=safe_opportunity")).await;
        assert!(body.as_array().unwrap().is_empty());

        let (status, body) = send(seeded().await, get("/api/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalTokens"], 2);
        assert_eq!(body["safeTokens"], 1);
        assert_eq!(body["highRisk"], 1);
        assert_eq!(body["totalAlerts"], 1);
        assert_eq!(body["recentAlerts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_scan_start_status_stop() {
        let app = app_with(Arc::new(MemoryStore::new())).await;

        let (status, body) = send(
            app.clone(),
            post("/api/scan/start", r#"{"minCap": 1000, "liquidityLocked": false}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "scanning");
        assert_eq!(body["outcome"], "started");
        assert_eq!(body["filters"]["liquidityLocked"], false);
        assert_eq!(body["filters"]["maxCap"], 15000.0);

        let (_, body) = send(app.clone(), get("/api/scan/status")).await;
        assert_eq!(body["state"], "running");

        let (_, body) = send(app.clone(), post("/api/scan/start", "")).await;
        assert_eq!(body["outcome"], "already_running");

        let (status, body) = send(app.clone(), post("/api/scan/stop", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "stopped");
        assert_eq!(body["wasRunning"], true);

        let (_, body) = send(app, get("/api/scan/status")).await;
        assert_eq!(body["state"], "idle");
    }

    #[tokio::test]
    async fn test_scan_start_rejects_bad_filters() {
        let app = app_with(Arc::new(MemoryStore::new())).await;

        let (status, body) = send(
            app.clone(),
            post("/api/scan/start", r#"{"minCap": 20000, "maxCap": 100}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("minCap"));

        let (status, _) = send(app.clone(), post("/api/scan/start", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(app, get("/api/scan/status")).await;
        assert_eq!(body["state"], "idle");
    }
}

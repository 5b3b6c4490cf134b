use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod auth;
pub mod cors;
pub mod portfolio;
pub mod records;
pub mod startup_checks;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub records: RecordsConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    /// Shared secret expected in the `x-api-key` header. Without it every
    /// privileged route is refused.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub uploads_directory: PathBuf,
    pub temp_directory: PathBuf,
    pub max_request_size_mb: usize,
    pub public_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// JSON file backing the store; `None` keeps records in memory only.
    pub database: Option<PathBuf>,
    pub visitor_window_hours: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `"*"` allows any origin.
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub max_age_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Vitrine".to_string(),
            api_key: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_directory: PathBuf::from("uploads"),
            temp_directory: PathBuf::from("tmp_uploads"),
            max_request_size_mb: 1100,
            public_prefix: "/api/uploads".to_string(),
        }
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            database: Some(PathBuf::from("records.json")),
            visitor_window_hours: 24,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["GET", "POST", "DELETE", "OPTIONS"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_headers: vec!["*".to_string()],
            max_age_seconds: 86400,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            app: AppConfig::default(),
            storage: StorageConfig::default(),
            records: RecordsConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: portfolio::SharedPortfolioStore,
    pub records: records::RecordStore,
    pub config: Config,
    pub started_at: Instant,
}

async fn health_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime": app_state.started_at.elapsed().as_secs_f64(),
    }))
}

pub async fn create_app(config: Config) -> Result<Router, records::RecordsError> {
    let store = Arc::new(portfolio::PortfolioStore::new(config.storage.clone()));
    let records = records::RecordStore::open(config.records.clone()).await?;

    let app_state = AppState {
        store,
        records,
        config: config.clone(),
        started_at: Instant::now(),
    };

    let body_limit = config.storage.max_request_size_mb * 1024 * 1024;

    Ok(Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/upload/{category}",
            post(portfolio::create_item_handler),
        )
        .route("/api/uploads", get(portfolio::list_all_handler))
        .route("/api/uploads-count", get(portfolio::count_handler))
        .route(
            "/api/uploads/{category}",
            get(portfolio::list_category_handler).post(portfolio::create_item_handler),
        )
        .route(
            "/api/uploads/{category}/{folder}",
            post(portfolio::edit_item_handler).delete(portfolio::delete_item_handler),
        )
        .route(
            "/api/uploads/{category}/{folder}/{filename}",
            get(portfolio::file_handler).delete(portfolio::delete_item_variant_handler),
        )
        .route("/api/visitors", post(records::record_visit_handler))
        .route("/api/visitors/count", get(records::visitor_count_handler))
        .route("/api/visitors/data", get(records::visitor_data_handler))
        .route(
            "/api/contact",
            post(records::submit_contact_handler).get(records::list_contacts_handler),
        )
        .route(
            "/api/contact/{id}",
            axum::routing::delete(records::delete_contact_handler),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors::build_cors_layer(&config.cors))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let method = request.method();
                    let uri = request.uri();
                    let user_agent = request
                        .headers()
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %method,
                        path = %uri.path(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = response.status();
                        let size = response
                            .headers()
                            .get("content-length")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::info!(
                            target: "access_log",
                            status = %status,
                            size = %size,
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state))
}

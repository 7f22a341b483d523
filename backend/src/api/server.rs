//! HTTP server for the KPI Lens dashboard.
//!
//! # API Endpoints
//!
//! | Method | Path                    | Description                         |
//! |--------|-------------------------|-------------------------------------|
//! | GET    | `/health`               | Health check                        |
//! | POST   | `/api/upload`           | Ingest a file and build a dashboard |
//! | POST   | `/api/kpis`             | Compute KPIs over a dataset         |
//! | POST   | `/api/format`           | Format one value                    |
//! | GET    | `/api/dashboards`       | List stored dashboards              |
//! | GET    | `/api/dashboards/{id}`  | Fetch one dashboard                 |
//! | DELETE | `/api/dashboards/{id}`  | Delete one dashboard                |
//! | GET    | `/api/logs`             | SSE stream of pipeline logs         |

use axum::{
    extract::{Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, log_success, LOG_BROADCASTER};
use super::types::{
    error_response, FormatRequest, FormattedKpi, KpisRequest, KpisResponse, UploadMetadata,
    UploadResponse,
};
use crate::config::AppConfig;
use crate::error::{ServerError, ServerResult, StoreError};
use crate::format::format_kpi_value;
use crate::kpi::{compute_kpis, suggest_kpis};
use crate::models::FormattedValue;
use crate::store::{Dashboard, DashboardStore, DashboardSummary};
use crate::transform::{ingest_bytes, IngestOptions, IngestResponse};

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<DashboardStore>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store = DashboardStore::with_dir(&config.store_dir);
        Self {
            store: Arc::new(RwLock::new(store)),
            config: Arc::new(config),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        // Failed ingests answer with the same tagged shape the pipeline produces
        if let ServerError::Ingest(e) = &self {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(IngestResponse::failure(e)),
            )
                .into_response();
        }

        let status = match &self {
            ServerError::Ingest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Mapping(_) | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the router with all routes and CORS
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/kpis", post(kpis))
        .route("/api/format", post(format_value))
        .route("/api/dashboards", get(list_dashboards))
        .route(
            "/api/dashboards/{id}",
            get(get_dashboard).delete(delete_dashboard),
        )
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let state = AppState::new(config);
    {
        let store = state.store.read().await;
        eprintln!(
            "📂 {} dashboards loaded from {}",
            store.list().len(),
            store.dir().display()
        );
    }

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    eprintln!("🚀 KPI Lens server running on http://localhost:{}", port);
    eprintln!("   POST /api/upload      - Upload CSV/JSON file");
    eprintln!("   POST /api/kpis        - Compute KPIs");
    eprintln!("   POST /api/format      - Format a value");
    eprintln!("   GET  /api/dashboards  - Stored dashboards");
    eprintln!("   GET  /api/logs        - SSE log stream");
    eprintln!("   GET  /health          - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "kpilens",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "kpis": "POST /api/kpis",
            "format": "POST /api/format",
            "dashboards": "GET /api/dashboards",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip the lost entries
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload endpoint: ingest, suggest KPIs, save the dashboard
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ServerResult<Json<UploadResponse>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut strict = state.config.strict;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                file_data = Some(bytes.to_vec());
            }
            "strict" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                strict = matches!(text.trim(), "1" | "true" | "on" | "yes");
            }
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;
    log_info(format!(
        "📄 New upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let options = IngestOptions {
        strict,
        ..IngestOptions::default()
    };
    let output = ingest_bytes(&bytes, file_name.as_deref(), &options).map_err(|e| {
        log_error(format!("Ingest failed: {}", e));
        ServerError::from(e)
    })?;

    let currency = state.config.currency.as_deref();
    let definitions = suggest_kpis(&output.dataset, currency);
    let kpis = compute_kpis(&output.dataset, &definitions);
    log_success(format!("{} KPIs computed", kpis.len()));

    let metadata = UploadMetadata::from_output(&output, file_name.clone());
    let name = file_name.unwrap_or_else(|| "upload".to_string());
    let (dashboard_id, storage) = {
        let mut store = state.store.write().await;
        let saved = store.save(&name, output.dataset.clone(), kpis.clone());
        (saved.id.clone(), saved.storage.clone())
    };

    Ok(Json(UploadResponse {
        success: true,
        dashboard_id,
        storage,
        dataset: output.dataset,
        classification: output.classification,
        kpis: FormattedKpi::all(kpis, &state.config.format_options()),
        metadata,
    }))
}

/// Compute KPIs for explicit definitions
async fn kpis(
    State(state): State<AppState>,
    Json(request): Json<KpisRequest>,
) -> ServerResult<Json<KpisResponse>> {
    for definition in &request.definitions {
        definition.check()?;
    }

    let dataset = request.dataset.normalized();
    let kpis = compute_kpis(&dataset, &request.definitions);
    let options = request
        .options
        .unwrap_or_else(|| state.config.format_options());

    Ok(Json(KpisResponse {
        success: true,
        kpis: FormattedKpi::all(kpis, &options),
    }))
}

/// Format a single value
async fn format_value(
    State(state): State<AppState>,
    Json(request): Json<FormatRequest>,
) -> Json<FormattedValue> {
    let options = request
        .options
        .unwrap_or_else(|| state.config.format_options());
    Json(format_kpi_value(
        request.value,
        request.unit.as_deref(),
        &options,
    ))
}

async fn list_dashboards(State(state): State<AppState>) -> Json<Vec<DashboardSummary>> {
    let store = state.store.read().await;
    Json(store.list().into_iter().map(DashboardSummary::from).collect())
}

async fn get_dashboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Dashboard>> {
    let store = state.store.read().await;
    store
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| StoreError::NotFound(id).into())
}

async fn delete_dashboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Value>> {
    state.store.write().await.delete(&id)?;
    log_info(format!("🗑️  Dashboard deleted: {}", id));
    Ok(Json(json!({ "success": true, "id": id })))
}

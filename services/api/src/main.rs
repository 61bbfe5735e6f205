//! API Service - Public API for the Margin Portal
//!
//! Endpoints:
//! - GET  /health - Health check
//! - POST /upload - Upload timecard/employee/project files, validate, load
//! - GET  /margins - Per-project margin rows (redacted)
//! - GET  /margins/summary - Fleet-wide margin summary
//! - POST /margins/refresh - Drop the margin cache
//! - GET  /projects - Project listing
//! - POST /ask - Natural-language question, guarded and redacted

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use pipeline::clean::{clean_all_files, PersistedRosters, UploadFiles};
use pipeline::config::PipelineConfig;
use pipeline::load::{BatchLoader, LoadResult};
use pipeline::margins::{MarginFilter, MarginService};
use pipeline::redact;
use pipeline::report::ValidationReport;
use pipeline::sqlguard::{answer_question, SqlCollaborator};
use pipeline::store::{PgStore, Store};

const ALLOWED_EXTENSIONS: &[&str] = &["csv", "xls", "xlsx"];
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// ============================================================================
// State
// ============================================================================

struct AppState {
    store: Arc<dyn Store>,
    config: PipelineConfig,
    margins: MarginService,
    upload_dir: PathBuf,
    /// External natural-language-to-SQL backend, when one is wired in.
    collaborator: Option<Arc<dyn SqlCollaborator>>,
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct UploadResponse {
    report: ValidationReport,
    load: Option<LoadResult>,
}

// ============================================================================
// Query/request params
// ============================================================================

#[derive(Deserialize)]
struct UploadQuery {
    #[serde(default)]
    validate_only: bool,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    context: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: "0.1.0",
    })
}

fn bad_request(message: impl Into<String>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn internal_error(e: impl std::fmt::Display) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn allowed_extension(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadQuery>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut timecard_path: Option<PathBuf> = None;
    let mut employee_path: Option<PathBuf> = None;
    let mut project_path: Option<PathBuf> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return bad_request(format!("invalid multipart body: {}", e)),
        };

        let slot = match field.name() {
            Some("timecard_file") => &mut timecard_path,
            Some("employee_file") => &mut employee_path,
            Some("project_file") => &mut project_path,
            _ => continue,
        };

        let filename = field.file_name().unwrap_or("upload.csv").to_string();
        if !allowed_extension(&filename) {
            return bad_request(format!(
                "unsupported file type '{}' (allowed: .csv, .xls, .xlsx)",
                filename
            ));
        }

        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => return bad_request(format!("failed to read upload: {}", e)),
        };

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        println!(
            "Received {} ({} bytes, sha256:{:x})",
            filename,
            bytes.len(),
            hasher.finalize()
        );

        let path = state.upload_dir.join(format!("{}_{}", Uuid::new_v4(), filename));
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            return internal_error(format!("failed to store upload: {}", e));
        }
        *slot = Some(path);
    }

    if timecard_path.is_none() && employee_path.is_none() && project_path.is_none() {
        return bad_request("At least one file must be uploaded");
    }

    // Rosters for the referential check when companion files are absent.
    let mut persisted = PersistedRosters::default();
    if timecard_path.is_some() {
        if employee_path.is_none() {
            match state.store.employee_roster().await {
                Ok(roster) => persisted.employee_ids = Some(roster),
                Err(e) => return internal_error(e),
            }
        }
        if project_path.is_none() {
            match state.store.project_roster().await {
                Ok(roster) => persisted.project_names = Some(roster),
                Err(e) => return internal_error(e),
            }
        }
    }

    let files = UploadFiles {
        timecard: timecard_path.as_deref(),
        employee: employee_path.as_deref(),
        project: project_path.as_deref(),
    };

    let (bundle, report) = match clean_all_files(&files, &persisted, &state.config) {
        Ok(result) => result,
        Err(e) => return internal_error(e),
    };

    // Row-level issues still return the full report with 200; only a
    // blocked load or a load failure changes what the caller must inspect.
    let mut load = None;
    if !params.validate_only
        && !report.blocks_load(state.config.max_referential_violations)
        && !bundle.is_empty()
    {
        let loader = BatchLoader::new(Arc::clone(&state.store), state.config.chunk_size);
        let result = loader.load_all(&bundle, None).await;
        state.margins.refresh();
        load = Some(result);
    }

    Json(UploadResponse { report, load }).into_response()
}

async fn margins_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<MarginFilter>,
) -> impl IntoResponse {
    match state.margins.project_margins(&filter).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn margins_summary_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.margins.margin_summary().await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn margins_refresh_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.margins.refresh();
    Json(serde_json::json!({ "refreshed": true }))
}

async fn projects_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let projects = match state.store.projects().await {
        Ok(p) => p,
        Err(e) => return internal_error(e),
    };

    // Same redaction routing as every other read path.
    let mut maps = Vec::with_capacity(projects.len());
    for p in &projects {
        match serde_json::to_value(p) {
            Ok(serde_json::Value::Object(map)) => maps.push(map),
            Ok(_) | Err(_) => return internal_error("failed to serialize project row"),
        }
    }
    match redact::redact_rows(maps) {
        Ok(rows) => Json(
            rows.into_iter()
                .map(serde_json::Value::Object)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => internal_error(e),
    }
}

async fn ask_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> impl IntoResponse {
    let Some(collaborator) = &state.collaborator else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "natural-language querying is not configured".to_string(),
            }),
        )
            .into_response();
    };

    match answer_question(collaborator.as_ref(), &request.question, request.context.as_deref()).await
    {
        Ok(answer) => Json(answer).into_response(),
        Err(e) => bad_request(e.to_string()),
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let db_url = std::env::var("DB_URL").context("DB_URL env var missing")?;
    let bind = std::env::var("API_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let upload_dir =
        PathBuf::from(std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()));

    // Fails fast on bad configuration (zero divisor, ambiguous synonyms).
    let config = PipelineConfig::from_env()?;

    println!("=== Margin Portal API ===");
    println!("Connecting to database...");

    let store: Arc<dyn Store> = Arc::new(PgStore::connect(&db_url, 10).await?);
    println!("Database connected");

    tokio::fs::create_dir_all(&upload_dir)
        .await
        .with_context(|| format!("failed to create upload dir {}", upload_dir.display()))?;

    let margins = MarginService::new(
        Arc::clone(&store),
        Duration::from_secs(config.cache_ttl_minutes * 60),
    );

    let state = Arc::new(AppState {
        store,
        config,
        margins,
        upload_dir,
        collaborator: None,
    });

    // CORS for web frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/upload", post(upload_handler))
        .route("/margins", get(margins_handler))
        .route("/margins/summary", get(margins_summary_handler))
        .route("/margins/refresh", post(margins_refresh_handler))
        .route("/projects", get(projects_handler))
        .route("/ask", post(ask_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state);

    println!("API listening on http://{}", bind);
    println!("\nEndpoints:");
    println!("  GET  /health");
    println!("  POST /upload?validate_only=");
    println!("  GET  /margins?project_name=&min_margin=&max_margin=");
    println!("  GET  /margins/summary");
    println!("  POST /margins/refresh");
    println!("  GET  /projects");
    println!("  POST /ask");

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

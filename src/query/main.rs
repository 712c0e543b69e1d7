//! Query server for gazetteer lookups and place name disambiguation.
//!
//! Provides an HTTP API for id and location lookups, plain name search, and
//! confidence-ranked disambiguation with country, admin and proximity hints.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use toponym::disambiguation::{
    Disambiguation, DisambiguationEngine, DisambiguationQuery, EngineConfig,
};
use toponym::elasticsearch::{EsCandidateSource, EsClient};
use toponym::models::GeoRecord;

mod search;
use search::{
    check_lookup_size, disambiguation_status, not_found, ApiError, DisambiguateParams,
    DisambiguateResponse, IdsRequest, LocationsRequest, RecordsResponse, SearchQueryParams,
    MAX_LOOKUP_ITEMS,
};

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Gazetteer query server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// Elasticsearch URL
    #[arg(long, default_value = "http://localhost:9200")]
    es_url: String,

    /// Elasticsearch index name
    #[arg(long, default_value = "geonames")]
    index: String,

    /// TOML file with an [engine] table overriding ranking limits
    #[arg(long)]
    engine_config: Option<PathBuf>,
}

/// Application state shared across handlers
struct AppState {
    es_client: EsClient,
    engine: DisambiguationEngine<EsCandidateSource>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Toponym Query Server");
    info!("Connecting to Elasticsearch at {}", args.es_url);

    let es_client = EsClient::new(&args.es_url, &args.index).await?;

    if !es_client.health_check().await? {
        anyhow::bail!("Elasticsearch cluster is not healthy");
    }

    let doc_count = es_client.doc_count().await?;
    info!(
        "Connected to index '{}' with {} documents",
        args.index, doc_count
    );

    let engine_config = match &args.engine_config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };
    info!("Ranking with {:?}", engine_config);

    let engine = DisambiguationEngine::with_config(
        EsCandidateSource::new(es_client.clone()),
        engine_config,
    )?;

    let state = Arc::new(AppState { es_client, engine });

    // Build router
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/v1/geoname/{id}", get(geoname_handler))
        .route("/v1/search", get(search_handler))
        .route("/v1/geonames/by_ids", post(by_ids_handler))
        .route("/v1/geonames/by_locations", post(by_locations_handler))
        .route("/v1/disambiguate", get(disambiguate_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the Toponym GeoNames API" }))
}

/// Health check endpoint
async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let healthy = state.es_client.health_check().await.unwrap_or(false);

    Ok(Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        elasticsearch: healthy,
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    elasticsearch: bool,
}

fn backend_error(context: &str, e: anyhow::Error) -> ApiError {
    tracing::error!("{} failed: {:#}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Single record by GeoNames id
async fn geoname_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<GeoRecord>, ApiError> {
    let record = state
        .es_client
        .get_by_id(id)
        .await
        .map_err(|e| backend_error("Id lookup", e))?;

    record
        .map(Json)
        .ok_or_else(|| not_found("GeoName not found"))
}

/// Plain text search without re-ranking
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQueryParams>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let start = Instant::now();
    let features = state
        .es_client
        .search_by_name(&params.name, params.size())
        .await
        .map_err(|e| backend_error("Search", e))?;

    Ok(Json(RecordsResponse {
        features,
        took_ms: start.elapsed().as_millis(),
    }))
}

async fn by_ids_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IdsRequest>,
) -> Result<Json<RecordsResponse>, ApiError> {
    check_lookup_size(request.geonameids.len(), "ids")?;

    let start = Instant::now();
    let features = state
        .es_client
        .get_by_ids(&request.geonameids)
        .await
        .map_err(|e| backend_error("Ids lookup", e))?;

    if features.is_empty() {
        return Err(not_found("No GeoNames found for the given IDs"));
    }

    Ok(Json(RecordsResponse {
        features,
        took_ms: start.elapsed().as_millis(),
    }))
}

async fn by_locations_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LocationsRequest>,
) -> Result<Json<RecordsResponse>, ApiError> {
    check_lookup_size(request.locations.len(), "locations")?;

    let start = Instant::now();
    let features = state
        .es_client
        .get_by_locations(&request.points(), MAX_LOOKUP_ITEMS)
        .await
        .map_err(|e| backend_error("Location lookup", e))?;

    if features.is_empty() {
        return Err(not_found("No GeoNames found for the given locations"));
    }

    Ok(Json(RecordsResponse {
        features,
        took_ms: start.elapsed().as_millis(),
    }))
}

/// Confidence-ranked candidates for a place name
async fn disambiguate_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DisambiguateParams>,
) -> Result<Json<DisambiguateResponse>, ApiError> {
    let start = Instant::now();
    let query = DisambiguationQuery::from(params);

    let outcome = state.engine.disambiguate(&query).await.map_err(|e| {
        let status = disambiguation_status(&e);
        if status.is_server_error() {
            tracing::error!("Disambiguation failed: {:#}", e);
        }
        (status, e.to_string())
    })?;

    match outcome {
        Disambiguation::NotFound => Err(not_found("No candidates found")),
        Disambiguation::Ranked(results) => Ok(Json(DisambiguateResponse {
            results,
            took_ms: start.elapsed().as_millis(),
        })),
    }
}

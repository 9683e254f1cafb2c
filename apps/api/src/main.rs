use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cleaning_api::config::{Config, StoreBackend};
use cleaning_api::geocoding::{DisabledGeocoder, Geocoder, MapboxGeocoder};
use cleaning_api::routes::build_router;
use cleaning_api::state::AppState;
use cleaning_api::store::{Collection, JsonFileStore, MemoryStore, RecordStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cleaning Service API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the record store
    let backend: Arc<dyn RecordStore> = match config.store_backend {
        StoreBackend::File => {
            let files = JsonFileStore::open(&config.data_dir).with_context(|| {
                format!("Failed to open data directory {}", config.data_dir.display())
            })?;
            Arc::new(files)
        }
        StoreBackend::Memory => {
            warn!("Record store: in-memory, data is lost on restart");
            Arc::new(MemoryStore::default())
        }
    };
    let store = Store::new(backend);

    for collection in Collection::ALL {
        let records: Vec<serde_json::Value> = store
            .load(collection)
            .await
            .with_context(|| format!("Failed to load {}", collection.name()))?;
        info!("Loaded {} {}", records.len(), collection.name());
    }

    // Initialize geocoder (disabled without a token)
    let geocoder: Arc<dyn Geocoder> = match &config.mapbox_token {
        Some(token) => {
            info!("Geocoder: Mapbox (country: {})", config.geocode_country);
            Arc::new(MapboxGeocoder::new(
                token.clone(),
                config.geocode_country.clone(),
            )?)
        }
        None => {
            warn!("MAPBOX_TOKEN not set, address verification is disabled");
            Arc::new(DisabledGeocoder)
        }
    };

    // Build app state
    let state = AppState::new(store, geocoder, config.geocode_confidence_threshold);

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .context("CORS_ORIGIN must be a valid header value")?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.port)
        .parse()
        .context("BIND_ADDR and PORT must form a socket address")?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the city insights dashboard.
//!
//! Serves the REST API driving the map frontend: the tile overlay
//! `GeoJSON`, the selection/advisory pipeline endpoints, and city
//! geocoding. Tile data is loaded once at startup; a missing or
//! malformed tile file degrades to an empty map rather than a failed
//! boot.

mod handlers;

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use city_insights_ai::providers::create_provider_from_env;
use city_insights_analysis::AnalysisSession;
use city_insights_tiles::TileStore;

/// Shared application state.
pub struct AppState {
    /// The selection-to-recommendation pipeline session.
    pub session: Arc<AnalysisSession>,
}

/// Starts the city insights API server.
///
/// Loads the tile store, builds the AI provider from environment
/// variables, and starts the Actix-Web HTTP server. This is a regular
/// async function — the caller provides the runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind
/// or encounters a runtime error.
///
/// # Panics
///
/// Panics if no AI provider can be configured from the environment.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let tile_path =
        std::env::var("TILE_DATA_PATH").unwrap_or_else(|_| "data/demo_tiles.json".to_string());
    log::info!("Loading tile data from {tile_path}...");
    let tiles = Arc::new(TileStore::load_or_empty(Path::new(&tile_path)));

    let provider = create_provider_from_env().expect("Failed to configure AI provider");

    let state = web::Data::new(AppState {
        session: Arc::new(AnalysisSession::new(tiles, Arc::from(provider))),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/tiles", web::get().to(handlers::tiles))
                    .route("/selection", web::get().to(handlers::get_selection))
                    .route("/selection", web::delete().to(handlers::dismiss_selection))
                    .route("/selection/tile", web::post().to(handlers::select_tile))
                    .route("/selection/region", web::post().to(handlers::draw_region))
                    .route("/draw-mode", web::put().to(handlers::set_draw_mode))
                    .route("/geocode", web::post().to(handlers::geocode)),
            )
            // Serve frontend static files (production)
            .service(Files::new("/", "app/dist").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

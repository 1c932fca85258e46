//! HTTP handler functions for the city insights API.

use actix_web::{HttpResponse, web};
use city_insights_analysis::AnalysisError;
use city_insights_server_models::{
    ApiHealth, ApiNotice, ApiSessionView, DrawModeRequest, DrawRegionRequest, GeocodeRequest,
    SelectTileRequest,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/tiles`
///
/// The raw tile `FeatureCollection` for the map overlay.
pub async fn tiles(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/geo+json")
        .body(state.session.tiles().raw_geojson().to_string())
}

/// `GET /api/selection`
///
/// The current selection, advisory state, and panel/draw flags.
pub async fn get_selection(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiSessionView::from(state.session.view()))
}

/// `POST /api/selection/tile`
///
/// Selects a single tile (map click) and fetches its advisory.
pub async fn select_tile(
    state: web::Data<AppState>,
    body: web::Json<SelectTileRequest>,
) -> HttpResponse {
    match state.session.select_tile(&body.tile_id).await {
        Ok(()) => HttpResponse::Ok().json(ApiSessionView::from(state.session.view())),
        Err(AnalysisError::UnknownTile { tile_id }) => {
            HttpResponse::NotFound().json(serde_json::json!({
                "error": format!("Unknown tile '{tile_id}'")
            }))
        }
        Err(e) => failure_response(&e),
    }
}

/// `POST /api/selection/region`
///
/// Handles a completed draw: aggregate intersecting tiles, or estimate
/// metrics from the supplied map snapshot when nothing intersects.
pub async fn draw_region(
    state: web::Data<AppState>,
    body: web::Json<DrawRegionRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    match state.session.draw_region(body.bbox, body.map_snapshot).await {
        Ok(()) => HttpResponse::Ok().json(ApiSessionView::from(state.session.view())),
        Err(e) => failure_response(&e),
    }
}

/// `DELETE /api/selection`
///
/// Dismisses the detail panel, clearing selection and advisory.
pub async fn dismiss_selection(state: web::Data<AppState>) -> HttpResponse {
    state.session.dismiss_panel();
    HttpResponse::Ok().json(ApiSessionView::from(state.session.view()))
}

/// `PUT /api/draw-mode`
pub async fn set_draw_mode(
    state: web::Data<AppState>,
    body: web::Json<DrawModeRequest>,
) -> HttpResponse {
    state.session.set_draw_mode(body.engaged);
    HttpResponse::Ok().json(ApiSessionView::from(state.session.view()))
}

/// `POST /api/geocode`
///
/// Resolves a city name to coordinates for recentering the map.
pub async fn geocode(state: web::Data<AppState>, body: web::Json<GeocodeRequest>) -> HttpResponse {
    match state.session.search_city(&body.city).await {
        Ok(coords) => HttpResponse::Ok().json(coords),
        Err(e) => failure_response(&e),
    }
}

/// Maps a pipeline failure to a JSON error body carrying the
/// user-visible notice, when the error warrants one.
fn failure_response(error: &AnalysisError) -> HttpResponse {
    log::error!("Pipeline operation failed: {error}");
    let notice = error.notice().map(ApiNotice::from);
    HttpResponse::BadGateway().json(serde_json::json!({
        "error": error.to_string(),
        "notice": notice,
    }))
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The selection-to-recommendation pipeline.
//!
//! [`AnalysisSession`] owns the session's selection state and drives the
//! full cycle: a tile click or drawn region becomes a selection, the
//! selection is normalized into the advisory input schema, and the
//! recommendation flow is queried. A draw that intersects no tiles
//! falls back to image-based metric estimation from a client-captured
//! map snapshot.
//!
//! Failure containment follows one rule: a failure in an enrichment
//! step (recommendations, geocoding) never invalidates the selection,
//! while a failure in a step the selection depends on (the estimator)
//! clears it. Every selection transition bumps an epoch counter; an
//! async completion is applied only if its epoch is still current, so a
//! late response for a superseded selection can never overwrite a newer
//! one.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use city_insights_ai::flows::{
    self, Advisory, CityCoordinates, EstimatedMetrics, Flow,
};
use city_insights_ai::providers::{self, LlmProvider};
use city_insights_ai::AiError;
use city_insights_selection::{Selection, SelectionStore, aggregate};
use city_insights_tile_models::{AggregatedRegion, BoundingBox, RegionMetrics, TileProperties};
use city_insights_tiles::TileStore;

/// User-visible failure notices. The snapshot and analysis notices must
/// stay distinguishable so the user knows which stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Notice {
    /// The client could not supply a usable map snapshot.
    #[strum(serialize = "Map Snapshot Failed")]
    SnapshotFailed,
    /// The image-based estimator call failed.
    #[strum(serialize = "AI Analysis Failed")]
    AnalysisFailed,
    /// City geocoding failed.
    #[strum(serialize = "Search Failed")]
    SearchFailed,
}

impl Notice {
    /// Longer description shown under the notice title.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SnapshotFailed => "Could not capture map image for analysis.",
            Self::AnalysisFailed => "Could not generate insights for the selected area.",
            Self::SearchFailed => "Could not find coordinates for the specified city.",
        }
    }
}

/// Errors from pipeline operations.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A map click referenced a tile the store does not know.
    #[error("Unknown tile '{tile_id}'")]
    UnknownTile {
        /// The requested tile ID.
        tile_id: String,
    },

    /// The drawn area had no tile data and no usable snapshot was
    /// supplied, so estimation could not even start.
    #[error("Map snapshot unavailable for estimation")]
    SnapshotUnavailable,

    /// The image-based estimator call failed.
    #[error("Metric estimation failed: {0}")]
    Estimation(#[source] AiError),

    /// The geocoding call failed.
    #[error("Geocoding failed: {0}")]
    Geocoding(#[source] AiError),
}

impl AnalysisError {
    /// The notice to surface to the user, if this error warrants one.
    #[must_use]
    pub const fn notice(&self) -> Option<Notice> {
        match self {
            Self::UnknownTile { .. } => None,
            Self::SnapshotUnavailable => Some(Notice::SnapshotFailed),
            Self::Estimation(_) => Some(Notice::AnalysisFailed),
            Self::Geocoding(_) => Some(Notice::SearchFailed),
        }
    }
}

/// State of the advisory request cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AdvisoryState {
    /// No advisory: nothing selected, or the last request failed
    /// (the panel renders "no recommendations", not an error).
    #[default]
    Idle,
    /// A request is in flight; the previous advisory has been discarded.
    Loading,
    /// The advisory for the current selection.
    Ready(Advisory),
}

/// A consistent snapshot of the session for rendering.
#[derive(Debug, Clone)]
pub struct SessionView {
    /// The active selection.
    pub selection: Selection,
    /// The advisory cycle state.
    pub advisory: AdvisoryState,
    /// Whether draw interactions are active.
    pub draw_mode: bool,
    /// Whether the detail panel is open (derived from the selection).
    pub panel_open: bool,
}

struct SessionState {
    store: SelectionStore,
    advisory: AdvisoryState,
    /// Bumped on every selection transition. Async completions carry
    /// the epoch captured at dispatch and are dropped if it has moved.
    epoch: u64,
}

/// One user session of the dashboard pipeline.
pub struct AnalysisSession {
    tiles: Arc<TileStore>,
    provider: Arc<dyn LlmProvider>,
    recommend: Flow<TileProperties, Advisory>,
    estimate: Flow<String, EstimatedMetrics>,
    geocode: Flow<String, CityCoordinates>,
    state: Mutex<SessionState>,
}

impl AnalysisSession {
    /// Creates a session over a tile store and an LLM provider.
    #[must_use]
    pub fn new(tiles: Arc<TileStore>, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            tiles,
            provider,
            recommend: flows::tile_recommendations(),
            estimate: flows::map_image_metrics(),
            geocode: flows::city_coordinates(),
            state: Mutex::new(SessionState {
                store: SelectionStore::new(),
                advisory: AdvisoryState::Idle,
                epoch: 0,
            }),
        }
    }

    /// The tile store backing this session.
    #[must_use]
    pub fn tiles(&self) -> &TileStore {
        &self.tiles
    }

    /// A consistent view of the current session state.
    #[must_use]
    pub fn view(&self) -> SessionView {
        let state = self.lock();
        SessionView {
            selection: state.store.selection().clone(),
            advisory: state.advisory.clone(),
            draw_mode: state.store.draw_mode(),
            panel_open: state.store.panel_open(),
        }
    }

    /// Selects a single tile by ID (map click) and fetches its advisory.
    ///
    /// The advisory request is issued fresh on every call, even for the
    /// same tile: recommendations are not a pure function of the
    /// metrics. A failed advisory fetch leaves the selection intact.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnknownTile`] if the ID is not in the
    /// store; the selection is left unchanged in that case.
    pub async fn select_tile(&self, tile_id: &str) -> Result<(), AnalysisError> {
        let tile = self
            .tiles
            .get(tile_id)
            .ok_or_else(|| AnalysisError::UnknownTile {
                tile_id: tile_id.to_string(),
            })?;

        let input = tile.properties.clone();
        let token = {
            let mut state = self.lock();
            state.epoch += 1;
            state.store.select_tile(tile);
            state.advisory = AdvisoryState::Loading;
            state.epoch
        };

        self.refresh_advisory(token, input).await;
        Ok(())
    }

    /// Handles a completed draw: intersects the box with the tile
    /// store and either aggregates or falls back to image estimation.
    ///
    /// Completing a draw disengages draw mode and replaces any previous
    /// drawn selection (at most one drawn overlay exists at a time).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::SnapshotUnavailable`] or
    /// [`AnalysisError::Estimation`] when the estimator fallback cannot
    /// produce metrics; the pending region selection is rolled back to
    /// "no selection" first.
    pub async fn draw_region(
        &self,
        bbox: BoundingBox,
        snapshot: Option<String>,
    ) -> Result<(), AnalysisError> {
        let hits = self.tiles.intersecting(&bbox);

        if let Some(metrics) = aggregate(&hits) {
            log::info!("Drawn region intersects {} tiles", metrics.count);
            let input = TileProperties::from(&metrics);
            let token = {
                let mut state = self.lock();
                state.epoch += 1;
                state.store.set_draw_mode(false);
                state.store.select_region(AggregatedRegion::Ready(metrics));
                state.advisory = AdvisoryState::Loading;
                state.epoch
            };

            self.refresh_advisory(token, input).await;
            return Ok(());
        }

        // No tile data under the draw: install the count-zero placeholder
        // so the panel shows an analyzing state, then estimate from the
        // map snapshot. The placeholder does not trigger an advisory
        // request; the resolved region does.
        log::info!("Drawn region intersects no tiles; falling back to image estimation");
        let token = {
            let mut state = self.lock();
            state.epoch += 1;
            state.store.set_draw_mode(false);
            state.store.select_region(AggregatedRegion::Analyzing);
            state.advisory = AdvisoryState::Idle;
            state.epoch
        };

        let Some(snapshot) = snapshot.filter(|uri| providers::parse_data_uri(uri).is_ok()) else {
            self.rollback_region(token);
            return Err(AnalysisError::SnapshotUnavailable);
        };

        let estimated = match self.estimate.run(self.provider.as_ref(), &snapshot).await {
            Ok(estimated) => estimated,
            Err(e) => {
                log::error!("Failed to estimate metrics from map snapshot: {e}");
                self.rollback_region(token);
                return Err(AnalysisError::Estimation(e));
            }
        };

        // The estimator covers three metrics; the rest default to zero.
        let metrics = RegionMetrics {
            count: 1,
            avg_ndvi_mean: estimated.estimated_ndvi_mean,
            avg_lst_mean_celsius_est: estimated.estimated_lst_mean_celsius,
            avg_flood_risk_score: 0.0,
            total_population_density_mean_per_km2: estimated.estimated_population_density,
            avg_greenspace_priority: 0.0,
            avg_aod_mean: 0.0,
            avg_precip_total_mean_mm: 0.0,
        };
        let input = TileProperties::from(&metrics);

        {
            let mut state = self.lock();
            if state.epoch != token {
                log::debug!("Discarding estimator result for a superseded draw");
                return Ok(());
            }
            state.store.select_region(AggregatedRegion::Ready(metrics));
            state.advisory = AdvisoryState::Loading;
        }

        self.refresh_advisory(token, input).await;
        Ok(())
    }

    /// Dismisses the detail panel: clears the selection and any
    /// advisory so the panel cannot reopen with stale data.
    pub fn dismiss_panel(&self) {
        let mut state = self.lock();
        state.epoch += 1;
        state.store.clear();
        state.advisory = AdvisoryState::Idle;
    }

    /// Engages or disengages draw mode. Does not touch the selection.
    pub fn set_draw_mode(&self, engaged: bool) {
        self.lock().store.set_draw_mode(engaged);
    }

    /// Geocodes a city name. Session state is never touched: a failed
    /// search surfaces a notice and leaves the map view unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Geocoding`] if the flow fails.
    pub async fn search_city(&self, city: &str) -> Result<CityCoordinates, AnalysisError> {
        self.geocode
            .run(self.provider.as_ref(), &city.to_string())
            .await
            .map_err(|e| {
                log::error!("Failed to geocode city '{city}': {e}");
                AnalysisError::Geocoding(e)
            })
    }

    /// Runs the advisory request and applies the result only if the
    /// selection has not moved on since dispatch.
    async fn refresh_advisory(&self, token: u64, input: TileProperties) {
        let result = self.recommend.run(self.provider.as_ref(), &input).await;

        let mut state = self.lock();
        if state.epoch != token {
            log::debug!("Discarding advisory response for a superseded selection");
            return;
        }
        match result {
            Ok(advisory) => state.advisory = AdvisoryState::Ready(advisory),
            Err(e) => {
                // Soft failure: the selection stays, the panel just
                // renders without recommendations.
                log::error!("Failed to generate recommendations: {e}");
                state.advisory = AdvisoryState::Idle;
            }
        }
    }

    /// Rolls the pending placeholder region back to "no selection",
    /// unless a newer transition already owns the state.
    fn rollback_region(&self, token: u64) {
        let mut state = self.lock();
        if state.epoch == token {
            state.store.clear();
            state.advisory = AdvisoryState::Idle;
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().expect("session state mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use city_insights_ai::providers::PromptPart;
    use tokio::sync::oneshot;

    const ADVISORY_JSON: &str = r#"{
        "overall_assessment": "Area is doing fine.",
        "recommendations": [
            {
                "action": "Add a pocket park",
                "rationale": "Low NDVI and high LST.",
                "department": "Parks",
                "confidence": 0.7
            }
        ]
    }"#;

    const ESTIMATE_JSON: &str = r#"{
        "estimated_ndvi_mean": 0.33,
        "estimated_lst_mean_celsius": 28.5,
        "estimated_population_density": 500
    }"#;

    const SNAPSHOT: &str = "data:image/png;base64,iVBORw0KGgo=";

    type CannedReply = (Option<oneshot::Receiver<()>>, Result<String, String>);

    /// Hands out canned replies in call order; a reply can be gated on
    /// a oneshot so tests can observe intermediate states.
    struct MockProvider {
        replies: std::sync::Mutex<VecDeque<CannedReply>>,
    }

    impl MockProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                replies: std::sync::Mutex::new(VecDeque::new()),
            })
        }

        fn push_ok(self: &Arc<Self>, reply: &str) {
            self.replies
                .lock()
                .unwrap()
                .push_back((None, Ok(reply.to_string())));
        }

        fn push_err(self: &Arc<Self>, message: &str) {
            self.replies
                .lock()
                .unwrap()
                .push_back((None, Err(message.to_string())));
        }

        fn push_gated_ok(self: &Arc<Self>, reply: &str) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.replies
                .lock()
                .unwrap()
                .push_back((Some(rx), Ok(reply.to_string())));
            tx
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for MockProvider {
        async fn generate(
            &self,
            _system_prompt: &str,
            _parts: &[PromptPart],
        ) -> Result<String, AiError> {
            let (gate, reply) = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected AI call");
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            reply.map_err(|message| AiError::Provider { message })
        }
    }

    fn tile(id: &str, ndvi: f64, pop: f64, west: f64, south: f64) -> String {
        format!(
            r#"{{
              "type": "Feature",
              "geometry": {{
                "type": "Polygon",
                "coordinates": [[[{west}, {south}], [{e}, {south}], [{e}, {n}], [{west}, {n}], [{west}, {south}]]]
              }},
              "properties": {{
                "tile_id": "{id}",
                "ndvi_mean": {ndvi},
                "pct_green": 20.0,
                "lst_mean_celsius_est": 30.0,
                "aod_mean": 0.1,
                "elevation_mean_m": 12.0,
                "precip_total_mean_mm": 45.0,
                "water_occurrence_mean": 0.0,
                "flood_risk_score": 0.2,
                "nightlight_index": 10.0,
                "population_density_mean_per_km2": {pop},
                "greenspace_priority": 0.5,
                "industrial_suitability": 0.4,
                "residential_suitability": 0.6,
                "best_use": "residential"
              }}
            }}"#,
            e = west + 1.0,
            n = south + 1.0,
        )
    }

    fn store_with_three_tiles() -> Arc<TileStore> {
        let doc = format!(
            r#"{{"type": "FeatureCollection", "features": [{}, {}, {}]}}"#,
            tile("t1", 0.2, 100.0, 0.0, 0.0),
            tile("t2", 0.4, 200.0, 1.0, 0.0),
            tile("t3", 0.6, 300.0, 2.0, 0.0),
        );
        Arc::new(TileStore::from_geojson_str(&doc).unwrap())
    }

    fn covering_box() -> BoundingBox {
        BoundingBox {
            west: -0.5,
            south: -0.5,
            east: 3.5,
            north: 1.5,
        }
    }

    fn far_away_box() -> BoundingBox {
        BoundingBox {
            west: 50.0,
            south: 50.0,
            east: 51.0,
            north: 51.0,
        }
    }

    #[tokio::test]
    async fn draw_aggregates_means_and_population_sum() {
        let provider = MockProvider::new();
        provider.push_ok(ADVISORY_JSON);
        let session = AnalysisSession::new(store_with_three_tiles(), provider);

        session.draw_region(covering_box(), None).await.unwrap();

        let view = session.view();
        let Selection::Region(AggregatedRegion::Ready(metrics)) = &view.selection else {
            panic!("expected a resolved region, got {:?}", view.selection);
        };
        assert_eq!(metrics.count, 3);
        assert!((metrics.avg_ndvi_mean - 0.4).abs() < 1e-9);
        assert!((metrics.total_population_density_mean_per_km2 - 600.0).abs() < 1e-9);
        assert!(matches!(view.advisory, AdvisoryState::Ready(_)));
        assert!(view.panel_open);
    }

    #[tokio::test]
    async fn empty_draw_resolves_via_estimator() {
        let provider = MockProvider::new();
        provider.push_ok(ESTIMATE_JSON);
        provider.push_ok(ADVISORY_JSON);
        let session = AnalysisSession::new(store_with_three_tiles(), provider);

        session
            .draw_region(far_away_box(), Some(SNAPSHOT.to_string()))
            .await
            .unwrap();

        let view = session.view();
        let Selection::Region(AggregatedRegion::Ready(metrics)) = &view.selection else {
            panic!("expected a resolved region, got {:?}", view.selection);
        };
        assert_eq!(metrics.count, 1);
        assert!((metrics.avg_ndvi_mean - 0.33).abs() < 1e-9);
        assert!((metrics.avg_lst_mean_celsius_est - 28.5).abs() < 1e-9);
        assert!((metrics.total_population_density_mean_per_km2 - 500.0).abs() < 1e-9);
        assert_eq!(metrics.avg_flood_risk_score, 0.0);
        assert_eq!(metrics.avg_greenspace_priority, 0.0);
        assert_eq!(metrics.avg_aod_mean, 0.0);
        assert_eq!(metrics.avg_precip_total_mean_mm, 0.0);
    }

    #[tokio::test]
    async fn placeholder_is_observable_before_estimation_resolves() {
        let provider = MockProvider::new();
        let gate = provider.push_gated_ok(ESTIMATE_JSON);
        provider.push_ok(ADVISORY_JSON);
        let session = Arc::new(AnalysisSession::new(store_with_three_tiles(), provider));

        let drawing = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                session
                    .draw_region(far_away_box(), Some(SNAPSHOT.to_string()))
                    .await
            })
        };

        // Let the draw install its placeholder and block on the gate.
        tokio::task::yield_now().await;
        let view = session.view();
        assert!(matches!(
            view.selection,
            Selection::Region(AggregatedRegion::Analyzing)
        ));
        assert_eq!(view.advisory, AdvisoryState::Idle);

        gate.send(()).unwrap();
        drawing.await.unwrap().unwrap();

        let view = session.view();
        assert!(matches!(
            view.selection,
            Selection::Region(AggregatedRegion::Ready(_))
        ));
    }

    #[tokio::test]
    async fn missing_snapshot_rolls_back_with_snapshot_notice() {
        let provider = MockProvider::new();
        let session = AnalysisSession::new(store_with_three_tiles(), provider);

        let err = session.draw_region(far_away_box(), None).await.unwrap_err();
        assert_eq!(err.notice(), Some(Notice::SnapshotFailed));

        let view = session.view();
        assert!(matches!(view.selection, Selection::None));
        assert!(!view.panel_open);
    }

    #[tokio::test]
    async fn estimator_failure_rolls_back_with_analysis_notice() {
        let provider = MockProvider::new();
        provider.push_err("model unavailable");
        let session = AnalysisSession::new(store_with_three_tiles(), provider);

        let err = session
            .draw_region(far_away_box(), Some(SNAPSHOT.to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.notice(), Some(Notice::AnalysisFailed));
        assert!(matches!(session.view().selection, Selection::None));
    }

    #[tokio::test]
    async fn advisory_failure_keeps_tile_selection() {
        let provider = MockProvider::new();
        provider.push_err("rate limited");
        let session = AnalysisSession::new(store_with_three_tiles(), provider);

        session.select_tile("t2").await.unwrap();

        let view = session.view();
        let Selection::Tile(tile) = &view.selection else {
            panic!("expected tile selection, got {:?}", view.selection);
        };
        assert_eq!(tile.properties.tile_id, "t2");
        assert_eq!(view.advisory, AdvisoryState::Idle);
        assert!(view.panel_open);
    }

    #[tokio::test]
    async fn unknown_tile_leaves_state_untouched() {
        let provider = MockProvider::new();
        let session = AnalysisSession::new(store_with_three_tiles(), provider);

        let err = session.select_tile("nope").await.unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownTile { .. }));
        assert!(err.notice().is_none());
        assert!(matches!(session.view().selection, Selection::None));
    }

    #[tokio::test]
    async fn loading_state_is_observable_between_selections() {
        let provider = MockProvider::new();
        provider.push_ok(ADVISORY_JSON);
        let gate = provider.push_gated_ok(ADVISORY_JSON);
        let session = Arc::new(AnalysisSession::new(store_with_three_tiles(), provider));

        session.select_tile("t1").await.unwrap();
        assert!(matches!(session.view().advisory, AdvisoryState::Ready(_)));

        let selecting = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.select_tile("t2").await })
        };

        // The old advisory must already be discarded while the new
        // request is in flight.
        tokio::task::yield_now().await;
        assert_eq!(session.view().advisory, AdvisoryState::Loading);

        gate.send(()).unwrap();
        selecting.await.unwrap().unwrap();
        assert!(matches!(session.view().advisory, AdvisoryState::Ready(_)));
    }

    #[tokio::test]
    async fn stale_advisory_response_is_discarded() {
        let provider = MockProvider::new();
        let stale_gate = provider.push_gated_ok(
            r#"{"overall_assessment": "STALE", "recommendations": []}"#,
        );
        provider.push_ok(ADVISORY_JSON);
        let session = Arc::new(AnalysisSession::new(store_with_three_tiles(), provider));

        let first = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.select_tile("t1").await })
        };
        tokio::task::yield_now().await;

        // Newer selection completes while the first is still in flight.
        session.select_tile("t2").await.unwrap();
        let AdvisoryState::Ready(advisory) = session.view().advisory else {
            panic!("expected advisory for t2");
        };
        assert_ne!(advisory.overall_assessment, "STALE");

        // The first selection's late response must not overwrite it.
        stale_gate.send(()).unwrap();
        first.await.unwrap().unwrap();
        let AdvisoryState::Ready(advisory) = session.view().advisory else {
            panic!("expected advisory for t2 to survive");
        };
        assert_ne!(advisory.overall_assessment, "STALE");
        let Selection::Tile(tile) = session.view().selection else {
            panic!("expected t2 to stay selected");
        };
        assert_eq!(tile.properties.tile_id, "t2");
    }

    #[tokio::test]
    async fn dismiss_clears_selection_and_advisory() {
        let provider = MockProvider::new();
        provider.push_ok(ADVISORY_JSON);
        let session = AnalysisSession::new(store_with_three_tiles(), provider);

        session.select_tile("t1").await.unwrap();
        assert!(session.view().panel_open);

        session.dismiss_panel();
        let view = session.view();
        assert!(matches!(view.selection, Selection::None));
        assert_eq!(view.advisory, AdvisoryState::Idle);
        assert!(!view.panel_open);
    }

    #[tokio::test]
    async fn draw_mode_toggle_preserves_selection() {
        let provider = MockProvider::new();
        provider.push_ok(ADVISORY_JSON);
        let session = AnalysisSession::new(store_with_three_tiles(), provider);

        session.select_tile("t1").await.unwrap();
        session.set_draw_mode(true);

        let view = session.view();
        assert!(view.draw_mode);
        assert!(matches!(view.selection, Selection::Tile(_)));
    }

    #[tokio::test]
    async fn completed_draw_disengages_draw_mode() {
        let provider = MockProvider::new();
        provider.push_ok(ADVISORY_JSON);
        let session = AnalysisSession::new(store_with_three_tiles(), provider);

        session.set_draw_mode(true);
        session.draw_region(covering_box(), None).await.unwrap();
        assert!(!session.view().draw_mode);
    }

    #[tokio::test]
    async fn geocoding_failure_leaves_state_unchanged() {
        let provider = MockProvider::new();
        provider.push_ok(ADVISORY_JSON);
        provider.push_err("no idea where that is");
        let session = AnalysisSession::new(store_with_three_tiles(), provider);

        session.select_tile("t1").await.unwrap();
        let err = session.search_city("Atlantis").await.unwrap_err();
        assert_eq!(err.notice(), Some(Notice::SearchFailed));

        let view = session.view();
        assert!(matches!(view.selection, Selection::Tile(_)));
        assert!(matches!(view.advisory, AdvisoryState::Ready(_)));
    }

    #[tokio::test]
    async fn geocoding_success_returns_coordinates() {
        let provider = MockProvider::new();
        provider.push_ok(r#"{"latitude": 51.5072, "longitude": -0.1276}"#);
        let session = AnalysisSession::new(store_with_three_tiles(), provider);

        let coords = session.search_city("London").await.unwrap();
        assert!((coords.latitude - 51.5072).abs() < 1e-9);
        assert!((coords.longitude + 0.1276).abs() < 1e-9);
    }

    #[tokio::test]
    async fn notices_are_distinguishable() {
        assert_eq!(Notice::SnapshotFailed.to_string(), "Map Snapshot Failed");
        assert_eq!(Notice::AnalysisFailed.to_string(), "AI Analysis Failed");
        assert_eq!(Notice::SearchFailed.to_string(), "Search Failed");
        assert_ne!(
            Notice::SnapshotFailed.description(),
            Notice::AnalysisFailed.description()
        );
    }
}

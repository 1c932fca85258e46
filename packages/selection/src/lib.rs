#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Selection state and region aggregation.
//!
//! [`Selection`] is a tagged union, so a single-tile selection and an
//! aggregated-region selection are mutually exclusive by construction:
//! setting one replaces the other, there is no way to hold both.
//! [`SelectionStore`] is the single mutation entry point for the
//! session's UI state (selection + draw mode); the detail panel's
//! visibility is derived from the selection, never stored.

use std::sync::Arc;

use city_insights_tile_models::{AggregatedRegion, RegionMetrics};
use city_insights_tiles::Tile;

/// The active spatial selection. At most one variant at a time.
#[derive(Debug, Clone, Default)]
pub enum Selection {
    /// Nothing selected; the detail panel is closed.
    #[default]
    None,
    /// A single tile, selected by clicking it on the map.
    Tile(Arc<Tile>),
    /// A drawn region, either still analyzing or resolved.
    Region(AggregatedRegion),
}

impl Selection {
    /// Whether anything is selected.
    #[must_use]
    pub const fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Session UI state: the active selection and the draw-mode flag.
#[derive(Debug, Default)]
pub struct SelectionStore {
    selection: Selection,
    draw_mode: bool,
}

impl SelectionStore {
    /// A fresh store with nothing selected and draw mode off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current selection.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selects a single tile, replacing any region selection.
    pub fn select_tile(&mut self, tile: Arc<Tile>) {
        log::debug!("Selecting tile {}", tile.properties.tile_id);
        self.selection = Selection::Tile(tile);
    }

    /// Selects a drawn region, replacing any tile selection.
    pub fn select_region(&mut self, region: AggregatedRegion) {
        self.selection = Selection::Region(region);
    }

    /// Clears the selection entirely. Dismissing the detail panel must
    /// go through here so it cannot reopen with stale data.
    pub fn clear(&mut self) {
        self.selection = Selection::None;
    }

    /// Whether the detail panel should be open. Derived, never stored.
    #[must_use]
    pub const fn panel_open(&self) -> bool {
        self.selection.is_some()
    }

    /// Whether draw interactions are active.
    #[must_use]
    pub const fn draw_mode(&self) -> bool {
        self.draw_mode
    }

    /// Toggles draw mode. Does not touch the selection.
    pub fn set_draw_mode(&mut self, engaged: bool) {
        self.draw_mode = engaged;
    }
}

/// Reduces a non-empty set of intersected tiles into region metrics.
///
/// Six metrics are arithmetic means. Population density is summed:
/// per-tile densities act as headcount proxies, so the region value is
/// the total, not the average. Returns `None` for an empty slice (the
/// caller falls back to image-based estimation).
#[must_use]
pub fn aggregate(tiles: &[Arc<Tile>]) -> Option<RegionMetrics> {
    if tiles.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let count = tiles.len() as f64;
    let mut ndvi = 0.0;
    let mut lst = 0.0;
    let mut flood_risk = 0.0;
    let mut population = 0.0;
    let mut greenspace = 0.0;
    let mut aod = 0.0;
    let mut precipitation = 0.0;

    for tile in tiles {
        let p = &tile.properties;
        ndvi += p.ndvi_mean;
        lst += p.lst_mean_celsius_est;
        flood_risk += p.flood_risk_score;
        population += p.population_density_mean_per_km2;
        greenspace += p.greenspace_priority;
        aod += p.aod_mean;
        precipitation += p.precip_total_mean_mm;
    }

    Some(RegionMetrics {
        count: tiles.len(),
        avg_ndvi_mean: ndvi / count,
        avg_lst_mean_celsius_est: lst / count,
        avg_flood_risk_score: flood_risk / count,
        total_population_density_mean_per_km2: population,
        avg_greenspace_priority: greenspace / count,
        avg_aod_mean: aod / count,
        avg_precip_total_mean_mm: precipitation / count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use city_insights_tile_models::{BoundingBox, TileProperties};
    use geo::MultiPolygon;

    fn tile(id: &str, ndvi: f64, pop: f64) -> Arc<Tile> {
        Arc::new(Tile {
            properties: TileProperties {
                tile_id: id.to_string(),
                ndvi_mean: ndvi,
                pct_green: 25.0,
                lst_mean_celsius_est: 30.0,
                aod_mean: 0.2,
                elevation_mean_m: 10.0,
                precip_total_mean_mm: 40.0,
                water_occurrence_mean: 0.1,
                flood_risk_score: 0.5,
                nightlight_index: 20.0,
                population_density_mean_per_km2: pop,
                greenspace_priority: 0.4,
                industrial_suitability: 0.3,
                residential_suitability: 0.7,
                best_use: "residential".to_string(),
            },
            polygon: MultiPolygon(vec![]),
            bbox: BoundingBox {
                west: 0.0,
                south: 0.0,
                east: 1.0,
                north: 1.0,
            },
        })
    }

    #[test]
    fn aggregates_means_and_population_sum() {
        let tiles = vec![
            tile("t1", 0.2, 100.0),
            tile("t2", 0.4, 200.0),
            tile("t3", 0.6, 300.0),
        ];
        let metrics = aggregate(&tiles).unwrap();
        assert_eq!(metrics.count, 3);
        assert!((metrics.avg_ndvi_mean - 0.4).abs() < 1e-9);
        assert!((metrics.total_population_density_mean_per_km2 - 600.0).abs() < 1e-9);
        assert!((metrics.avg_lst_mean_celsius_est - 30.0).abs() < 1e-9);
        assert!((metrics.avg_flood_risk_score - 0.5).abs() < 1e-9);
        assert!((metrics.avg_greenspace_priority - 0.4).abs() < 1e-9);
        assert!((metrics.avg_aod_mean - 0.2).abs() < 1e-9);
        assert!((metrics.avg_precip_total_mean_mm - 40.0).abs() < 1e-9);
    }

    #[test]
    fn empty_slice_aggregates_to_none() {
        assert!(aggregate(&[]).is_none());
    }

    #[test]
    fn tile_and_region_are_mutually_exclusive() {
        let mut store = SelectionStore::new();

        store.select_tile(tile("t1", 0.2, 100.0));
        assert!(matches!(store.selection(), Selection::Tile(_)));

        store.select_region(AggregatedRegion::Analyzing);
        assert!(matches!(store.selection(), Selection::Region(_)));

        store.select_tile(tile("t2", 0.4, 200.0));
        match store.selection() {
            Selection::Tile(t) => assert_eq!(t.properties.tile_id, "t2"),
            other => panic!("expected tile selection, got {other:?}"),
        }
    }

    #[test]
    fn panel_open_is_derived_from_selection() {
        let mut store = SelectionStore::new();
        assert!(!store.panel_open());

        store.select_tile(tile("t1", 0.2, 100.0));
        assert!(store.panel_open());

        store.clear();
        assert!(!store.panel_open());
        assert!(matches!(store.selection(), Selection::None));
    }

    #[test]
    fn draw_mode_does_not_touch_selection() {
        let mut store = SelectionStore::new();
        store.select_tile(tile("t1", 0.2, 100.0));

        store.set_draw_mode(true);
        assert!(store.draw_mode());
        assert!(matches!(store.selection(), Selection::Tile(_)));

        store.set_draw_mode(false);
        assert!(matches!(store.selection(), Selection::Tile(_)));
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core tile and aggregated-region data types.
//!
//! A tile is a polygon cell carrying pre-computed environmental and
//! demographic metrics. These types mirror the wire schema of the tile
//! GeoJSON file and the AI advisory contract, so field names stay
//! `snake_case` on the wire.

use serde::{Deserialize, Serialize};

/// The fixed property record attached to every tile.
///
/// Also doubles as the input schema of the recommendation generator:
/// a single-tile selection sends its properties verbatim, an aggregated
/// region is normalized into this shape first (see
/// [`From<&RegionMetrics>`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileProperties {
    /// Unique tile identifier.
    pub tile_id: String,
    /// Mean Normalized Difference Vegetation Index, conventionally [-1, 1].
    pub ndvi_mean: f64,
    /// Percentage of green cover.
    pub pct_green: f64,
    /// Estimated mean land surface temperature, °C.
    pub lst_mean_celsius_est: f64,
    /// Mean aerosol optical depth (air-quality proxy).
    pub aod_mean: f64,
    /// Mean elevation, meters.
    pub elevation_mean_m: f64,
    /// Total mean precipitation, millimeters.
    pub precip_total_mean_mm: f64,
    /// Mean water occurrence fraction.
    pub water_occurrence_mean: f64,
    /// Flood risk score.
    pub flood_risk_score: f64,
    /// Nightlight index.
    pub nightlight_index: f64,
    /// Mean population density per km².
    pub population_density_mean_per_km2: f64,
    /// Greenspace priority score.
    pub greenspace_priority: f64,
    /// Industrial suitability score.
    pub industrial_suitability: f64,
    /// Residential suitability score.
    pub residential_suitability: f64,
    /// Best-use classification (e.g. "residential", "green space").
    pub best_use: String,
}

/// An axis-aligned bounding box in map coordinates (WGS84 degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western (minimum) longitude.
    pub west: f64,
    /// Southern (minimum) latitude.
    pub south: f64,
    /// Eastern (maximum) longitude.
    pub east: f64,
    /// Northern (maximum) latitude.
    pub north: f64,
}

impl BoundingBox {
    /// Whether two boxes overlap (shared edges count as overlap).
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.west <= other.east
            && other.west <= self.east
            && self.south <= other.north
            && other.south <= self.north
    }
}

/// Aggregated metrics for a drawn region that resolved to actual data.
///
/// Six metrics are arithmetic means across the intersected tiles.
/// Population density is a **sum**: per-tile densities are treated as
/// additive headcount proxies, so the region value reads as total
/// occupants rather than an average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMetrics {
    /// Number of tiles behind this record. Always >= 1; an
    /// estimator-derived region counts as a single analyzed area.
    pub count: usize,
    /// Mean NDVI across intersected tiles.
    pub avg_ndvi_mean: f64,
    /// Mean land surface temperature, °C.
    pub avg_lst_mean_celsius_est: f64,
    /// Mean flood risk score.
    pub avg_flood_risk_score: f64,
    /// Summed population density (total occupants proxy).
    pub total_population_density_mean_per_km2: f64,
    /// Mean greenspace priority score.
    pub avg_greenspace_priority: f64,
    /// Mean aerosol optical depth.
    pub avg_aod_mean: f64,
    /// Mean total precipitation, millimeters.
    pub avg_precip_total_mean_mm: f64,
}

/// A drawn region's derived record.
///
/// `Analyzing` is the transient placeholder emitted when a draw
/// intersects zero tiles, before the image-based estimator resolves.
/// It carries no metrics; the UI renders it as a loading state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AggregatedRegion {
    /// No tile data intersected; estimation in progress.
    Analyzing,
    /// Metrics are available.
    Ready(RegionMetrics),
}

impl AggregatedRegion {
    /// Number of tiles behind this record (0 while analyzing).
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Analyzing => 0,
            Self::Ready(metrics) => metrics.count,
        }
    }

    /// The resolved metrics, if any.
    #[must_use]
    pub const fn metrics(&self) -> Option<&RegionMetrics> {
        match self {
            Self::Analyzing => None,
            Self::Ready(metrics) => Some(metrics),
        }
    }
}

/// Normalizes aggregated region metrics into the recommendation input
/// schema. Fields the aggregation cannot supply are sentinel `-1.0`,
/// matching the advisory contract's "not available" convention.
impl From<&RegionMetrics> for TileProperties {
    fn from(metrics: &RegionMetrics) -> Self {
        let tile_id = if metrics.count > 1 {
            format!("area with {} tiles", metrics.count)
        } else {
            "AI Analyzed Area".to_string()
        };

        Self {
            tile_id,
            ndvi_mean: metrics.avg_ndvi_mean,
            pct_green: -1.0,
            lst_mean_celsius_est: metrics.avg_lst_mean_celsius_est,
            aod_mean: metrics.avg_aod_mean,
            elevation_mean_m: -1.0,
            precip_total_mean_mm: metrics.avg_precip_total_mean_mm,
            water_occurrence_mean: -1.0,
            flood_risk_score: metrics.avg_flood_risk_score,
            nightlight_index: -1.0,
            population_density_mean_per_km2: metrics.total_population_density_mean_per_km2,
            greenspace_priority: metrics.avg_greenspace_priority,
            industrial_suitability: -1.0,
            residential_suitability: -1.0,
            best_use: "Mixed Use Area".to_string(),
        }
    }
}

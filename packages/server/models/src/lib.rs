#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the city insights server.
//!
//! These types are serialized to JSON for the REST API. Envelope fields
//! are camelCase; the embedded tile and advisory records keep the
//! snake_case names of their wire contracts.

use serde::{Deserialize, Serialize};

use city_insights_ai::flows::Advisory;
use city_insights_analysis::{AdvisoryState, Notice, SessionView};
use city_insights_selection::Selection;
use city_insights_tile_models::{AggregatedRegion, BoundingBox, TileProperties};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// The active selection, as rendered to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ApiSelection {
    /// Nothing selected.
    None,
    /// A single clicked tile.
    Tile {
        /// The tile's property record.
        properties: TileProperties,
    },
    /// A drawn region (analyzing placeholder or resolved metrics).
    Region {
        /// The region record.
        region: AggregatedRegion,
    },
}

/// The advisory cycle, as rendered to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ApiAdvisory {
    /// No advisory to show.
    Idle,
    /// A request is in flight.
    Loading,
    /// The advisory for the current selection.
    Ready {
        /// The advisory payload.
        advisory: Advisory,
    },
}

/// Full session view returned by selection endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSessionView {
    /// The active selection.
    pub selection: ApiSelection,
    /// The advisory cycle state.
    pub advisory: ApiAdvisory,
    /// Whether draw interactions are active.
    pub draw_mode: bool,
    /// Whether the detail panel is open.
    pub panel_open: bool,
}

impl From<SessionView> for ApiSessionView {
    fn from(view: SessionView) -> Self {
        let selection = match view.selection {
            Selection::None => ApiSelection::None,
            Selection::Tile(tile) => ApiSelection::Tile {
                properties: tile.properties.clone(),
            },
            Selection::Region(region) => ApiSelection::Region { region },
        };
        let advisory = match view.advisory {
            AdvisoryState::Idle => ApiAdvisory::Idle,
            AdvisoryState::Loading => ApiAdvisory::Loading,
            AdvisoryState::Ready(advisory) => ApiAdvisory::Ready { advisory },
        };
        Self {
            selection,
            advisory,
            draw_mode: view.draw_mode,
            panel_open: view.panel_open,
        }
    }
}

/// A user-visible failure notice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNotice {
    /// Notice title (e.g. "Map Snapshot Failed").
    pub title: String,
    /// Longer description.
    pub description: String,
}

impl From<Notice> for ApiNotice {
    fn from(notice: Notice) -> Self {
        Self {
            title: notice.to_string(),
            description: notice.description().to_string(),
        }
    }
}

/// Request body for selecting a single tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectTileRequest {
    /// The clicked tile's ID.
    pub tile_id: String,
}

/// Request body for a completed draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRegionRequest {
    /// The drawn rectangle in map coordinates.
    pub bbox: BoundingBox,
    /// A client-captured snapshot of the current map view as a base64
    /// data URI, used when the draw intersects no tiles.
    pub map_snapshot: Option<String>,
}

/// Request body for toggling draw mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawModeRequest {
    /// Whether draw interactions should be active.
    pub engaged: bool,
}

/// Request body for the city search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeRequest {
    /// The city name to geocode.
    pub city: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use city_insights_tile_models::RegionMetrics;

    #[test]
    fn session_view_round_trips_region() {
        let view = SessionView {
            selection: Selection::Region(AggregatedRegion::Ready(RegionMetrics {
                count: 2,
                avg_ndvi_mean: 0.3,
                avg_lst_mean_celsius_est: 27.0,
                avg_flood_risk_score: 0.1,
                total_population_density_mean_per_km2: 900.0,
                avg_greenspace_priority: 0.4,
                avg_aod_mean: 0.05,
                avg_precip_total_mean_mm: 30.0,
            })),
            advisory: AdvisoryState::Loading,
            draw_mode: false,
            panel_open: true,
        };

        let api: ApiSessionView = view.into();
        assert!(matches!(api.selection, ApiSelection::Region { .. }));
        assert!(matches!(api.advisory, ApiAdvisory::Loading));
        assert!(api.panel_open);
    }

    #[test]
    fn notice_carries_title_and_description() {
        let api: ApiNotice = Notice::SnapshotFailed.into();
        assert_eq!(api.title, "Map Snapshot Failed");
        assert_eq!(api.description, "Could not capture map image for analysis.");
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tile geometry store.
//!
//! Loads the pre-computed tile polygons from a `GeoJSON`
//! `FeatureCollection` at startup, builds an R-tree over their bounding
//! boxes, and answers the two queries the selection pipeline needs:
//! tile-by-id lookup (map click) and bounding-box intersection (drawn
//! region). The store is read-only for the lifetime of the session.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use geo::{BoundingRect, MultiPolygon};
use geojson::GeoJson;
use rstar::{AABB, RTree, RTreeObject};
use thiserror::Error;

use city_insights_tile_models::{BoundingBox, TileProperties};

/// Errors that can occur while loading tile data.
#[derive(Debug, Error)]
pub enum TileError {
    /// Reading the tile file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// A property record could not be deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is not a `FeatureCollection`.
    #[error("Expected a FeatureCollection, got {found}")]
    NotFeatureCollection {
        /// What the document root actually was.
        found: &'static str,
    },
}

/// A single tile: polygon geometry plus its immutable property record.
#[derive(Debug, Clone)]
pub struct Tile {
    /// The tile's metric record.
    pub properties: TileProperties,
    /// The tile polygon (multi-polygon to also accept `MultiPolygon`
    /// geometries in the source file).
    pub polygon: MultiPolygon<f64>,
    /// Bounding box of the polygon, the acceptance test for draws.
    pub bbox: BoundingBox,
}

#[derive(Debug)]
struct TileEntry {
    tile: Arc<Tile>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for TileEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// In-memory store of all tiles, indexed by ID and by bounding box.
#[derive(Debug)]
pub struct TileStore {
    tree: RTree<TileEntry>,
    by_id: BTreeMap<String, Arc<Tile>>,
    raw: String,
}

impl TileStore {
    /// An empty store, used when tile data is unavailable. The map still
    /// renders, clicks and draws just find no tiles.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            tree: RTree::new(),
            by_id: BTreeMap::new(),
            raw: r#"{"type":"FeatureCollection","features":[]}"#.to_string(),
        }
    }

    /// Parses a `GeoJSON` `FeatureCollection` string into a store.
    ///
    /// Features with a missing/unsupported geometry or a malformed
    /// property record are skipped with a warning rather than failing
    /// the whole load.
    ///
    /// # Errors
    ///
    /// Returns [`TileError`] if the document itself cannot be parsed or
    /// is not a `FeatureCollection`.
    pub fn from_geojson_str(raw: &str) -> Result<Self, TileError> {
        let geojson: GeoJson = raw.parse()?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(TileError::NotFeatureCollection {
                found: match geojson {
                    GeoJson::Geometry(_) => "Geometry",
                    GeoJson::Feature(_) => "Feature",
                    GeoJson::FeatureCollection(_) => unreachable!(),
                },
            });
        };

        let mut entries = Vec::new();
        let mut by_id = BTreeMap::new();

        for feature in collection.features {
            let Some(polygon) = feature.geometry.as_ref().and_then(to_multipolygon) else {
                log::warn!("Skipping tile feature without a polygon geometry");
                continue;
            };

            let Some(props) = feature.properties else {
                log::warn!("Skipping tile feature without properties");
                continue;
            };
            let properties: TileProperties =
                match serde_json::from_value(serde_json::Value::Object(props)) {
                    Ok(p) => p,
                    Err(e) => {
                        log::warn!("Skipping tile feature with malformed properties: {e}");
                        continue;
                    }
                };

            let Some(bbox) = polygon_bbox(&polygon) else {
                log::warn!(
                    "Skipping tile {} with an empty geometry",
                    properties.tile_id
                );
                continue;
            };

            let tile = Arc::new(Tile {
                properties,
                polygon,
                bbox,
            });

            entries.push(TileEntry {
                tile: Arc::clone(&tile),
                envelope: AABB::from_corners([bbox.west, bbox.south], [bbox.east, bbox.north]),
            });
            by_id.insert(tile.properties.tile_id.clone(), tile);
        }

        log::info!("Loaded {} tiles into spatial index", entries.len());

        Ok(Self {
            tree: RTree::bulk_load(entries),
            by_id,
            raw: raw.to_string(),
        })
    }

    /// Loads the store from a `GeoJSON` file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`TileError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, TileError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&raw)
    }

    /// Loads the store from disk, degrading to an empty store on any
    /// failure. The map simply renders without a tile overlay.
    #[must_use]
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::from_path(path) {
            Ok(store) => store,
            Err(e) => {
                log::warn!("Failed to load tile data from {}: {e}", path.display());
                Self::empty()
            }
        }
    }

    /// Looks up a tile by its ID (map click).
    #[must_use]
    pub fn get(&self, tile_id: &str) -> Option<Arc<Tile>> {
        self.by_id.get(tile_id).map(Arc::clone)
    }

    /// All tiles whose bounding box overlaps the drawn box, in tile-id
    /// order for deterministic aggregation.
    #[must_use]
    pub fn intersecting(&self, drawn: &BoundingBox) -> Vec<Arc<Tile>> {
        let query = AABB::from_corners([drawn.west, drawn.south], [drawn.east, drawn.north]);
        let mut tiles: Vec<Arc<Tile>> = self
            .tree
            .locate_in_envelope_intersecting(&query)
            .map(|entry| Arc::clone(&entry.tile))
            .collect();
        tiles.sort_by(|a, b| a.properties.tile_id.cmp(&b.properties.tile_id));
        tiles
    }

    /// Number of tiles in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the store holds no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// The raw `FeatureCollection` document, for the tile dump endpoint.
    #[must_use]
    pub fn raw_geojson(&self) -> &str {
        &self.raw
    }
}

/// Accepts both `Polygon` and `MultiPolygon` source geometries.
fn to_multipolygon(geometry: &geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.clone().try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

fn polygon_bbox(mp: &MultiPolygon<f64>) -> Option<BoundingBox> {
    mp.bounding_rect().map(|rect| BoundingBox {
        west: rect.min().x,
        south: rect.min().y,
        east: rect.max().x,
        north: rect.max().y,
    })
}

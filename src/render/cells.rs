//! Colored H3 cell polygons.

use h3o::CellIndex;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use super::geo::unwrap_ring;
use crate::colormaps::ColorScale;
use crate::fetcher::Record;

/// One record drawn as a filled hexagon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedCell {
    pub h3: String,
    pub value: f64,
    pub fill: [u8; 3],
    /// Open ring of `[lon, lat]` vertices in degrees
    pub boundary: Vec<[f64; 2]>,
}

/// The full set of cells for one snapshot
#[derive(Debug, Clone, Default, Serialize)]
pub struct CellLayer {
    pub cells: Vec<RenderedCell>,
    /// Records whose cell index could not be parsed
    pub skipped: usize,
}

impl CellLayer {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// GeoJSON FeatureCollection with one polygon per cell
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .cells
            .iter()
            .map(|cell| {
                let mut ring: Vec<[f64; 2]> = cell.boundary.clone();
                if let Some(first) = ring.first().copied() {
                    ring.push(first);
                }
                json!({
                    "type": "Feature",
                    "id": cell.h3,
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [ring],
                    },
                    "properties": {
                        "h3": cell.h3,
                        "value": cell.value,
                        "fill": cell.fill,
                        "color": format!("#{:02x}{:02x}{:02x}", cell.fill[0], cell.fill[1], cell.fill[2]),
                    }
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

/// Cell boundary in degrees, unwrapped across the antimeridian
pub fn cell_boundary(cell: CellIndex) -> Vec<[f64; 2]> {
    let mut ring: Vec<[f64; 2]> = cell
        .boundary()
        .iter()
        .map(|vertex| [vertex.lng(), vertex.lat()])
        .collect();
    unwrap_ring(&mut ring);
    ring
}

/// Produce one colored cell per record
pub fn render_cells(records: &[Record], scale: &ColorScale) -> CellLayer {
    let mut layer = CellLayer {
        cells: Vec::with_capacity(records.len()),
        skipped: 0,
    };

    for record in records {
        let cell: CellIndex = match record.h3.parse() {
            Ok(cell) => cell,
            Err(e) => {
                layer.skipped += 1;
                if layer.skipped == 1 {
                    warn!(h3 = %record.h3, error = %e, "Skipping record with invalid cell index");
                }
                continue;
            }
        };

        layer.cells.push(RenderedCell {
            h3: record.h3.clone(),
            value: record.value,
            fill: scale.apply(record.value).to_rgb(),
            boundary: cell_boundary(cell),
        });
    }

    if layer.skipped > 1 {
        warn!(skipped = layer.skipped, "Records with invalid cell indices were skipped");
    }

    layer
}

//! Layer catalog loading.
//!
//! The catalog is a static JSON manifest listing every selectable layer
//! with its display name, color domain and available depth levels. It is
//! read once at startup; the first entry becomes the default selection.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{HexlayerError, Result};
use crate::source::ResourceSource;

/// One selectable dataset family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Stable identifier, also the last component of dataset keys
    #[serde(alias = "value")]
    pub id: String,
    /// Display name
    pub name: String,
    /// Numeric range mapped onto the colormap
    pub domain: [f64; 2],
    /// Depth levels offered for this layer
    #[serde(default)]
    pub depths: Vec<i32>,
    /// Record property carrying the value; defaults to the layer id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl LayerDescriptor {
    /// Resolve the record property to color by
    pub fn value_field<'a>(&'a self, global_override: Option<&'a str>) -> &'a str {
        global_override
            .or(self.field.as_deref())
            .unwrap_or(&self.id)
    }

    /// First depth on offer
    pub fn default_depth(&self) -> i32 {
        self.depths.first().copied().unwrap_or(0)
    }
}

/// The loaded set of layers, in manifest order
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    layers: Vec<LayerDescriptor>,
}

impl Catalog {
    /// Build a catalog from descriptors, normalizing and validating them
    pub fn new(layers: Vec<LayerDescriptor>) -> Result<Self> {
        let mut layers = layers;
        for layer in &mut layers {
            if layer.id.is_empty() {
                return Err(HexlayerError::CatalogUnavailable {
                    message: format!("Layer '{}' has an empty id", layer.name),
                });
            }
            if !layer.domain.iter().all(|v| v.is_finite()) {
                return Err(HexlayerError::CatalogUnavailable {
                    message: format!("Layer '{}' has a non-finite domain", layer.id),
                });
            }
            if layer.depths.is_empty() {
                debug!(layer = %layer.id, "Layer lists no depths, assuming surface only");
                layer.depths.push(0);
            }
        }
        Ok(Self { layers })
    }

    /// Parse a catalog manifest
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let layers: Vec<LayerDescriptor> =
            serde_json::from_slice(bytes).map_err(|e| HexlayerError::CatalogUnavailable {
                message: format!("Malformed catalog: {}", e),
            })?;
        Self::new(layers)
    }

    /// Retrieve and parse the catalog from a resource source
    pub async fn load(source: &dyn ResourceSource, path: &str) -> Result<Self> {
        let start = Instant::now();
        let payload = source
            .fetch(path)
            .await
            .map_err(|e| HexlayerError::CatalogUnavailable {
                message: e.to_string(),
            })?;

        // The manifest is small and may itself be served compressed
        let text = crate::fetcher::decode_payload(&payload).map_err(|e| {
            HexlayerError::CatalogUnavailable {
                message: e.to_string(),
            }
        })?;
        let catalog = Self::from_slice(text.as_bytes())?;

        info!(
            operation = "catalog_load",
            path = path,
            layer_count = catalog.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Catalog loaded"
        );
        Ok(catalog)
    }

    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    /// Default selection: the first layer
    pub fn first(&self) -> Option<&LayerDescriptor> {
        self.layers.first()
    }

    pub fn get(&self, id: &str) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

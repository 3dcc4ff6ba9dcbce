//! Application state shared by all handlers.
//!
//! Built once at startup: the resource source, the loaded catalog, the
//! selection controller and the map renderer's memo.

use std::sync::Arc;
use tracing::info;

use crate::catalog::Catalog;
use crate::colormaps::get_colormap;
use crate::config::Config;
use crate::controller::SelectionController;
use crate::error::Result;
use crate::fetcher::DatasetFetcher;
use crate::render::MapRenderer;
use crate::selection::Month;
use crate::source::{source_for, ResourceSource};

/// The main application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub source: Arc<dyn ResourceSource>,
    pub controller: Arc<SelectionController>,
    pub renderer: MapRenderer,
}

impl AppState {
    /// Load the catalog named by `config` and set up the controller.
    /// Does not fetch any dataset.
    pub async fn build(config: Config) -> Result<Self> {
        let source: Arc<dyn ResourceSource> = Arc::from(source_for(&config.data.source));
        Self::with_source(config, source).await
    }

    /// Same as [`AppState::build`] with an explicit source
    pub async fn with_source(config: Config, source: Arc<dyn ResourceSource>) -> Result<Self> {
        info!(source = %source.describe(), "Using resource source");

        let catalog = Arc::new(Catalog::load(source.as_ref(), &config.data.catalog_path).await?);
        let months = config.months()?;
        let default_month: Month = config.view.default_month.parse()?;
        let colormap = get_colormap(&config.view.colormap)?;

        let fetcher = Arc::new(DatasetFetcher::new(
            source.clone(),
            &config.data.data_dir,
            config.data.dataset_suffixes.clone(),
        ));
        let controller = SelectionController::new(
            catalog,
            months,
            default_month,
            colormap,
            config.data.value_field.clone(),
            fetcher,
        )?;

        Ok(Self {
            config,
            source,
            controller: Arc::new(controller),
            renderer: MapRenderer::new(),
        })
    }

    /// Read the map style document unchanged
    pub async fn style(&self) -> Result<bytes::Bytes> {
        let payload = self.source.fetch(&self.config.data.style_path).await?;
        Ok(payload.bytes)
    }
}

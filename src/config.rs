//! Configuration management for hexlayer.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::colormaps;
use crate::error::{HexlayerError, Result};
use crate::selection::Month;

/// Command-line arguments for hexlayer
#[derive(Parser, Debug)]
#[command(name = "hexlayer")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Resource root: a local directory or an http(s):// base URL
    pub source: Option<String>,

    /// Host address to bind to
    #[arg(short = 'H', long, env = "HEXLAYER_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "HEXLAYER_PORT")]
    pub port: Option<u16>,

    /// Number of worker threads
    #[arg(short, long, env = "HEXLAYER_WORKERS")]
    pub workers: Option<usize>,

    /// Path to JSON configuration file
    #[arg(short, long, env = "HEXLAYER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HEXLAYER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Colormap used for cell fills and the legend
    #[arg(long, env = "HEXLAYER_COLORMAP")]
    pub colormap: Option<String>,

    /// Record property holding the value to color by (overrides the per-layer default)
    #[arg(long, env = "HEXLAYER_VALUE_FIELD")]
    pub value_field: Option<String>,

    /// Month selected at startup (YYYYMM)
    #[arg(long, env = "HEXLAYER_MONTH")]
    pub month: Option<String>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads (None = number of CPU cores)
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Where resources live and how they are named
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Resource root: a directory or an http(s) base URL
    #[serde(default = "default_source")]
    pub source: String,

    /// Catalog resource, relative to the source
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Directory holding dataset files, relative to the source
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Dataset file suffixes, tried in order
    #[serde(default = "default_dataset_suffixes")]
    pub dataset_suffixes: Vec<String>,

    /// Base-map style resource, relative to the source
    #[serde(default = "default_style_path")]
    pub style_path: String,

    /// Global override for the record value field
    #[serde(default)]
    pub value_field: Option<String>,
}

/// Selection and rendering defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Months offered for selection (YYYYMM)
    #[serde(default = "default_months")]
    pub months: Vec<String>,

    /// Month selected at startup
    #[serde(default = "default_month")]
    pub default_month: String,

    /// Colormap name
    #[serde(default = "default_colormap")]
    pub colormap: String,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Data configuration
    #[serde(default)]
    pub data: DataConfig,

    /// View configuration
    #[serde(default)]
    pub view: ViewConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Build a configuration from already-parsed arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        if let Some(source) = args.source {
            config.data.source = source;
        }
        if let Some(host) = args.host {
            config.server.host = host;
        }
        if let Some(port) = args.port {
            config.server.port = port;
        }
        if args.workers.is_some() {
            config.server.workers = args.workers;
        }
        if let Some(log_level) = args.log_level {
            config.log_level = log_level;
        }
        if let Some(colormap) = args.colormap {
            config.view.colormap = colormap;
        }
        if args.value_field.is_some() {
            config.data.value_field = args.value_field;
        }
        if let Some(month) = args.month {
            config.view.default_month = month;
        }

        Ok(config)
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        self.server.host = other.server.host;
        self.server.port = other.server.port;
        if other.server.workers.is_some() {
            self.server.workers = other.server.workers;
        }
        self.data = other.data;
        self.view = other.view;
        self.log_level = other.log_level;
    }

    /// Parsed list of selectable months
    pub fn months(&self) -> Result<Vec<Month>> {
        self.view.months.iter().map(|m| m.parse()).collect()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(HexlayerError::Config {
                message: "Server host cannot be empty".to_string(),
            });
        }

        // Validate port (0 is not a valid port for users)
        if self.server.port == 0 {
            return Err(HexlayerError::Config {
                message: "Server port cannot be 0".to_string(),
            });
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(HexlayerError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        if self.data.source.is_empty() {
            return Err(HexlayerError::Config {
                message: "Resource source cannot be empty".to_string(),
            });
        }

        if self.data.dataset_suffixes.is_empty() {
            return Err(HexlayerError::Config {
                message: "At least one dataset suffix is required".to_string(),
            });
        }

        let months = self.months().map_err(|e| HexlayerError::Config {
            message: format!("Invalid months list: {}", e),
        })?;
        if months.is_empty() {
            return Err(HexlayerError::Config {
                message: "Months list cannot be empty".to_string(),
            });
        }
        if !months.iter().any(|m| m.as_str() == self.view.default_month) {
            return Err(HexlayerError::Config {
                message: format!(
                    "Default month {} is not in the months list",
                    self.view.default_month
                ),
            });
        }

        if colormaps::get_colormap(&self.view.colormap).is_err() {
            return Err(HexlayerError::Config {
                message: format!(
                    "Invalid colormap: {}. Must be one of: {}",
                    self.view.colormap,
                    colormaps::COLORMAP_NAMES.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            data: DataConfig::default(),
            view: ViewConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            catalog_path: default_catalog_path(),
            data_dir: default_data_dir(),
            dataset_suffixes: default_dataset_suffixes(),
            style_path: default_style_path(),
            value_field: None,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            months: default_months(),
            default_month: default_month(),
            colormap: default_colormap(),
        }
    }
}

// Default value functions for serde
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_source() -> String {
    ".".to_string()
}

fn default_catalog_path() -> String {
    "layers.json".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_dataset_suffixes() -> Vec<String> {
    vec![".json.gz".to_string(), ".json".to_string()]
}

fn default_style_path() -> String {
    "style.json".to_string()
}

fn default_months() -> Vec<String> {
    (1..=12).map(|m| format!("2023{:02}", m)).collect()
}

fn default_month() -> String {
    "202307".to_string()
}

fn default_colormap() -> String {
    "viridis".to_string()
}

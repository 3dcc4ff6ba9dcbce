//! Error types for the hexlayer application.
//!
//! The first four variants are the pipeline taxonomy: catalog, fetch, decode
//! and parse failures. All of them are terminal for the operation that hit
//! them; nothing here is retried automatically.

use axum::http::StatusCode;
use thiserror::Error;

/// The main error type for hexlayer operations.
#[derive(Error, Debug)]
pub enum HexlayerError {
    /// The layer catalog could not be retrieved or parsed
    #[error("Catalog unavailable: {message}")]
    CatalogUnavailable { message: String },

    /// A resource could not be retrieved from its source
    #[error("Fetch error for {resource}: {message}")]
    Fetch { resource: String, message: String },

    /// Malformed compression or text encoding
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Malformed structured content
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// Image generation errors
    #[error("Image generation error: {message}")]
    ImageGeneration { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server errors
    #[error("Server error: {message}")]
    Server { message: String },
}

impl HexlayerError {
    /// Shorthand for an `InvalidParameter` error
    pub fn invalid_param(param: &str, message: impl Into<String>) -> Self {
        HexlayerError::InvalidParameter {
            param: param.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status the API reports for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            HexlayerError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            HexlayerError::CatalogUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            HexlayerError::Fetch { .. } | HexlayerError::Decode { .. } | HexlayerError::Parse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenience type alias for Results with HexlayerError
pub type Result<T> = std::result::Result<T, HexlayerError>;

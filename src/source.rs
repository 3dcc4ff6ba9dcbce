//! Resource sources.
//!
//! A source turns a relative resource path into raw bytes plus whatever
//! content encoding the transport declared. Two sources exist: a local
//! directory and an HTTP base URL. Neither decompresses anything; that is
//! the fetcher's decision.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_ENCODING;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::HexlayerError;

/// Raw resource contents
#[derive(Debug, Clone)]
pub struct Payload {
    pub bytes: Bytes,
    /// Content encoding declared by the transport, e.g. `gzip`
    pub declared_encoding: Option<String>,
}

impl Payload {
    pub fn new(bytes: impl Into<Bytes>, declared_encoding: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            declared_encoding: declared_encoding.map(str::to_string),
        }
    }
}

/// Failure to retrieve a resource
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("failed to retrieve {resource}: {message}")]
    Unavailable { resource: String, message: String },
}

impl From<SourceError> for HexlayerError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(resource) => HexlayerError::Fetch {
                resource,
                message: "not found".to_string(),
            },
            SourceError::Unavailable { resource, message } => {
                HexlayerError::Fetch { resource, message }
            }
        }
    }
}

/// Somewhere resources can be read from
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// Retrieve the resource at `path`, relative to the source root
    async fn fetch(&self, path: &str) -> std::result::Result<Payload, SourceError>;

    /// Human-readable description of the root, for logs
    fn describe(&self) -> String;
}

/// Build the source named by a config string: a URL or a directory
pub fn source_for(root: &str) -> Box<dyn ResourceSource> {
    if root.starts_with("http://") || root.starts_with("https://") {
        Box::new(HttpSource::new(root))
    } else {
        Box::new(DirectorySource::new(root))
    }
}

/// Reads resources from a local directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ResourceSource for DirectorySource {
    async fn fetch(&self, path: &str) -> std::result::Result<Payload, SourceError> {
        let full_path = self.root.join(path.trim_start_matches('/'));
        debug!(path = %full_path.display(), "Reading resource from disk");

        match tokio::fs::read(&full_path).await {
            Ok(bytes) => {
                // A static file server would declare gzip for .gz files
                let declared = path.ends_with(".gz").then_some("gzip");
                Ok(Payload::new(bytes, declared))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(path.to_string()))
            }
            Err(e) => Err(SourceError::Unavailable {
                resource: path.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Reads resources relative to an HTTP base URL
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ResourceSource for HttpSource {
    async fn fetch(&self, path: &str) -> std::result::Result<Payload, SourceError> {
        let url = self.url_for(path);
        debug!(url = %url, "Requesting resource");

        let unavailable = |message: String| SourceError::Unavailable {
            resource: url.clone(),
            message,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(SourceError::NotFound(url.clone())),
            status if !status.is_success() => {
                return Err(unavailable(format!("HTTP status {}", status)))
            }
            _ => {}
        }

        let declared = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        Ok(Payload {
            bytes,
            declared_encoding: declared,
        })
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

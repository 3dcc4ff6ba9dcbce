//! Dataset fetching and decoding.
//!
//! A dataset is located by its [`DatasetKey`], read from a resource source,
//! decoded (gzip or plain UTF-8, chosen by sniffing the magic bytes) and
//! parsed into [`Record`]s. Every call is a full re-fetch.

use flate2::read::MultiGzDecoder;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::{HexlayerError, Result};
use crate::logging::log_dataset_stats;
use crate::selection::DatasetKey;
use crate::source::{Payload, ResourceSource, SourceError};

/// The two-byte gzip magic number
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Field holding the H3 cell index in every record
pub const CELL_FIELD: &str = "h3";

/// One data point: a cell and the value to color it by
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub h3: String,
    pub value: f64,
}

impl Record {
    pub fn new(h3: impl Into<String>, value: f64) -> Self {
        Self {
            h3: h3.into(),
            value,
        }
    }
}

/// How a payload's bytes are turned into text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeStrategy {
    Gzip,
    Plain,
}

impl DecodeStrategy {
    /// Pick the strategy for a payload.
    ///
    /// The bytes are authoritative: transports may already have removed the
    /// compression they still declare, or serve `.gz` files without saying so.
    /// The declared encoding is only compared against the sniffed one.
    pub fn select(bytes: &[u8], declared_encoding: Option<&str>) -> Self {
        let strategy = if is_gzip(bytes) {
            DecodeStrategy::Gzip
        } else {
            DecodeStrategy::Plain
        };

        let declared_gzip = declared_encoding
            .map(|e| e.eq_ignore_ascii_case("gzip"))
            .unwrap_or(false);
        if declared_gzip != (strategy == DecodeStrategy::Gzip) {
            debug!(
                declared = declared_encoding.unwrap_or("none"),
                sniffed = ?strategy,
                "Declared content encoding disagrees with payload, using sniffed"
            );
        }

        strategy
    }

    /// Decode bytes to text with this strategy
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            DecodeStrategy::Gzip => {
                let mut text = String::new();
                MultiGzDecoder::new(bytes)
                    .read_to_string(&mut text)
                    .map_err(|e| HexlayerError::Decode {
                        message: format!("gzip: {}", e),
                    })?;
                Ok(text)
            }
            DecodeStrategy::Plain => std::str::from_utf8(bytes)
                .map(str::to_string)
                .map_err(|e| HexlayerError::Decode {
                    message: format!("utf-8: {}", e),
                }),
        }
    }
}

/// Whether the bytes start with the gzip magic number
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC
}

/// Decode a payload to text using the strategy its bytes call for
pub fn decode_payload(payload: &Payload) -> Result<String> {
    DecodeStrategy::select(&payload.bytes, payload.declared_encoding.as_deref())
        .decode(&payload.bytes)
}

/// Records parsed from one dataset text
#[derive(Debug, Clone, Default)]
pub struct ParsedRecords {
    pub records: Vec<Record>,
    /// Records dropped because the value field was missing or null
    pub skipped: usize,
}

/// Parse dataset text into records, reading the value from `field`
pub fn parse_records(text: &str, field: &str) -> Result<ParsedRecords> {
    let rows: Vec<Map<String, Value>> =
        serde_json::from_str(text).map_err(|e| HexlayerError::Parse {
            message: format!("expected an array of objects: {}", e),
        })?;

    let mut parsed = ParsedRecords {
        records: Vec::with_capacity(rows.len()),
        skipped: 0,
    };

    for (index, row) in rows.iter().enumerate() {
        let h3 = match row.get(CELL_FIELD) {
            Some(Value::String(h3)) => h3.clone(),
            _ => {
                return Err(HexlayerError::Parse {
                    message: format!("record {} has no string '{}' field", index, CELL_FIELD),
                })
            }
        };

        match row.get(field) {
            Some(Value::Number(n)) => match n.as_f64() {
                Some(value) => parsed.records.push(Record { h3, value }),
                None => parsed.skipped += 1,
            },
            None | Some(Value::Null) => parsed.skipped += 1,
            Some(other) => {
                return Err(HexlayerError::Parse {
                    message: format!(
                        "record {} field '{}' is not numeric: {}",
                        index, field, other
                    ),
                })
            }
        }
    }

    Ok(parsed)
}

/// A fetched and decoded dataset
#[derive(Debug, Clone)]
pub struct Dataset {
    pub key: DatasetKey,
    /// Resource path the data was read from
    pub resource: String,
    pub strategy: DecodeStrategy,
    pub records: Vec<Record>,
    pub skipped: usize,
}

/// Fetches datasets by key from a resource source
pub struct DatasetFetcher {
    source: Arc<dyn ResourceSource>,
    data_dir: String,
    suffixes: Vec<String>,
}

impl DatasetFetcher {
    pub fn new(source: Arc<dyn ResourceSource>, data_dir: &str, suffixes: Vec<String>) -> Self {
        Self {
            source,
            data_dir: data_dir.trim_end_matches('/').to_string(),
            suffixes,
        }
    }

    /// Candidate resource paths for a key, in the order they are tried
    pub fn resource_paths(&self, key: &DatasetKey) -> Vec<String> {
        self.suffixes
            .iter()
            .map(|suffix| {
                if self.data_dir.is_empty() {
                    format!("{}{}", key, suffix)
                } else {
                    format!("{}/{}{}", self.data_dir, key, suffix)
                }
            })
            .collect()
    }

    /// Retrieve, decode and parse the dataset for `key`
    pub async fn fetch(&self, key: &DatasetKey, field: &str) -> Result<Dataset> {
        let start = Instant::now();
        let (resource, payload) = self.retrieve(key).await?;

        let strategy = DecodeStrategy::select(&payload.bytes, payload.declared_encoding.as_deref());
        let text = strategy.decode(&payload.bytes)?;
        let parsed = parse_records(&text, field)?;

        if parsed.skipped > 0 {
            warn!(
                key = %key,
                field = field,
                skipped = parsed.skipped,
                "Records without a value were dropped"
            );
        }

        log_dataset_stats(
            &key.to_string(),
            &resource,
            payload.bytes.len(),
            parsed.records.len(),
            start,
        );

        Ok(Dataset {
            key: key.clone(),
            resource,
            strategy,
            records: parsed.records,
            skipped: parsed.skipped,
        })
    }

    /// Try each candidate path; only a missing resource moves on to the next
    async fn retrieve(&self, key: &DatasetKey) -> Result<(String, Payload)> {
        let paths = self.resource_paths(key);
        for path in &paths {
            match self.source.fetch(path).await {
                Ok(payload) => return Ok((path.clone(), payload)),
                Err(SourceError::NotFound(_)) => {
                    debug!(path = %path, "Dataset candidate not found");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(HexlayerError::Fetch {
            resource: paths.join(", "),
            message: format!("no dataset for key {}", key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_gzip_detection() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x08]));
        assert!(!is_gzip(&[0x1f]));
        assert!(!is_gzip(b"[{}]"));
        assert!(!is_gzip(&[]));
    }

    #[test]
    fn test_strategy_follows_bytes_not_header() {
        let json = r#"[{"h3": "861f18a07ffffff", "value": 1}]"#;
        let compressed = gzip(json);

        assert_eq!(DecodeStrategy::select(&compressed, None), DecodeStrategy::Gzip);
        assert_eq!(
            DecodeStrategy::select(json.as_bytes(), Some("gzip")),
            DecodeStrategy::Plain
        );
    }

    #[test]
    fn test_decode_round_trip() {
        let json = r#"[{"h3": "861f18a07ffffff", "traffic_density": 3.5}]"#;
        let payload = Payload::new(gzip(json), Some("gzip"));
        assert_eq!(decode_payload(&payload).unwrap(), json);

        let payload = Payload::new(json.as_bytes().to_vec(), Some("gzip"));
        assert_eq!(decode_payload(&payload).unwrap(), json);
    }

    #[test]
    fn test_decode_errors() {
        // Valid gzip header followed by a deflate block of reserved type
        let corrupt = [0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff, 0xff];
        let err = DecodeStrategy::Gzip.decode(&corrupt).unwrap_err();
        assert!(matches!(err, HexlayerError::Decode { .. }));

        let err = DecodeStrategy::Plain.decode(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, HexlayerError::Decode { .. }));
    }

    #[test]
    fn test_parse_records_with_field() {
        let text = r#"[
            {"h3": "861f18a07ffffff", "traffic_density": 0},
            {"h3": "861f18a0fffffff", "traffic_density": 10},
            {"h3": "861f18a17ffffff", "traffic_density": null},
            {"h3": "861f18a1fffffff"}
        ]"#;
        let parsed = parse_records(text, "traffic_density").unwrap();
        assert_eq!(
            parsed.records,
            vec![
                Record::new("861f18a07ffffff", 0.0),
                Record::new("861f18a0fffffff", 10.0),
            ]
        );
        assert_eq!(parsed.skipped, 2);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_records("{\"h3\": 1}", "value"),
            Err(HexlayerError::Parse { .. })
        ));
        assert!(matches!(
            parse_records(r#"[{"value": 1}]"#, "value"),
            Err(HexlayerError::Parse { .. })
        ));
        assert!(matches!(
            parse_records(r#"[{"h3": "861f18a07ffffff", "value": "high"}]"#, "value"),
            Err(HexlayerError::Parse { .. })
        ));
    }

    #[test]
    fn test_resource_paths() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = DatasetFetcher::new(
            Arc::new(crate::source::DirectorySource::new(dir.path())),
            "data/",
            vec![".json.gz".to_string(), ".json".to_string()],
        );
        let key = DatasetKey::new("202307".parse().unwrap(), 0, "traffic_density");
        assert_eq!(
            fetcher.resource_paths(&key),
            vec![
                "data/202307-0-traffic_density.json.gz",
                "data/202307-0-traffic_density.json"
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_plain_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(
            dir.path().join("data/202301-0-sst.json"),
            r#"[{"h3": "861f18a07ffffff", "sst": 4.25}]"#,
        )
        .unwrap();

        let fetcher = DatasetFetcher::new(
            Arc::new(crate::source::DirectorySource::new(dir.path())),
            "data",
            vec![".json.gz".to_string(), ".json".to_string()],
        );
        let key = DatasetKey::new("202301".parse().unwrap(), 0, "sst");
        let dataset = fetcher.fetch(&key, "sst").await.unwrap();

        assert_eq!(dataset.resource, "data/202301-0-sst.json");
        assert_eq!(dataset.strategy, DecodeStrategy::Plain);
        assert_eq!(dataset.records, vec![Record::new("861f18a07ffffff", 4.25)]);

        let missing = DatasetKey::new("202302".parse().unwrap(), 0, "sst");
        assert!(matches!(
            fetcher.fetch(&missing, "sst").await,
            Err(HexlayerError::Fetch { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_gzip_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(
            dir.path().join("data/202307-0-traffic_density.json.gz"),
            gzip(r#"[{"h3": "861f18a07ffffff", "traffic_density": 7}]"#),
        )
        .unwrap();

        let fetcher = DatasetFetcher::new(
            Arc::new(crate::source::DirectorySource::new(dir.path())),
            "data",
            vec![".json.gz".to_string(), ".json".to_string()],
        );
        let key = DatasetKey::new("202307".parse().unwrap(), 0, "traffic_density");
        let dataset = fetcher.fetch(&key, "traffic_density").await.unwrap();

        assert_eq!(dataset.strategy, DecodeStrategy::Gzip);
        assert_eq!(dataset.records.len(), 1);
        assert_eq!(dataset.records[0].value, 7.0);
    }
}

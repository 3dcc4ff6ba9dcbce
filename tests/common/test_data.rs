//! Test data generation utilities.
//!
//! Writes a small but complete resource tree into a directory: a catalog,
//! gzipped and plain datasets, and a map style.

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Four adjacent resolution-6 cells
pub const CELLS: [&str; 4] = [
    "861f18a07ffffff",
    "861f18a0fffffff",
    "861f18a17ffffff",
    "861f18a1fffffff",
];

/// Map style served by `/style.json`, kept byte-exact
pub const STYLE: &str = "{\"version\": 8, \"name\": \"fixture\",\n  \"sources\": {}, \"layers\": []}\n";

/// Gzip a string
pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .expect("Failed to write gzip data");
    encoder.finish().expect("Failed to finish gzip stream")
}

/// Catalog with one single-depth and one multi-depth layer
pub fn catalog() -> serde_json::Value {
    json!([
        {"id": "traffic_density", "name": "Traffic density", "domain": [0, 10], "depths": [0]},
        {"id": "temperature", "name": "Temperature", "domain": [-2, 30], "depths": [0, 10]}
    ])
}

/// Write the full fixture tree under `root`.
///
/// | key | encoding | records |
/// |---|---|---|
/// | 202307-0-traffic_density | gzip | 3 (+1 null) |
/// | 202306-0-traffic_density | plain | 2 |
/// | 202307-0-temperature | gzip | 2 |
/// | 202307-10-temperature | plain | 1 |
pub fn create_fixture_tree(root: &Path) -> Result<(), Box<dyn Error>> {
    let data = root.join("data");
    fs::create_dir_all(&data)?;

    fs::write(root.join("layers.json"), serde_json::to_vec_pretty(&catalog())?)?;
    fs::write(root.join("style.json"), STYLE)?;

    let traffic_july = json!([
        {"h3": CELLS[0], "traffic_density": 0},
        {"h3": CELLS[1], "traffic_density": 5},
        {"h3": CELLS[2], "traffic_density": 10},
        {"h3": CELLS[3], "traffic_density": null}
    ]);
    fs::write(
        data.join("202307-0-traffic_density.json.gz"),
        gzip(&traffic_july.to_string()),
    )?;

    let traffic_june = json!([
        {"h3": CELLS[0], "traffic_density": 2},
        {"h3": CELLS[1], "traffic_density": 4}
    ]);
    fs::write(
        data.join("202306-0-traffic_density.json"),
        traffic_june.to_string(),
    )?;

    let temperature_surface = json!([
        {"h3": CELLS[0], "temperature": -2.0},
        {"h3": CELLS[1], "temperature": 30.0}
    ]);
    fs::write(
        data.join("202307-0-temperature.json.gz"),
        gzip(&temperature_surface.to_string()),
    )?;

    let temperature_deep = json!([{"h3": CELLS[2], "temperature": 14.0}]);
    fs::write(
        data.join("202307-10-temperature.json"),
        temperature_deep.to_string(),
    )?;

    Ok(())
}

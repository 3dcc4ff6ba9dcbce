//! Print a summary of one dataset file: how it decodes, how many records
//! it holds and which H3 resolutions appear.

use anyhow::{bail, Context};
use clap::Parser;
use h3o::CellIndex;
use std::collections::BTreeMap;
use std::path::PathBuf;

use hexlayer::fetcher::{parse_records, DecodeStrategy};
use hexlayer::source::Payload;

#[derive(Parser, Debug)]
#[command(about = "Inspect a hexlayer dataset file")]
struct Args {
    /// Dataset file (`{month}-{depth}-{layer}.json` or `.json.gz`)
    file: PathBuf,

    /// Record property holding the value; defaults to the layer id in the file name
    #[arg(short, long)]
    field: Option<String>,
}

/// `202307-0-traffic_density.json.gz` -> `traffic_density`
fn layer_from_file_name(name: &str) -> Option<&str> {
    let stem = name.strip_suffix(".gz").unwrap_or(name);
    let stem = stem.strip_suffix(".json")?;
    let mut parts = stem.splitn(3, '-');
    let _month = parts.next()?;
    let _depth = parts.next()?;
    parts.next().filter(|layer| !layer.is_empty())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let field = match &args.field {
        Some(field) => field.clone(),
        None => {
            let name = args
                .file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            match layer_from_file_name(name) {
                Some(layer) => layer.to_string(),
                None => bail!("cannot infer the value field from '{}', pass --field", name),
            }
        }
    };

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let payload = Payload::new(bytes, None);

    let strategy = DecodeStrategy::select(&payload.bytes, None);
    let text = strategy
        .decode(&payload.bytes)
        .context("failed to decode dataset")?;
    let parsed = parse_records(&text, &field).context("failed to parse records")?;

    println!("File:      {}", args.file.display());
    println!("Size:      {} bytes", payload.bytes.len());
    println!("Decoding:  {:?}", strategy);
    println!("Field:     {}", field);
    println!("Records:   {}", parsed.records.len());
    println!("Skipped:   {}", parsed.skipped);

    let (min, max) = parsed
        .records
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
            (lo.min(r.value), hi.max(r.value))
        });
    if min <= max {
        println!("Range:     {} .. {}", min, max);
    }

    let mut resolutions: BTreeMap<u8, usize> = BTreeMap::new();
    let mut invalid = 0;
    for record in &parsed.records {
        match record.h3.parse::<CellIndex>() {
            Ok(cell) => *resolutions.entry(u8::from(cell.resolution())).or_default() += 1,
            Err(_) => invalid += 1,
        }
    }

    println!("\nResolutions:");
    for (resolution, count) in &resolutions {
        println!("  res {:>2}: {}", resolution, count);
    }
    if invalid > 0 {
        println!("  invalid: {}", invalid);
    }

    Ok(())
}

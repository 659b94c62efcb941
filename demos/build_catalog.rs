// Build a catalog of the configured data directory and read one channel
//
//   cargo run --example build_catalog -- [data_dir] [channel]

use anyhow::Context;
use roar::{cached_config, load_channel, Catalog, ChannelMapping};
use std::path::PathBuf;
use tracing::{info, warn, Level};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let config = cached_config();
    let mut args = std::env::args().skip(1);
    let data_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.data_dir.clone());
    let channel = args.next().unwrap_or_else(|| "NAWSSound".to_string());

    let (catalog, skipped) = Catalog::build_skipping_malformed(&data_dir, &config.scan_options())
        .with_context(|| format!("scanning {}", data_dir.display()))?;
    for err in &skipped {
        warn!("{}", err);
    }

    info!("Vehicles: {:?}", catalog.vehicles());
    for record in catalog.sorted_by_date().iter().take(10) {
        info!(
            "  {} track {} tyre {} {} {}",
            record.vehicle, record.track_id, record.tyre_id, record.measure, record.date
        );
    }

    catalog
        .write_csv(std::io::stdout().lock())
        .context("writing catalog")?;

    let Some(first) = catalog.records().first() else {
        info!("No measurement files under {}", data_dir.display());
        return Ok(());
    };

    let mapping = ChannelMapping::from_csv_path(&config.mapping_file)
        .with_context(|| format!("loading {}", config.mapping_file.display()))?;
    match load_channel(&first.file_path, Some(&mapping), &channel)? {
        Some(extracted) => info!(
            "{}: '{}' has {} samples at {:?} Hz",
            first.file_stem,
            channel,
            extracted.data.len(),
            extracted.sample_rate
        ),
        None => info!("{}: no channel '{}'", first.file_stem, channel),
    }

    Ok(())
}

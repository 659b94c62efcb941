// ROAR dataset tooling
// Catalog, channel-name normalization and channel extraction for
// tyre/road noise measurement files

pub mod catalog;
pub mod channels;
pub mod core;
pub mod lookup;
pub mod models;
pub mod utils;

// Re-export main types
pub use crate::catalog::{parse_stem, Catalog, FileRecord, Measure, MeasureKind, ScanOptions};
pub use crate::channels::{
    load_channel, normalize_channels, with_fixed_channels, ChannelMapping, ExtractedChannel,
    NormalizationReport, RenameOutcome, RenameStatus,
};
pub use crate::core::constants::{CompressionType, DataType};
pub use crate::core::container::{MeasurementFile, OpenMode};
pub use crate::core::error::{Result, RoarError};
pub use crate::core::format::{AttrValue, Attributes, ChannelData, Dataset};
pub use crate::models::DatasetConfig;
pub use crate::utils::conf_helper::{cached_config, init_config};

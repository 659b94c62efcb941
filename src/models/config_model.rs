use crate::catalog::ScanOptions;
use crate::core::constants::{CompressionType, MEASUREMENT_EXTENSION};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_MAPPING_FILE: &str = "extras/all_measurement_channels_name.csv";

/// Dataset settings, read from `roar.json`. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Root of the measurement file tree.
    pub data_dir: PathBuf,
    /// Channel reference table (`channel_name,synonym_1,synonym_2`).
    pub mapping_file: PathBuf,
    pub extension: String,
    /// Compression for newly written channel blocks.
    pub compression: CompressionType,
    pub allow_missing_root: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            mapping_file: PathBuf::from(DEFAULT_MAPPING_FILE),
            extension: MEASUREMENT_EXTENSION.to_string(),
            compression: CompressionType::default(),
            allow_missing_root: false,
        }
    }
}

impl DatasetConfig {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            extension: self.extension.clone(),
            allow_missing_root: self.allow_missing_root,
        }
    }
}

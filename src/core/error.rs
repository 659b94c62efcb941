// Error handling for the dataset layer

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RoarError>;

#[derive(Error, Debug)]
pub enum RoarError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Filename stem '{stem}' does not match expected pattern: {reason}")]
    MalformedName { stem: String, reason: String },

    #[error("Synonym '{synonym}' already maps to '{existing}', cannot map it to '{incoming}'")]
    MappingConflict {
        synonym: String,
        existing: String,
        incoming: String,
    },

    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Invalid magic bytes: expected {expected:?}, got {got:?}")]
    InvalidMagic { expected: Vec<u8>, got: Vec<u8> },

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("Unsupported compression type: {0}")]
    UnsupportedCompression(u8),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(u8),

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Channel already exists: {0}")]
    ChannelExists(String),

    #[error("File opened read-only: {}", .0.display())]
    ReadOnly(PathBuf),

    #[error("Invalid UTF-8 string")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

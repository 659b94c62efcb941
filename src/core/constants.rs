// Format constants for measurement container files

pub const MAGIC: &[u8; 4] = b"MCF1";
pub const CHUNK_MAGIC: &[u8; 4] = b"CHNK";
pub const INDEX_MAGIC: &[u8; 4] = b"IDXT";
pub const FOOTER_MAGIC: &[u8; 4] = b"FTER";

pub const FORMAT_VERSION: u8 = 1;

/// Default extension of measurement container files (without the dot).
pub const MEASUREMENT_EXTENSION: &str = "mcf";

/// Attribute holding the sampling rate of a channel, in Hz.
pub const SAMPLE_RATE_ATTR: &str = "sample_rate";

/// Separator between group and channel names inside a container.
pub const PATH_SEPARATOR: char = '/';

// Compression codes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    None = 0,
    #[default]
    Zlib = 1,
    Lz4 = 2,
    Zstd = 3,
}

impl CompressionType {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Zlib),
            2 => Some(CompressionType::Lz4),
            3 => Some(CompressionType::Zstd),
            _ => None,
        }
    }
}

// Element type codes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    I16 = 0,
    I32 = 1,
    F32 = 2,
    F64 = 3,
}

impl DataType {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(DataType::I16),
            1 => Some(DataType::I32),
            2 => Some(DataType::F32),
            3 => Some(DataType::F64),
            _ => None,
        }
    }

    pub fn size(self) -> usize {
        match self {
            DataType::I16 => 2,
            DataType::I32 | DataType::F32 => 4,
            DataType::F64 => 8,
        }
    }
}

// Attribute value tags
pub const ATTR_INT: u8 = 0;
pub const ATTR_FLOAT: u8 = 1;
pub const ATTR_TEXT: u8 = 2;
pub const ATTR_INT_ARRAY: u8 = 3;
pub const ATTR_FLOAT_ARRAY: u8 = 4;

// File header: MAGIC(4) version(u8) comp(u8) created(f64)
pub const HEADER_SIZE: usize = 4 + 1 + 1 + 8; // 14 bytes

// Footer: FOOTER_MAGIC(4) index_offset(u64)
pub const FOOTER_SIZE: usize = 4 + 8; // 12 bytes

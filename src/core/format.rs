// Data structures for measurement container files

use crate::core::constants::DataType;
use crate::core::error::{Result, RoarError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute value attached to a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(v: Vec<f64>) -> Self {
        AttrValue::FloatArray(v)
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(v: Vec<i64>) -> Self {
        AttrValue::IntArray(v)
    }
}

pub type Attributes = BTreeMap<String, AttrValue>;

/// Typed element storage of a channel payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData {
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl ChannelData {
    pub fn dtype(&self) -> DataType {
        match self {
            ChannelData::I16(_) => DataType::I16,
            ChannelData::I32(_) => DataType::I32,
            ChannelData::F32(_) => DataType::F32,
            ChannelData::F64(_) => DataType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChannelData::I16(v) => v.len(),
            ChannelData::I32(v) => v.len(),
            ChannelData::F32(v) => v.len(),
            ChannelData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widen every element to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            ChannelData::I16(v) => v.iter().map(|&x| x as f64).collect(),
            ChannelData::I32(v) => v.iter().map(|&x| x as f64).collect(),
            ChannelData::F32(v) => v.iter().map(|&x| x as f64).collect(),
            ChannelData::F64(v) => v.clone(),
        }
    }

    pub(crate) fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * self.dtype().size());
        match self {
            ChannelData::I16(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            ChannelData::I32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            ChannelData::F32(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            ChannelData::F64(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
        }
        out
    }

    pub(crate) fn from_le_bytes(dtype: DataType, raw: &[u8]) -> Result<Self> {
        let size = dtype.size();
        if raw.len() % size != 0 {
            return Err(RoarError::CorruptedData(format!(
                "payload of {} bytes is not a multiple of element size {}",
                raw.len(),
                size
            )));
        }

        let data = match dtype {
            DataType::I16 => ChannelData::I16(
                raw.chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
            DataType::I32 => ChannelData::I32(
                raw.chunks_exact(4)
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            DataType::F32 => ChannelData::F32(
                raw.chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            DataType::F64 => ChannelData::F64(
                raw.chunks_exact(8)
                    .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
        };
        Ok(data)
    }
}

/// Product of the dimensions, `None` on overflow.
pub(crate) fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

/// An n-dimensional numeric array stored under one channel name.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    shape: Vec<usize>,
    data: ChannelData,
}

impl Dataset {
    /// Build a dataset, checking that `shape` covers exactly the given elements.
    pub fn new(shape: Vec<usize>, data: ChannelData) -> Result<Self> {
        let expected = element_count(&shape).ok_or_else(|| {
            RoarError::CorruptedData(format!("shape {:?} overflows the element count", shape))
        })?;
        if expected != data.len() {
            return Err(RoarError::CorruptedData(format!(
                "shape {:?} holds {} elements, payload has {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional dataset over all elements of `data`.
    pub fn vector(data: ChannelData) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn data(&self) -> &ChannelData {
        &self.data
    }

    pub fn into_data(self) -> ChannelData {
        self.data
    }

    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Collapse a two-dimensional `(1, N)` or `(N, 1)` array into shape `(N,)`.
    /// Any other shape is returned unchanged.
    pub fn squeeze_single_axis(self) -> Self {
        let flat = match self.shape.as_slice() {
            [1, n] | [n, 1] => Some(*n),
            _ => None,
        };
        match flat {
            Some(n) => Self {
                shape: vec![n],
                data: self.data,
            },
            None => self,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileHeader {
    pub version: u8,
    pub compression: u8,
    pub created: f64,
}

/// Where a channel's payload lives.
#[derive(Debug, Clone)]
pub(crate) enum PayloadSource {
    /// Compressed block already on disk, `raw_len`/`comp_len` as stored.
    OnDisk {
        offset: u64,
        raw_len: u64,
        comp_len: u64,
    },
    /// Staged in memory, not yet written.
    Staged(ChannelData),
}

/// Descriptor of one channel inside a container.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub path: String,
    pub dtype: DataType,
    pub shape: Vec<usize>,
    pub attrs: Attributes,
    pub(crate) payload: PayloadSource,
}

impl ChannelInfo {
    /// Number of elements described by the shape.
    pub fn len(&self) -> usize {
        element_count(&self.shape).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

use crate::channels::mapping::ChannelMapping;
use crate::channels::normalize::with_fixed_channels;
use crate::core::constants::SAMPLE_RATE_ATTR;
use crate::core::container::OpenMode;
use crate::core::error::{Result, RoarError};
use crate::core::format::{AttrValue, Dataset};
use std::path::Path;

/// A channel read out of a measurement file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedChannel {
    /// Samples; `(1, N)` and `(N, 1)` arrays are flattened to `(N,)`.
    pub data: Dataset,
    /// Sampling rate in Hz, when the channel carries one.
    pub sample_rate: Option<f64>,
}

impl ExtractedChannel {
    pub fn samples_f64(&self) -> Vec<f64> {
        self.data.data().to_f64_vec()
    }

    /// Duration covered by the samples, if the rate is known and positive.
    pub fn duration_secs(&self) -> Option<f64> {
        match self.sample_rate {
            Some(rate) if rate > 0.0 => Some(self.data.len() as f64 / rate),
            _ => None,
        }
    }
}

/// Load one channel by its canonical name.
///
/// The file is opened read-write so legacy names get fixed first. Returns
/// `Ok(None)` when the channel is not in the file. A `sample_rate` that is
/// text or holds more than one number is rejected with `CorruptedData`
/// rather than passed through.
pub fn load_channel<P: AsRef<Path>>(
    path: P,
    mapping: Option<&ChannelMapping>,
    channel_name: &str,
) -> Result<Option<ExtractedChannel>> {
    with_fixed_channels(path, mapping, OpenMode::ReadWrite, |file| {
        if !file.contains(channel_name) {
            return Ok(None);
        }

        let data = file.read(channel_name)?.squeeze_single_axis();
        let sample_rate = match file.attrs(channel_name).and_then(|a| a.get(SAMPLE_RATE_ATTR)) {
            Some(value) => Some(scalar_sample_rate(channel_name, value)?),
            None => None,
        };

        Ok(Some(ExtractedChannel { data, sample_rate }))
    })
}

/// Unwrap a scalar or single-element numeric attribute.
fn scalar_sample_rate(channel: &str, value: &AttrValue) -> Result<f64> {
    match value {
        AttrValue::Int(v) => Ok(*v as f64),
        AttrValue::Float(v) => Ok(*v),
        AttrValue::IntArray(values) if values.len() == 1 => Ok(values[0] as f64),
        AttrValue::FloatArray(values) if values.len() == 1 => Ok(values[0]),
        AttrValue::IntArray(values) => Err(invalid_rate(channel, values.len())),
        AttrValue::FloatArray(values) => Err(invalid_rate(channel, values.len())),
        AttrValue::Text(text) => Err(RoarError::CorruptedData(format!(
            "{} of '{}' is text ('{}')",
            SAMPLE_RATE_ATTR, channel, text
        ))),
    }
}

fn invalid_rate(channel: &str, len: usize) -> RoarError {
    RoarError::CorruptedData(format!(
        "{} of '{}' holds {} values, expected one",
        SAMPLE_RATE_ATTR, channel, len
    ))
}

// Rename legacy channel names inside a container, and scoped file access

use crate::channels::mapping::ChannelMapping;
use crate::core::container::{MeasurementFile, OpenMode};
use crate::core::error::{Result, RoarError};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameStatus {
    Renamed,
    /// The rename was not applied, e.g. the canonical name already exists.
    Skipped { reason: String },
}

/// What happened to one legacy-named channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub from: String,
    pub to: String,
    pub status: RenameStatus,
}

impl RenameOutcome {
    pub fn is_renamed(&self) -> bool {
        self.status == RenameStatus::Renamed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    pub outcomes: Vec<RenameOutcome>,
}

impl NormalizationReport {
    pub fn renamed(&self) -> impl Iterator<Item = &RenameOutcome> {
        self.outcomes.iter().filter(|o| o.is_renamed())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &RenameOutcome> {
        self.outcomes.iter().filter(|o| !o.is_renamed())
    }

    /// True when no channel carried a legacy name.
    pub fn is_noop(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Rename every top-level channel whose name is a legacy key of `mapping`.
///
/// A failing rename is recorded as skipped and does not stop the others.
pub fn normalize_channels(
    file: &mut MeasurementFile,
    mapping: &ChannelMapping,
) -> Result<NormalizationReport> {
    if !file.is_writable() {
        return Err(RoarError::ReadOnly(file.path().to_path_buf()));
    }

    let keys_to_rename: Vec<String> = file
        .keys()
        .into_iter()
        .filter(|key| mapping.contains(key))
        .map(str::to_string)
        .collect();

    let mut report = NormalizationReport::default();
    for old_name in keys_to_rename {
        let Some(new_name) = mapping.get(&old_name) else {
            continue;
        };

        let status = match file.rename(&old_name, new_name) {
            Ok(()) => {
                info!(
                    "Renamed channel '{}' to '{}' in {}",
                    old_name,
                    new_name,
                    file.path().display()
                );
                RenameStatus::Renamed
            }
            Err(e) => {
                warn!(
                    "Channel '{}' could not be renamed to '{}' in {}: {}",
                    old_name,
                    new_name,
                    file.path().display(),
                    e
                );
                RenameStatus::Skipped {
                    reason: e.to_string(),
                }
            }
        };

        report.outcomes.push(RenameOutcome {
            from: old_name,
            to: new_name.to_string(),
            status,
        });
    }
    Ok(report)
}

/// Open `path` read-write and normalize its channel names.
pub fn open_fixed<P: AsRef<Path>>(
    path: P,
    mapping: &ChannelMapping,
) -> Result<(MeasurementFile, NormalizationReport)> {
    let mut file = MeasurementFile::open(path, OpenMode::ReadWrite)?;
    let report = normalize_channels(&mut file, mapping)?;
    Ok((file, report))
}

/// Open `path` in `mode`, fix channel names when the mode allows writing,
/// hand the file to `f`, then close it whatever `f` returns.
///
/// With `mapping = None` the configured reference table is used. An error
/// from `f` takes precedence over an error while closing.
pub fn with_fixed_channels<P, F, T>(
    path: P,
    mapping: Option<&ChannelMapping>,
    mode: OpenMode,
    f: F,
) -> Result<T>
where
    P: AsRef<Path>,
    F: FnOnce(&mut MeasurementFile) -> Result<T>,
{
    let mut file = MeasurementFile::open(path, mode)?;

    if mode.is_writable() {
        let default_mapping;
        let mapping = match mapping {
            Some(mapping) => mapping,
            None => {
                default_mapping = ChannelMapping::load_default()?;
                &default_mapping
            }
        };
        let report = normalize_channels(&mut file, mapping)?;
        debug!(
            "{}: {} renamed, {} skipped",
            file.path().display(),
            report.renamed().count(),
            report.skipped().count()
        );
    }

    let result = f(&mut file);
    let path = file.path().to_path_buf();
    let closed = file.close();

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!("Failed to close {}: {}", path.display(), close_err);
            Err(e)
        }
    }
}

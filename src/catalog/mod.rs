// Catalog of measurement files under a data directory

pub mod grammar;
pub mod record;

pub use grammar::{parse_stem, Measure, MeasureKind};
pub use record::FileRecord;

use crate::core::constants::MEASUREMENT_EXTENSION;
use crate::core::error::{Result, RoarError};
use crate::models::config_model::DatasetConfig;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// How the data directory is scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Extension of measurement files, without the dot. Matched case-sensitively.
    pub extension: String,
    /// Treat a missing root as an empty dataset instead of an error.
    pub allow_missing_root: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extension: MEASUREMENT_EXTENSION.to_string(),
            allow_missing_root: false,
        }
    }
}

/// All measurement files found under `root`, in walk order.
pub fn discover_files(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        if options.allow_missing_root {
            warn!("Data directory {} not found, catalog is empty", root.display());
            return Ok(Vec::new());
        }
        return Err(RoarError::DirectoryNotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == options.extension);
        if matches {
            debug!("Found measurement file {}", entry.path().display());
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Index over the measurement files of one directory tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: Vec<FileRecord>,
}

impl Catalog {
    pub fn from_records(records: Vec<FileRecord>) -> Self {
        Self { records }
    }

    /// Scan `root` and parse every file name. The first name that does not
    /// follow the grammar aborts the build.
    pub fn build<P: AsRef<Path>>(root: P, options: &ScanOptions) -> Result<Self> {
        let root = std::path::absolute(root.as_ref())?;
        let files = discover_files(&root, options)?;

        let records = files
            .iter()
            .map(FileRecord::from_path)
            .collect::<Result<Vec<_>>>()?;

        info!("Catalog of {} built with {} files", root.display(), records.len());
        Ok(Self { records })
    }

    /// Catalog of the configured data directory.
    pub fn from_config(config: &DatasetConfig) -> Result<Self> {
        Self::build(&config.data_dir, &config.scan_options())
    }

    /// Like [`Catalog::build`], but a malformed name only drops that file.
    /// The parse errors are returned next to the catalog.
    pub fn build_skipping_malformed<P: AsRef<Path>>(
        root: P,
        options: &ScanOptions,
    ) -> Result<(Self, Vec<RoarError>)> {
        let root = std::path::absolute(root.as_ref())?;
        let files = discover_files(&root, options)?;

        let mut records = Vec::with_capacity(files.len());
        let mut skipped = Vec::new();
        for path in &files {
            match FileRecord::from_path(path) {
                Ok(record) => records.push(record),
                Err(e @ RoarError::MalformedName { .. }) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    skipped.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Catalog of {} built with {} files, {} skipped",
            root.display(),
            records.len(),
            skipped.len()
        );
        Ok((Self { records }, skipped))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    /// New catalog with the records for which `predicate` holds.
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&FileRecord) -> bool,
    {
        Self {
            records: self.records.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }

    /// Records whose vehicle matches `vehicle`, raw token or alias-resolved.
    pub fn by_vehicle(&self, vehicle: &str) -> Self {
        self.filter(|r| r.vehicle == vehicle || r.canonical_vehicle() == Some(vehicle))
    }

    pub fn by_track(&self, track_id: u32) -> Self {
        self.filter(|r| r.track_id == track_id)
    }

    pub fn by_tyre(&self, tyre_id: u32) -> Self {
        self.filter(|r| r.tyre_id == tyre_id)
    }

    /// Copy sorted by recording date, oldest first; ties keep walk order.
    pub fn sorted_by_date(&self) -> Self {
        let mut records = self.records.clone();
        records.sort_by_key(|r| r.date);
        Self { records }
    }

    /// Distinct raw vehicle tokens, sorted.
    pub fn vehicles(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|r| r.vehicle.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Write the catalog as CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        for record in &self.records {
            out.serialize(record)?;
        }
        out.flush()?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl IntoIterator for Catalog {
    type Item = FileRecord;
    type IntoIter = std::vec::IntoIter<FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

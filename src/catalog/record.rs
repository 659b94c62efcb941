use crate::catalog::grammar::{parse_stem, Measure};
use crate::core::error::{Result, RoarError};
use crate::lookup;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One catalog row: a measurement file and the fields its name carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_path: PathBuf,
    pub file_stem: String,
    /// Vehicle token as written in the filename.
    pub vehicle: String,
    pub tyre_id: u32,
    pub track_id: u32,
    /// `meas5` or `vr50_b50`, suffix included.
    pub measure: String,
    pub date: NaiveDateTime,
}

impl FileRecord {
    /// Build a record from a file path. Only the name is inspected; the file
    /// itself is not opened. Relative paths are made absolute against the
    /// current directory.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .ok_or_else(|| RoarError::MalformedName {
                stem: path.display().to_string(),
                reason: "path has no file name".into(),
            })?
            .to_str()
            .ok_or_else(|| RoarError::MalformedName {
                stem: path.display().to_string(),
                reason: "file name is not valid UTF-8".into(),
            })?;

        let fields = parse_stem(stem)?;

        Ok(Self {
            file_path: std::path::absolute(path)?,
            file_stem: stem.to_string(),
            vehicle: fields.vehicle,
            tyre_id: fields.tyre_id,
            track_id: fields.track_id,
            measure: fields.measure,
            date: fields.date,
        })
    }

    /// Structured form of [`FileRecord::measure`].
    pub fn measure_kind(&self) -> Option<Measure> {
        Measure::parse(&self.measure)
    }

    /// Vehicle resolved through the alias table, if it is known.
    pub fn canonical_vehicle(&self) -> Option<&'static str> {
        lookup::clean_vehicle_name(&self.vehicle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::grammar::MeasureKind;

    #[test]
    fn test_record_from_path() {
        let record =
            FileRecord::from_path("/data/run1/track211_ID.4_tyre3_2pt6_vr50_b50_2025-07-11_10-41-07.mcf")
                .unwrap();
        assert_eq!(
            record.file_path,
            PathBuf::from("/data/run1/track211_ID.4_tyre3_2pt6_vr50_b50_2025-07-11_10-41-07.mcf")
        );
        // only the last extension is stripped, dots in the vehicle survive
        assert_eq!(record.file_stem, "track211_ID.4_tyre3_2pt6_vr50_b50_2025-07-11_10-41-07");
        assert_eq!(record.vehicle, "ID.4");
        assert_eq!(record.measure, "vr50_b50");

        let measure = record.measure_kind().unwrap();
        assert_eq!(measure.kind, MeasureKind::Vr);
        assert_eq!(measure.number, 50);
        assert_eq!(measure.b, Some(50));
    }

    #[test]
    fn test_relative_path_becomes_absolute() {
        let record = FileRecord::from_path("track1_Q8_tyre6_meas3_2025-09-29_17-28-02.mcf").unwrap();
        assert!(record.file_path.is_absolute());
    }

    #[test]
    fn test_canonical_vehicle() {
        let record =
            FileRecord::from_path("/d/track150_Q8 e-tron_tyre6_meas3_2p5_1_2025-09-29_17-28-02.mcf")
                .unwrap();
        assert_eq!(record.canonical_vehicle(), Some("Q8"));

        let record = FileRecord::from_path("/d/track150_Unknown_tyre6_meas3_2025-09-29_17-28-02.mcf")
            .unwrap();
        assert_eq!(record.canonical_vehicle(), None);
    }

    #[test]
    fn test_malformed_file_name() {
        let err = FileRecord::from_path("/d/random_file.mcf").unwrap_err();
        match err {
            RoarError::MalformedName { stem, .. } => assert_eq!(stem, "random_file"),
            other => panic!("unexpected error {:?}", other),
        }
    }
}

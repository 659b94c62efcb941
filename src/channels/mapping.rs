// Legacy channel name -> canonical channel name

use crate::core::error::{Result, RoarError};
use crate::utils::conf_helper::cached_config;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// One row of the channel reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelNameRow {
    pub channel_name: String,
    #[serde(default)]
    pub synonym_1: Option<String>,
    #[serde(default)]
    pub synonym_2: Option<String>,
}

impl ChannelNameRow {
    fn synonyms(&self) -> [Option<&str>; 2] {
        [self.synonym_1.as_deref(), self.synonym_2.as_deref()]
    }
}

/// Maps every known legacy name of a channel to its canonical name.
///
/// Construction is strict: a synonym can be registered only once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMapping {
    map: BTreeMap<String, String>,
}

impl ChannelMapping {
    /// Build from reference rows. All `synonym_1` entries are registered
    /// before any `synonym_2` entry.
    pub fn from_rows(rows: &[ChannelNameRow]) -> Result<Self> {
        let mut mapping = Self::default();
        for column in 0..2 {
            for row in rows {
                if let Some(synonym) = row.synonyms()[column].filter(|s| !s.is_empty()) {
                    mapping.register(synonym, &row.channel_name)?;
                }
            }
        }
        Ok(mapping)
    }

    /// Build from literal `(legacy, canonical)` pairs, with the same
    /// uniqueness check as the table form.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut mapping = Self::default();
        for (legacy, canonical) in pairs {
            mapping.register(legacy.as_ref(), canonical.as_ref())?;
        }
        Ok(mapping)
    }

    /// Read a delimited reference table with columns
    /// `channel_name, synonym_1, synonym_2`. Empty cells and a missing
    /// `synonym_2` column count as no synonym.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let rows = rdr
            .deserialize::<ChannelNameRow>()
            .collect::<std::result::Result<Vec<_>, csv::Error>>()?;
        Self::from_rows(&rows)
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mapping = Self::from_csv_reader(file)?;
        debug!("Loaded {} channel synonyms from {}", mapping.len(), path.display());
        Ok(mapping)
    }

    /// Mapping from the reference table named in the configuration.
    pub fn load_default() -> Result<Self> {
        Self::from_csv_path(&cached_config().mapping_file)
    }

    fn register(&mut self, synonym: &str, canonical: &str) -> Result<()> {
        if let Some(existing) = self.map.get(synonym) {
            return Err(RoarError::MappingConflict {
                synonym: synonym.to_string(),
                existing: existing.clone(),
                incoming: canonical.to_string(),
            });
        }
        self.map.insert(synonym.to_string(), canonical.to_string());
        Ok(())
    }

    /// Canonical name for a legacy name.
    pub fn get(&self, legacy: &str) -> Option<&str> {
        self.map.get(legacy).map(String::as_str)
    }

    pub fn contains(&self, legacy: &str) -> bool {
        self.map.contains_key(legacy)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// Filename grammar, tokens split on `_`:
// track<d+>_<vehicle>_tyre<d+>[_free]*_<meas<d+>|vr<d+>>[_b<d+>][_free]*_YYYY-MM-DD_HH-MM-SS
// The leftmost measure-shaped token after the tyre token is the measure.

use crate::core::error::{Result, RoarError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format of the trailing timestamp, `2025-07-11_10-24-28`.
pub const DATE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

const TOKEN_SEPARATOR: char = '_';

/// Which kind of run a measure token names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureKind {
    /// `measN`: numbered measurement run.
    Meas,
    /// `vrN`: constant-speed run.
    Vr,
}

/// Structured view of a measure token such as `meas5` or `vr50_b50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Measure {
    pub kind: MeasureKind,
    pub number: u32,
    pub b: Option<u32>,
}

impl Measure {
    /// Parse a full measure string (`meas3`, `vr45`, `vr50_b50`).
    pub fn parse(token: &str) -> Option<Self> {
        let (head, b) = match token.split_once(TOKEN_SEPARATOR) {
            Some((head, tail)) => (head, Some(numbered(tail, "b")?)),
            None => (token, None),
        };
        let (kind, number) = measure_head(head)?;
        Some(Self {
            kind,
            number: number.parse().ok()?,
            b: match b {
                Some(digits) => Some(digits.parse().ok()?),
                None => None,
            },
        })
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            MeasureKind::Meas => "meas",
            MeasureKind::Vr => "vr",
        };
        write!(f, "{}{}", prefix, self.number)?;
        if let Some(b) = self.b {
            write!(f, "_b{}", b)?;
        }
        Ok(())
    }
}

/// Fields carried by a stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemFields {
    pub track_id: u32,
    pub vehicle: String,
    pub tyre_id: u32,
    pub measure: String,
    pub date: NaiveDateTime,
}

/// Parse a filename stem (no directory, no extension).
pub fn parse_stem(stem: &str) -> Result<StemFields> {
    let malformed = |reason: String| RoarError::MalformedName {
        stem: stem.to_string(),
        reason,
    };

    let tokens: Vec<&str> = stem.split(TOKEN_SEPARATOR).collect();
    if tokens.iter().any(|t| t.is_empty()) {
        return Err(malformed("empty token between underscores".into()));
    }
    // track, vehicle, tyre, measure, date, time
    if tokens.len() < 6 {
        return Err(malformed(format!("expected at least 6 tokens, got {}", tokens.len())));
    }

    let track_id = numbered(tokens[0], "track")
        .ok_or_else(|| malformed(format!("first token '{}' is not track<digits>", tokens[0])))?;
    let track_id = parse_id(track_id).map_err(|_| malformed("track number out of range".into()))?;

    let vehicle = tokens[1];

    let tyre_id = numbered(tokens[2], "tyre")
        .ok_or_else(|| malformed(format!("third token '{}' is not tyre<digits>", tokens[2])))?;
    let tyre_id = parse_id(tyre_id).map_err(|_| malformed("tyre number out of range".into()))?;

    let n = tokens.len();
    let (day, time) = (tokens[n - 2], tokens[n - 1]);
    if !has_shape(day, "dddd-dd-dd") || !has_shape(time, "dd-dd-dd") {
        return Err(malformed(format!(
            "stem does not end in a YYYY-MM-DD_HH-MM-SS timestamp ('{}_{}')",
            day, time
        )));
    }

    let measure = find_measure(&tokens[3..n - 2])
        .ok_or_else(|| malformed("no meas<digits> or vr<digits> token after the tyre token".into()))?;

    let stamp = format!("{}_{}", day, time);
    let date = NaiveDateTime::parse_from_str(&stamp, DATE_FORMAT)
        .map_err(|e| malformed(format!("invalid timestamp '{}': {}", stamp, e)))?;

    Ok(StemFields {
        track_id,
        vehicle: vehicle.to_string(),
        tyre_id,
        measure,
        date,
    })
}

/// Leftmost measure token among the free middle tokens, with an attached
/// `b<digits>` token when one follows directly.
fn find_measure(middle: &[&str]) -> Option<String> {
    let idx = middle.iter().position(|t| measure_head(t).is_some())?;
    let measure = match middle.get(idx + 1) {
        Some(next) if numbered(next, "b").is_some() => {
            format!("{}{}{}", middle[idx], TOKEN_SEPARATOR, next)
        }
        _ => middle[idx].to_string(),
    };
    Some(measure)
}

fn measure_head(token: &str) -> Option<(MeasureKind, &str)> {
    if let Some(digits) = numbered(token, "meas") {
        return Some((MeasureKind::Meas, digits));
    }
    numbered(token, "vr").map(|digits| (MeasureKind::Vr, digits))
}

/// `prefix` followed by one or more ASCII digits; returns the digits.
fn numbered<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    let digits = token.strip_prefix(prefix)?;
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

fn parse_id(digits: &str) -> std::result::Result<u32, std::num::ParseIntError> {
    digits.parse::<u32>()
}

/// `pattern` uses `d` for an ASCII digit, anything else literally.
fn has_shape(token: &str, pattern: &str) -> bool {
    token.len() == pattern.len()
        && token.bytes().zip(pattern.bytes()).all(|(t, p)| match p {
            b'd' => t.is_ascii_digit(),
            other => t == other,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn assert_malformed(stem: &str) {
        match parse_stem(stem) {
            Err(RoarError::MalformedName { stem: reported, .. }) => assert_eq!(reported, stem),
            other => panic!("expected MalformedName for '{}', got {:?}", stem, other),
        }
    }

    #[test]
    fn test_vr_with_free_token() {
        let fields = parse_stem("track211_ID.4_tyre3_2pt6_vr45_2025-07-11_10-24-28").unwrap();
        assert_eq!(
            fields,
            StemFields {
                track_id: 211,
                vehicle: "ID.4".to_string(),
                tyre_id: 3,
                measure: "vr45".to_string(),
                date: at(2025, 7, 11, 10, 24, 28),
            }
        );
    }

    #[test]
    fn test_vr_with_b_suffix() {
        let fields = parse_stem("track211_ID.4_tyre3_2pt6_vr50_b50_2025-07-11_10-41-07").unwrap();
        assert_eq!(fields.measure, "vr50_b50");
        assert_eq!(fields.date, at(2025, 7, 11, 10, 41, 7));
    }

    #[test]
    fn test_meas_with_trailing_qualifiers() {
        let fields = parse_stem("track150_Q8 e-tron_tyre6_meas3_2p5_1_2025-09-29_17-28-02").unwrap();
        assert_eq!(fields.vehicle, "Q8 e-tron");
        assert_eq!(fields.track_id, 150);
        assert_eq!(fields.tyre_id, 6);
        assert_eq!(fields.measure, "meas3");
        assert_eq!(fields.date, at(2025, 9, 29, 17, 28, 2));
    }

    #[test]
    fn test_meas_directly_after_tyre() {
        let fields = parse_stem("track211_ID.4_tyre1_meas5_2p5_1_2025-08-07_10-48-15").unwrap();
        assert_eq!(fields.tyre_id, 1);
        assert_eq!(fields.measure, "meas5");
    }

    #[test]
    fn test_leftmost_measure_token_wins() {
        let fields = parse_stem("track1_eGolf_tyre2_meas1_vr30_2025-01-02_03-04-05").unwrap();
        assert_eq!(fields.measure, "meas1");

        let fields = parse_stem("track1_eGolf_tyre2_vr30_meas1_2025-01-02_03-04-05").unwrap();
        assert_eq!(fields.measure, "vr30");

        let fields = parse_stem("track1_eGolf_tyre2_x_vr30_b10_meas1_b2_2025-01-02_03-04-05").unwrap();
        assert_eq!(fields.measure, "vr30_b10");
    }

    #[test]
    fn test_b_token_attaches_to_meas_too() {
        let fields = parse_stem("track1_eGolf_tyre2_meas4_b7_2025-01-02_03-04-05").unwrap();
        assert_eq!(fields.measure, "meas4_b7");
    }

    #[test]
    fn test_lookalike_tokens_are_free() {
        // "vr45x" and "measure" are not measure tokens
        let fields = parse_stem("track1_Taycan_tyre4_vr45x_measure_meas9_2025-01-02_03-04-05").unwrap();
        assert_eq!(fields.measure, "meas9");
    }

    #[test]
    fn test_malformed_stems() {
        assert_malformed("random_file");
        assert_malformed("");
        // no measure token
        assert_malformed("track211_ID.4_tyre3_2pt6_2025-07-11_10-24-28");
        // missing tyre token
        assert_malformed("track211_ID.4_vr45_2025-07-11_10-24-28");
        // double underscore
        assert_malformed("track211__tyre3_vr45_2025-07-11_10-24-28");
        assert_malformed("track211_ID.4_tyre3__vr45_2025-07-11_10-24-28");
        // no digits after prefix
        assert_malformed("track_ID.4_tyre3_vr45_2025-07-11_10-24-28");
        // timestamp has wrong shape
        assert_malformed("track211_ID.4_tyre3_vr45_2025-7-11_10-24-28");
        // measure must come before the timestamp
        assert_malformed("track211_ID.4_tyre3_2025-07-11_10-24-28_vr45");
        // trailing junk after the timestamp
        assert_malformed("track211_ID.4_tyre3_vr45_2025-07-11_10-24-28_x");
    }

    #[test]
    fn test_impossible_date_is_malformed() {
        assert_malformed("track211_ID.4_tyre3_vr45_2025-13-11_10-24-28");
        assert_malformed("track211_ID.4_tyre3_vr45_2025-02-30_10-24-28");
    }

    #[test]
    fn test_track_number_overflow_is_malformed() {
        assert_malformed("track99999999999_ID.4_tyre3_vr45_2025-07-11_10-24-28");
    }

    #[test]
    fn test_measure_structure() {
        assert_eq!(
            Measure::parse("vr50_b50"),
            Some(Measure {
                kind: MeasureKind::Vr,
                number: 50,
                b: Some(50)
            })
        );
        assert_eq!(
            Measure::parse("meas3"),
            Some(Measure {
                kind: MeasureKind::Meas,
                number: 3,
                b: None
            })
        );
        assert_eq!(Measure::parse("vr"), None);
        assert_eq!(Measure::parse("vr5_c1"), None);
        assert_eq!(Measure::parse("vr50_b50").unwrap().to_string(), "vr50_b50");
    }
}

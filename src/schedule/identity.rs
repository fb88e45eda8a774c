//! Occurrence identity encoding.
//!
//! Virtual occurrences of a recurring series carry composite string ids of
//! the form `"{series_id}-{ISO date}"`, e.g. `"42-2025-01-06"`. The `-`
//! separator is reserved: series ids are always rendered as bare integers
//! before composition, so splitting on the first `-` recovers the real
//! series id. Plain integer ids (non-recurring visits) parse with no date
//! token.

use chrono::NaiveDate;

use crate::error::{AgendaError, Result};

/// A parsed occurrence identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedOccurrenceId {
    /// The persisted series root id.
    pub series_id: i64,
    /// The occurrence's calendar date; `None` for bare series ids.
    pub date: Option<NaiveDate>,
}

/// Compose the stable id for a recurring occurrence.
pub fn occurrence_id(series_id: i64, date: NaiveDate) -> String {
    format!("{}-{}", series_id, date.format("%Y-%m-%d"))
}

/// Parse an occurrence id back into its series id and optional date.
///
/// Accepts either a bare integer (`"42"`) or a composite id
/// (`"42-2025-01-06"`). Anything else fails with
/// [`AgendaError::InvalidOccurrenceId`].
pub fn parse_occurrence_id(id: &str) -> Result<ParsedOccurrenceId> {
    let invalid = || AgendaError::InvalidOccurrenceId(id.to_string());

    match id.split_once('-') {
        None => {
            let series_id = id.parse::<i64>().map_err(|_| invalid())?;
            Ok(ParsedOccurrenceId {
                series_id,
                date: None,
            })
        }
        Some((series, token)) => {
            let series_id = series.parse::<i64>().map_err(|_| invalid())?;
            let date =
                NaiveDate::parse_from_str(token, "%Y-%m-%d").map_err(|_| invalid())?;
            Ok(ParsedOccurrenceId {
                series_id,
                date: Some(date),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_compose() {
        assert_eq!(occurrence_id(42, date(2025, 1, 6)), "42-2025-01-06");
        assert_eq!(occurrence_id(7, date(2024, 12, 31)), "7-2024-12-31");
    }

    #[test]
    fn test_round_trip() {
        for (series_id, d) in [
            (1, date(2025, 1, 1)),
            (42, date(2025, 1, 6)),
            (999_999, date(2030, 2, 28)),
        ] {
            let parsed = parse_occurrence_id(&occurrence_id(series_id, d)).unwrap();
            assert_eq!(parsed.series_id, series_id);
            assert_eq!(parsed.date, Some(d));
        }
    }

    #[test]
    fn test_bare_integer_id() {
        let parsed = parse_occurrence_id("42").unwrap();
        assert_eq!(parsed.series_id, 42);
        assert_eq!(parsed.date, None);
    }

    #[test]
    fn test_malformed_ids() {
        for id in ["", "abc", "42-", "42-not-a-date", "-2025-01-06", "42-2025-13-40"] {
            assert!(
                matches!(
                    parse_occurrence_id(id),
                    Err(AgendaError::InvalidOccurrenceId(_))
                ),
                "expected {id:?} to be rejected"
            );
        }
    }
}

//! Recurring visit expansion.
//!
//! Expansion is a pure function of `(visit, range)`: stepping from the
//! series start by the rule's interval, it materializes the occurrences
//! whose dates fall inside the queried range. Re-running the same expansion
//! over overlapping ranges yields identical occurrence ids for the same
//! calendar dates.

use chrono::{Datelike, NaiveDate};

use crate::error::{AgendaError, Result};
use crate::schedule::identity::occurrence_id;
use crate::schedule::types::{
    DateRange, ExceptionKind, Frequency, Occurrence, RecurrenceEnd, RecurrenceRule, Visit,
    VisitException,
};

/// Default cap on occurrences produced by a single expansion.
pub const DEFAULT_MAX_OCCURRENCES: usize = 1000;

/// Expand a visit into concrete occurrences within an inclusive date range.
///
/// Non-recurring visits yield their single occurrence iff the start date is
/// in range. Recurring visits yield one occurrence per matching candidate
/// date, ordered and bounded by the rule's termination condition. Candidates
/// before `range.start` advance the cursor and consume `Count` slots but are
/// not yielded; a candidate past `range.end` stops expansion without
/// consuming a slot.
///
/// Expansions that would yield more than `max_occurrences` fail with
/// [`AgendaError::RangeTooLarge`].
pub fn expand(visit: &Visit, range: DateRange, max_occurrences: usize) -> Result<Vec<Occurrence>> {
    let Some(ref rule) = visit.recurrence else {
        if range.contains(visit.start_date()) {
            return Ok(vec![single_occurrence(visit)]);
        }
        return Ok(Vec::new());
    };

    let mut occurrences = Vec::new();
    // Candidates consumed against a Count termination, including candidates
    // that fall before the queried range.
    let mut consumed: u32 = 0;

    for candidate in CandidateDates::new(visit.start_date(), rule) {
        match rule.end {
            RecurrenceEnd::Until { date } if candidate > date => break,
            RecurrenceEnd::Count { count } if consumed >= count => break,
            _ => {}
        }
        if candidate > range.end {
            break;
        }
        consumed += 1;

        if candidate >= range.start {
            if occurrences.len() >= max_occurrences {
                return Err(AgendaError::RangeTooLarge {
                    max: max_occurrences,
                });
            }
            occurrences.push(recurring_occurrence(visit, candidate));
        }
    }

    Ok(occurrences)
}

/// Apply exception records to an expanded occurrence list: `Skip` removes
/// the matching date, `Override` rewrites occurrence fields in place.
pub fn apply_exceptions(
    mut occurrences: Vec<Occurrence>,
    exceptions: &[VisitException],
) -> Vec<Occurrence> {
    if exceptions.is_empty() {
        return occurrences;
    }

    occurrences.retain(|o| {
        !exceptions
            .iter()
            .any(|e| e.date == o.date() && matches!(e.kind, ExceptionKind::Skip))
    });

    for occurrence in &mut occurrences {
        for exception in exceptions {
            if exception.date == occurrence.date() {
                if let ExceptionKind::Override { ref changes } = exception.kind {
                    changes.apply_to_occurrence(occurrence);
                }
            }
        }
    }

    occurrences
}

fn single_occurrence(visit: &Visit) -> Occurrence {
    Occurrence {
        id: visit.id.to_string(),
        series_id: visit.id,
        start: visit.start,
        client_id: visit.client_id,
        price: visit.price,
        description: visit.description.clone(),
        status: visit.status,
        tags: visit.tags.clone(),
        recurring: false,
    }
}

fn recurring_occurrence(visit: &Visit, date: NaiveDate) -> Occurrence {
    Occurrence {
        id: occurrence_id(visit.id, date),
        series_id: visit.id,
        start: date.and_time(visit.start.time()),
        client_id: visit.client_id,
        price: visit.price,
        description: visit.description.clone(),
        status: visit.status,
        tags: visit.tags.clone(),
        recurring: true,
    }
}

// ============================================================================
// Candidate date generation
// ============================================================================

/// Infinite, strictly increasing stream of candidate dates for a rule.
/// Termination and range bounds are the caller's concern.
struct CandidateDates {
    state: CandidateState,
}

enum CandidateState {
    /// Daily stepping: current date, step in days.
    Daily { current: NaiveDate, step_days: i64 },
    /// Weekly stepping over a weekday set. `week_anchor` is the Sunday of
    /// the current week (weekday indices are Sunday-first on the wire).
    Weekly {
        series_start: NaiveDate,
        week_anchor: NaiveDate,
        weekdays: Vec<u8>,
        next_index: usize,
        step_weeks: i64,
    },
    /// Monthly stepping anchored on the series start's day-of-month, clamped
    /// per candidate month so Jan 31 yields Feb 28 then Mar 31 again.
    Monthly {
        series_start: NaiveDate,
        months_elapsed: u32,
        step_months: u32,
    },
    /// Yearly stepping anchored on the series start's month and day.
    Yearly {
        series_start: NaiveDate,
        years_elapsed: i32,
        step_years: i32,
    },
}

impl CandidateDates {
    fn new(series_start: NaiveDate, rule: &RecurrenceRule) -> Self {
        let state = match rule.frequency {
            Frequency::Daily => CandidateState::Daily {
                current: series_start,
                step_days: rule.interval as i64,
            },
            Frequency::Weekly => {
                let mut weekdays: Vec<u8> = if rule.weekdays.is_empty() {
                    // UI default: an empty weekday set means the series
                    // start's own weekday.
                    vec![weekday_index(series_start)]
                } else {
                    rule.weekdays.clone()
                };
                weekdays.sort_unstable();
                weekdays.dedup();

                let anchor = week_sunday(series_start);
                CandidateState::Weekly {
                    series_start,
                    week_anchor: anchor,
                    weekdays,
                    next_index: 0,
                    step_weeks: rule.interval as i64,
                }
            }
            Frequency::Monthly => CandidateState::Monthly {
                series_start,
                months_elapsed: 0,
                step_months: rule.interval,
            },
            Frequency::Yearly => CandidateState::Yearly {
                series_start,
                years_elapsed: 0,
                step_years: rule.interval as i32,
            },
        };
        Self { state }
    }
}

impl Iterator for CandidateDates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        match &mut self.state {
            CandidateState::Daily { current, step_days } => {
                let candidate = *current;
                *current += chrono::Duration::days(*step_days);
                Some(candidate)
            }
            CandidateState::Weekly {
                series_start,
                week_anchor,
                weekdays,
                next_index,
                step_weeks,
            } => loop {
                if *next_index >= weekdays.len() {
                    *week_anchor += chrono::Duration::weeks(*step_weeks);
                    *next_index = 0;
                }
                let candidate = *week_anchor + chrono::Duration::days(weekdays[*next_index] as i64);
                *next_index += 1;
                // Skip weekdays in the first week that precede the start.
                if candidate >= *series_start {
                    return Some(candidate);
                }
            },
            CandidateState::Monthly {
                series_start,
                months_elapsed,
                step_months,
            } => {
                let candidate = add_months_clamped(*series_start, *months_elapsed);
                *months_elapsed += *step_months;
                Some(candidate)
            }
            CandidateState::Yearly {
                series_start,
                years_elapsed,
                step_years,
            } => {
                let year = series_start.year() + *years_elapsed;
                *years_elapsed += *step_years;
                let day = series_start
                    .day()
                    .min(days_in_month(year, series_start.month()));
                Some(
                    NaiveDate::from_ymd_opt(year, series_start.month(), day)
                        .unwrap_or(*series_start),
                )
            }
        }
    }
}

/// Wire weekday index (0=Sunday..6=Saturday) for a date.
pub(crate) fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// The Sunday on or before a date.
fn week_sunday(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// Add whole months to a date, preserving the anchor day-of-month clamped to
/// the last valid day of the target month.
fn add_months_clamped(anchor: NaiveDate, months: u32) -> NaiveDate {
    let total = anchor.year() * 12 + anchor.month0() as i32 + months as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = anchor.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(anchor)
}

/// Get the number of days in a month.
fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

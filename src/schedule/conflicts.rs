//! Same-day scheduling conflict detection.
//!
//! The calendar warns when a candidate visit lands on a day that already
//! has occurrences. Detection is advisory at day granularity: time of day
//! is displayed but never suppresses the warning, and a conflict never
//! blocks submission.

use chrono::NaiveDate;

use crate::schedule::types::Occurrence;

/// Find the occurrences that share a calendar date with the candidate.
///
/// `occurrences` are pre-expanded instances covering the candidate's day
/// (typically from `VisitManager::occurrences_for_date`). Returned in start
/// order.
pub fn find_conflicts(candidate_date: NaiveDate, occurrences: &[Occurrence]) -> Vec<Occurrence> {
    let mut conflicts: Vec<Occurrence> = occurrences
        .iter()
        .filter(|o| o.date() == candidate_date)
        .cloned()
        .collect();
    conflicts.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    conflicts
}

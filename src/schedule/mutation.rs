//! Scoped mutation resolution.
//!
//! A client request to delete or edit an occurrence carries a scope: the
//! whole series, or just the one occurrence the user clicked. Resolution
//! translates `(occurrence id, scope)` into the concrete storage operation:
//! series-root mutations for `All`, exception-record writes for `Single` on
//! a recurring series. It never silently widens a `Single` request into an
//! `All` one.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{AgendaError, Result};
use crate::schedule::identity::ParsedOccurrenceId;
use crate::schedule::types::{Visit, VisitUpdate};

/// Mutation scope qualifier, as sent on the wire (`scope=single|all`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MutationScope {
    /// This occurrence only.
    #[default]
    Single,
    /// The entire series.
    All,
}

/// A concrete deletion operation resolved from a scoped request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOp {
    /// Delete the series root (removes all future expansions with it).
    DeleteSeries { series_id: i64 },
    /// Write a skip exception for one occurrence date.
    SkipOccurrence { series_id: i64, date: NaiveDate },
}

/// A concrete update operation resolved from a scoped request.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    /// Update the series root (changes all future expansions).
    UpdateSeries {
        series_id: i64,
        changes: VisitUpdate,
    },
    /// Write an override exception for one occurrence date.
    OverrideOccurrence {
        series_id: i64,
        date: NaiveDate,
        changes: VisitUpdate,
    },
}

/// Resolve a scoped delete against the series root it targets.
///
/// `explicit_date` is the wire `data_instancia` parameter; when absent, the
/// occurrence date embedded in the composite id is used. A `Single` delete
/// on a recurring series with no resolvable date fails with
/// `InvalidOccurrenceId`; one against a store without exception support
/// fails with `UnsupportedScope`.
pub fn resolve_delete(
    visit: &Visit,
    occurrence: &ParsedOccurrenceId,
    scope: MutationScope,
    explicit_date: Option<NaiveDate>,
    supports_exceptions: bool,
) -> Result<DeleteOp> {
    let series_id = occurrence.series_id;
    match scope {
        MutationScope::All => Ok(DeleteOp::DeleteSeries { series_id }),
        // Scope is irrelevant for a non-recurring visit.
        MutationScope::Single if !visit.is_recurring() => {
            Ok(DeleteOp::DeleteSeries { series_id })
        }
        MutationScope::Single => {
            let date = resolve_instance_date(occurrence, explicit_date)?;
            if !supports_exceptions {
                return Err(unsupported_single_scope(series_id));
            }
            Ok(DeleteOp::SkipOccurrence { series_id, date })
        }
    }
}

/// Resolve a scoped edit. Same scope rules as [`resolve_delete`].
pub fn resolve_edit(
    visit: &Visit,
    occurrence: &ParsedOccurrenceId,
    changes: VisitUpdate,
    scope: MutationScope,
    explicit_date: Option<NaiveDate>,
    supports_exceptions: bool,
) -> Result<EditOp> {
    let series_id = occurrence.series_id;
    match scope {
        MutationScope::All => Ok(EditOp::UpdateSeries { series_id, changes }),
        MutationScope::Single if !visit.is_recurring() => {
            Ok(EditOp::UpdateSeries { series_id, changes })
        }
        MutationScope::Single => {
            let date = resolve_instance_date(occurrence, explicit_date)?;
            if !supports_exceptions {
                return Err(unsupported_single_scope(series_id));
            }
            Ok(EditOp::OverrideOccurrence {
                series_id,
                date,
                changes,
            })
        }
    }
}

fn resolve_instance_date(
    occurrence: &ParsedOccurrenceId,
    explicit_date: Option<NaiveDate>,
) -> Result<NaiveDate> {
    explicit_date.or(occurrence.date).ok_or_else(|| {
        AgendaError::InvalidOccurrenceId(format!(
            "single-occurrence mutation on series {} requires an occurrence date",
            occurrence.series_id
        ))
    })
}

fn unsupported_single_scope(series_id: i64) -> AgendaError {
    AgendaError::UnsupportedScope(format!(
        "store has no exception records; cannot mutate a single occurrence of series {series_id}"
    ))
}

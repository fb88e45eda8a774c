//! Visit storage and management.
//!
//! `VisitManager` is the entry point for the engine: CRUD over a
//! [`VisitStore`], range queries that expand recurring series with their
//! exception records applied, same-day conflict checks, and the scoped
//! delete/edit operations the calendar client issues.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::config::Config;
use crate::error::{AgendaError, Result};
use crate::schedule::conflicts::find_conflicts;
use crate::schedule::expand::{apply_exceptions, expand};
use crate::schedule::identity::parse_occurrence_id;
use crate::schedule::mutation::{
    resolve_delete, resolve_edit, DeleteOp, EditOp, MutationScope,
};
use crate::schedule::types::{
    DateRange, Occurrence, ScheduleStats, Visit, VisitException, VisitUpdate,
};
use crate::storage::VisitStore;

/// Manager for visits, providing storage, expansion, and scoped mutation.
pub struct VisitManager<S: VisitStore> {
    store: Arc<S>,
    max_occurrences: usize,
}

impl<S: VisitStore> VisitManager<S> {
    /// Create a new manager with default expansion limits.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, &Config::default())
    }

    /// Create a manager with limits taken from configuration.
    pub fn with_config(store: Arc<S>, config: &Config) -> Self {
        Self {
            store,
            max_occurrences: config.expansion.max_occurrences,
        }
    }

    // ========================================================================
    // CRUD Operations
    // ========================================================================

    /// Validate and create a visit. The store assigns the series id.
    pub async fn create(&self, visit: Visit) -> Result<Visit> {
        visit.validate()?;
        let visit = self.store.create_visit(visit).await?;
        debug!(id = visit.id, recurring = visit.is_recurring(), "Created visit");
        Ok(visit)
    }

    /// Get a series root by id.
    pub async fn get(&self, id: i64) -> Result<Option<Visit>> {
        self.store.get_visit(id).await
    }

    /// List all series roots, ordered by start.
    pub async fn list(&self) -> Result<Vec<Visit>> {
        self.store.list_visits().await
    }

    // ========================================================================
    // Expansion Queries
    // ========================================================================

    /// Expand every stored visit over an inclusive date range, applying
    /// exception records, and return the merged occurrences in start order.
    pub async fn occurrences_in_range(&self, range: DateRange) -> Result<Vec<Occurrence>> {
        let visits = self.store.list_visits().await?;

        let mut occurrences = Vec::new();
        for visit in &visits {
            let mut expanded = expand(visit, range, self.max_occurrences)?;
            if visit.is_recurring() {
                let exceptions = self.store.exceptions_for_series(visit.id).await?;
                expanded = apply_exceptions(expanded, &exceptions);
            }
            occurrences.extend(expanded);
        }

        occurrences.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        Ok(occurrences)
    }

    /// Expanded occurrences for a single calendar day.
    pub async fn occurrences_for_date(&self, date: NaiveDate) -> Result<Vec<Occurrence>> {
        self.occurrences_in_range(DateRange::day(date)).await
    }

    /// Expand one series over a range, exceptions applied. Fails with
    /// `SeriesNotFound` for an unknown id.
    pub async fn expand_series(&self, series_id: i64, range: DateRange) -> Result<Vec<Occurrence>> {
        let visit = self
            .store
            .get_visit(series_id)
            .await?
            .ok_or(AgendaError::SeriesNotFound(series_id))?;

        let expanded = expand(&visit, range, self.max_occurrences)?;
        let exceptions = self.store.exceptions_for_series(series_id).await?;
        Ok(apply_exceptions(expanded, &exceptions))
    }

    // ========================================================================
    // Conflict Detection
    // ========================================================================

    /// Advisory list of occurrences already scheduled on the candidate's
    /// day. Never blocks anything; the caller surfaces it as a warning.
    pub async fn check_conflicts(&self, candidate_date: NaiveDate) -> Result<Vec<Occurrence>> {
        let same_day = self.occurrences_for_date(candidate_date).await?;
        Ok(find_conflicts(candidate_date, &same_day))
    }

    // ========================================================================
    // Scoped Mutations
    // ========================================================================

    /// Delete an occurrence or its whole series.
    ///
    /// `occurrence_id` is either a bare series id (`"42"`) or a composite
    /// instance id (`"42-2025-01-13"`); `explicit_date` is the wire
    /// `data_instancia` parameter. Returns the concrete operation that was
    /// applied.
    pub async fn delete(
        &self,
        occurrence_id: &str,
        scope: MutationScope,
        explicit_date: Option<NaiveDate>,
    ) -> Result<DeleteOp> {
        let parsed = parse_occurrence_id(occurrence_id)?;
        let visit = self
            .store
            .get_visit(parsed.series_id)
            .await?
            .ok_or(AgendaError::SeriesNotFound(parsed.series_id))?;

        let op = resolve_delete(
            &visit,
            &parsed,
            scope,
            explicit_date,
            self.store.supports_exceptions(),
        )?;

        match op {
            DeleteOp::DeleteSeries { series_id } => {
                self.store.delete_visit(series_id).await?;
                debug!(series_id, "Deleted series root");
            }
            DeleteOp::SkipOccurrence { series_id, date } => {
                self.store
                    .put_exception(VisitException::skip(series_id, date))
                    .await?;
                debug!(series_id, %date, "Suppressed single occurrence");
            }
        }
        Ok(op)
    }

    /// Edit an occurrence or its whole series. Returns the concrete
    /// operation that was applied.
    pub async fn edit(
        &self,
        occurrence_id: &str,
        changes: VisitUpdate,
        scope: MutationScope,
        explicit_date: Option<NaiveDate>,
    ) -> Result<EditOp> {
        let parsed = parse_occurrence_id(occurrence_id)?;
        let visit = self
            .store
            .get_visit(parsed.series_id)
            .await?
            .ok_or(AgendaError::SeriesNotFound(parsed.series_id))?;

        // A replacement rule is validated against the start it will apply to.
        if let Some(ref rule) = changes.recurrence {
            let start = changes.start.unwrap_or(visit.start);
            rule.validate(start.date())?;
        }

        let op = resolve_edit(
            &visit,
            &parsed,
            changes,
            scope,
            explicit_date,
            self.store.supports_exceptions(),
        )?;

        match op {
            EditOp::UpdateSeries {
                series_id,
                ref changes,
            } => {
                self.store.update_visit(series_id, changes.clone()).await?;
                debug!(series_id, "Updated series root");
            }
            EditOp::OverrideOccurrence {
                series_id,
                date,
                ref changes,
            } => {
                self.store
                    .put_exception(VisitException::override_with(
                        series_id,
                        date,
                        changes.clone(),
                    ))
                    .await?;
                debug!(series_id, %date, "Overrode single occurrence");
            }
        }
        Ok(op)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Get statistics about the underlying store.
    pub async fn stats(&self) -> Result<ScheduleStats> {
        self.store.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::types::{RecurrenceRule, VisitStatus};
    use crate::storage::EmbeddedVisitStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn manager() -> VisitManager<EmbeddedVisitStore> {
        VisitManager::new(Arc::new(EmbeddedVisitStore::new()))
    }

    fn weekly_visit() -> Visit {
        Visit::new(date(2025, 1, 6).and_hms_opt(10, 0, 0).unwrap())
            .with_price(100.0)
            .with_recurrence(RecurrenceRule::weekly_on([1]).times(3))
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_rule() {
        let manager = manager();
        let visit = Visit::new(date(2025, 1, 6).and_hms_opt(10, 0, 0).unwrap())
            .with_recurrence(RecurrenceRule::daily().every(0));

        assert!(matches!(
            manager.create(visit).await,
            Err(AgendaError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_range_query_merges_series() {
        let manager = manager();
        manager.create(weekly_visit()).await.unwrap();
        manager
            .create(Visit::new(date(2025, 1, 8).and_hms_opt(14, 0, 0).unwrap()))
            .await
            .unwrap();

        let occurrences = manager
            .occurrences_in_range(DateRange::new(date(2025, 1, 1), date(2025, 2, 1)))
            .await
            .unwrap();

        let ids: Vec<&str> = occurrences.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["1-2025-01-06", "2", "1-2025-01-13", "1-2025-01-20"]);
    }

    #[tokio::test]
    async fn test_delete_whole_series() {
        let manager = manager();
        let visit = manager.create(weekly_visit()).await.unwrap();

        // Deleting via any occurrence id targets the root.
        let op = manager
            .delete("1-2025-01-13", MutationScope::All, None)
            .await
            .unwrap();
        assert_eq!(op, DeleteOp::DeleteSeries { series_id: visit.id });
        assert!(manager.get(visit.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_single_occurrence_leaves_series() {
        let manager = manager();
        let visit = manager.create(weekly_visit()).await.unwrap();

        let op = manager
            .delete("1-2025-01-13", MutationScope::Single, None)
            .await
            .unwrap();
        assert_eq!(
            op,
            DeleteOp::SkipOccurrence {
                series_id: visit.id,
                date: date(2025, 1, 13)
            }
        );

        let remaining = manager
            .expand_series(visit.id, DateRange::new(date(2025, 1, 1), date(2025, 2, 1)))
            .await
            .unwrap();
        let dates: Vec<NaiveDate> = remaining.iter().map(|o| o.date()).collect();
        assert_eq!(dates, vec![date(2025, 1, 6), date(2025, 1, 20)]);
        assert!(manager.get(visit.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_single_edit_overrides_one_date() {
        let manager = manager();
        let visit = manager.create(weekly_visit()).await.unwrap();

        let changes = VisitUpdate {
            price: Some(80.0),
            status: Some(VisitStatus::Paid),
            ..Default::default()
        };
        manager
            .edit("1", changes, MutationScope::Single, Some(date(2025, 1, 20)))
            .await
            .unwrap();

        let occurrences = manager
            .expand_series(visit.id, DateRange::new(date(2025, 1, 1), date(2025, 2, 1)))
            .await
            .unwrap();
        assert_eq!(occurrences.len(), 3);
        assert_eq!(occurrences[0].price, 100.0);
        assert_eq!(occurrences[2].price, 80.0);
        assert_eq!(occurrences[2].status, VisitStatus::Paid);

        // The series root is untouched.
        let root = manager.get(visit.id).await.unwrap().unwrap();
        assert_eq!(root.price, 100.0);
    }

    #[tokio::test]
    async fn test_series_edit_changes_all_occurrences() {
        let manager = manager();
        let visit = manager.create(weekly_visit()).await.unwrap();

        let changes = VisitUpdate {
            price: Some(90.0),
            ..Default::default()
        };
        manager
            .edit("1-2025-01-13", changes, MutationScope::All, None)
            .await
            .unwrap();

        let occurrences = manager
            .expand_series(visit.id, DateRange::new(date(2025, 1, 1), date(2025, 2, 1)))
            .await
            .unwrap();
        assert!(occurrences.iter().all(|o| o.price == 90.0));
    }

    #[tokio::test]
    async fn test_unknown_series() {
        let manager = manager();
        assert!(matches!(
            manager.delete("99", MutationScope::All, None).await,
            Err(AgendaError::SeriesNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_single_scope_without_exception_support() {
        let manager = VisitManager::new(Arc::new(EmbeddedVisitStore::without_exceptions()));
        manager.create(weekly_visit()).await.unwrap();

        let result = manager
            .delete("1-2025-01-13", MutationScope::Single, None)
            .await;
        assert!(matches!(result, Err(AgendaError::UnsupportedScope(_))));

        // Whole-series operations still work.
        assert!(manager.delete("1", MutationScope::All, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_conflict_warning() {
        let manager = manager();
        manager.create(weekly_visit()).await.unwrap();

        let conflicts = manager.check_conflicts(date(2025, 1, 13)).await.unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, "1-2025-01-13");

        assert!(manager
            .check_conflicts(date(2025, 1, 14))
            .await
            .unwrap()
            .is_empty());
    }
}

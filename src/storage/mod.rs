//! Visit storage trait and implementations.
//!
//! The store persists series roots and the exception records that modify
//! single occurrences. Expansion never touches the store directly; it runs
//! over visits and exceptions the caller already fetched.

mod memory;

pub use memory::EmbeddedVisitStore;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::schedule::types::{ScheduleStats, Visit, VisitException, VisitUpdate};

/// Trait for visit storage backends.
#[async_trait]
pub trait VisitStore: Send + Sync {
    // ========================================================================
    // Visit Operations
    // ========================================================================

    /// Create a new visit, assigning its integer id. Returns the stored
    /// visit with the id filled in.
    async fn create_visit(&self, visit: Visit) -> Result<Visit>;

    /// Get a visit by id.
    async fn get_visit(&self, id: i64) -> Result<Option<Visit>>;

    /// Apply an update to a visit. Fails if the visit does not exist.
    async fn update_visit(&self, id: i64, update: VisitUpdate) -> Result<Visit>;

    /// Delete a visit by id. Returns whether it existed. Exception records
    /// for the series are removed with it.
    async fn delete_visit(&self, id: i64) -> Result<bool>;

    /// List all stored visits, ordered by start.
    async fn list_visits(&self) -> Result<Vec<Visit>>;

    // ========================================================================
    // Exception Records
    // ========================================================================

    /// Whether this backend stores per-occurrence exception records.
    /// Single-occurrence mutations on recurring series require it.
    fn supports_exceptions(&self) -> bool;

    /// Insert or replace the exception for `(series_id, date)`.
    async fn put_exception(&self, exception: VisitException) -> Result<VisitException>;

    /// All exceptions for a series.
    async fn exceptions_for_series(&self, series_id: i64) -> Result<Vec<VisitException>>;

    /// Remove the exception for one occurrence date, if any.
    async fn remove_exception(&self, series_id: i64, date: NaiveDate) -> Result<bool>;

    // ========================================================================
    // Statistics and Maintenance
    // ========================================================================

    /// Get statistics about the store.
    async fn stats(&self) -> Result<ScheduleStats>;

    /// Clear all data from the store.
    async fn clear(&self) -> Result<()>;
}

//! Scheduling module: visits, recurrence, and scoped mutation.
//!
//! This module provides the recurring visit engine:
//!
//! - **Visits**: series roots with price, status, client, tags, and an
//!   optional recurrence rule
//! - **Expansion**: pure, deterministic materialization of occurrences over
//!   a date range
//! - **Identity**: stable composite ids (`"{series_id}-{date}"`) for
//!   virtual occurrences
//! - **Scoped mutation**: delete/edit this-occurrence-only vs whole-series,
//!   backed by exception records
//! - **Conflict detection**: advisory same-day warnings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    VisitManager                             │
//! │  - CRUD and range queries                                   │
//! │  - scoped delete/edit entry points                          │
//! │  - conflict checks                                          │
//! └──────────────┬────────────────────────────┬─────────────────┘
//!                │                            │
//!                ▼                            ▼
//! ┌──────────────────────────┐  ┌─────────────────────────────┐
//! │  expand / identity /     │  │        VisitStore           │
//! │  mutation (pure logic)   │  │  (visits + exception        │
//! │                          │  │   records)                  │
//! └──────────────────────────┘  └─────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use agenda::{DateRange, MutationScope, RecurrenceRule, Visit, VisitManager};
//! use agenda::storage::EmbeddedVisitStore;
//! use std::sync::Arc;
//!
//! let manager = VisitManager::new(Arc::new(EmbeddedVisitStore::new()));
//!
//! // Create a weekly series.
//! let visit = Visit::new(start)
//!     .with_price(150.0)
//!     .with_recurrence(RecurrenceRule::weekly_on([1]).times(10));
//! let visit = manager.create(visit).await?;
//!
//! // Expand a month of occurrences.
//! let occurrences = manager.occurrences_in_range(range).await?;
//!
//! // Delete one occurrence without touching the rest of the series.
//! manager.delete("42-2025-01-13", MutationScope::Single, None).await?;
//! ```

pub mod conflicts;
pub mod expand;
pub mod identity;
pub mod mutation;
pub mod types;
mod visits;

pub use conflicts::find_conflicts;
pub use expand::{apply_exceptions, expand, DEFAULT_MAX_OCCURRENCES};
pub use identity::{occurrence_id, parse_occurrence_id, ParsedOccurrenceId};
pub use mutation::{resolve_delete, resolve_edit, DeleteOp, EditOp, MutationScope};
pub use types::{
    DateRange, ExceptionKind, Frequency, Occurrence, RecurrenceEnd, RecurrenceRule, ScheduleStats,
    Tag, Visit, VisitException, VisitStatus, VisitUpdate,
};
pub use visits::VisitManager;

//! Agenda: Recurring Visit Engine
//!
//! The scheduling core behind a visit-booking calendar: recurrence rule
//! validation, occurrence expansion, stable virtual-occurrence identity,
//! scoped series mutation (this occurrence vs the whole series), and
//! advisory same-day conflict detection.

pub mod config;
pub mod error;
pub mod payload;
pub mod schedule;
pub mod storage;

pub use config::Config;
pub use error::{AgendaError, ConfigError, Result, StorageError, ValidationError};
pub use payload::{DeleteVisitRequest, RecurrencePayload, VisitPayload};
pub use schedule::{
    apply_exceptions, expand, find_conflicts, occurrence_id, parse_occurrence_id, DateRange,
    DeleteOp, EditOp, ExceptionKind, Frequency, MutationScope, Occurrence, ParsedOccurrenceId,
    RecurrenceEnd, RecurrenceRule, ScheduleStats, Tag, Visit, VisitException, VisitManager,
    VisitStatus, VisitUpdate, DEFAULT_MAX_OCCURRENCES,
};
pub use storage::{EmbeddedVisitStore, VisitStore};

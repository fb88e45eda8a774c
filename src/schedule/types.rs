//! Core types for visit scheduling and recurrence.
//!
//! This module defines the series root (`Visit`), the validated
//! `RecurrenceRule`, derived `Occurrence` instances, and the exception
//! records that suppress or override single occurrences of a series.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ValidationError;

// ============================================================================
// Visit (series root)
// ============================================================================

/// A scheduled visit. A visit with a recurrence rule is a series root from
/// which concrete occurrences are expanded; without one it is a single,
/// non-recurring appointment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Visit {
    /// Integer identifier, assigned by the store at creation. Stable for the
    /// lifetime of the series.
    pub id: i64,
    /// Referenced client, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    /// Start of the visit, zone-less local time (wire format
    /// `YYYY-MM-DDTHH:mm`).
    pub start: NaiveDateTime,
    /// Price charged for the visit.
    pub price: f64,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Payment/visit status.
    pub status: VisitStatus,
    /// Recurrence rule for recurring series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    /// Attached tags.
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Attachment references (URLs or storage keys).
    #[serde(default)]
    pub attachments: Vec<String>,
    /// When the visit was created.
    pub created_at: DateTime<Utc>,
    /// When the visit was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Visit {
    /// Create a new visit. The id is assigned by the store at creation.
    pub fn new(start: NaiveDateTime) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            client_id: None,
            start,
            price: 0.0,
            description: String::new(),
            status: VisitStatus::PendingVisit,
            recurrence: None,
            tags: Vec::new(),
            attachments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a visit with a specific id.
    pub fn with_id(id: i64, start: NaiveDateTime) -> Self {
        Self {
            id,
            ..Self::new(start)
        }
    }

    /// Set the client reference.
    pub fn with_client(mut self, client_id: i64) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Set the price.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: VisitStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the recurrence rule.
    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Add an attachment reference.
    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachments.push(attachment.into());
        self
    }

    /// Whether this visit is a recurring series root.
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// The calendar date of the series start.
    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Validate the visit's recurrence rule against its start date.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref rule) = self.recurrence {
            rule.validate(self.start_date())?;
        }
        Ok(())
    }
}

/// Visit status, with the exhaustive stable wire strings the client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum VisitStatus {
    /// Visit not yet performed.
    #[default]
    #[serde(rename = "pendente_visita")]
    PendingVisit,
    /// Visit done, payment outstanding.
    #[serde(rename = "pendente_recebimento")]
    PendingPayment,
    /// Paid in full.
    #[serde(rename = "pago")]
    Paid,
    /// Cancelled.
    #[serde(rename = "cancelado")]
    Cancelled,
}

impl VisitStatus {
    /// The stable wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::PendingVisit => "pendente_visita",
            VisitStatus::PendingPayment => "pendente_recebimento",
            VisitStatus::Paid => "pago",
            VisitStatus::Cancelled => "cancelado",
        }
    }

    /// Parse a wire string into a status.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "pendente_visita" => Ok(VisitStatus::PendingVisit),
            "pendente_recebimento" => Ok(VisitStatus::PendingPayment),
            "pago" => Ok(VisitStatus::Paid),
            "cancelado" => Ok(VisitStatus::Cancelled),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// A tag attached to visits. Many-to-many; uniqueness on `id` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

impl Tag {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

// ============================================================================
// Recurrence
// ============================================================================

/// Recurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Termination condition for a recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecurrenceEnd {
    /// The series never ends (bounded only by the query range).
    Never,
    /// The series ends on a given date (inclusive).
    Until { date: NaiveDate },
    /// The series emits a fixed number of occurrences.
    Count { count: u32 },
}

/// A validated recurrence rule.
///
/// Rules are checked once with [`RecurrenceRule::validate`] when they cross
/// the boundary; expansion assumes a valid rule and never re-validates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecurrenceRule {
    /// Frequency unit for the interval step.
    pub frequency: Frequency,
    /// Step between occurrences, in units of `frequency`. Always >= 1.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Weekday indices (0=Sunday..6=Saturday). Meaningful only for weekly
    /// rules; empty defaults to the series start's own weekday.
    #[serde(default)]
    pub weekdays: Vec<u8>,
    /// Termination condition.
    #[serde(default = "default_end")]
    pub end: RecurrenceEnd,
}

fn default_interval() -> u32 {
    1
}

fn default_end() -> RecurrenceEnd {
    RecurrenceEnd::Never
}

impl RecurrenceRule {
    /// Create a daily rule.
    pub fn daily() -> Self {
        Self {
            frequency: Frequency::Daily,
            interval: 1,
            weekdays: Vec::new(),
            end: RecurrenceEnd::Never,
        }
    }

    /// Create a weekly rule on the series start's own weekday.
    pub fn weekly() -> Self {
        Self {
            frequency: Frequency::Weekly,
            interval: 1,
            weekdays: Vec::new(),
            end: RecurrenceEnd::Never,
        }
    }

    /// Create a weekly rule on specific weekdays (0=Sunday..6=Saturday).
    pub fn weekly_on(days: impl IntoIterator<Item = u8>) -> Self {
        Self {
            frequency: Frequency::Weekly,
            interval: 1,
            weekdays: days.into_iter().collect(),
            end: RecurrenceEnd::Never,
        }
    }

    /// Create a monthly rule.
    pub fn monthly() -> Self {
        Self {
            frequency: Frequency::Monthly,
            interval: 1,
            weekdays: Vec::new(),
            end: RecurrenceEnd::Never,
        }
    }

    /// Create a yearly rule.
    pub fn yearly() -> Self {
        Self {
            frequency: Frequency::Yearly,
            interval: 1,
            weekdays: Vec::new(),
            end: RecurrenceEnd::Never,
        }
    }

    /// Set the interval.
    pub fn every(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    /// End the series on a date (inclusive).
    pub fn until(mut self, date: NaiveDate) -> Self {
        self.end = RecurrenceEnd::Until { date };
        self
    }

    /// End the series after a fixed number of occurrences.
    pub fn times(mut self, count: u32) -> Self {
        self.end = RecurrenceEnd::Count { count };
        self
    }

    /// Validate this rule against the series start date.
    pub fn validate(&self, series_start: NaiveDate) -> Result<(), ValidationError> {
        if self.interval < 1 {
            return Err(ValidationError::InvalidInterval(self.interval));
        }
        for &day in &self.weekdays {
            if day > 6 {
                return Err(ValidationError::InvalidWeekday(day.to_string()));
            }
        }
        match self.end {
            RecurrenceEnd::Count { count } if count < 1 => {
                Err(ValidationError::InvalidCount(count))
            }
            RecurrenceEnd::Until { date } if date < series_start => {
                Err(ValidationError::EndBeforeStart {
                    start: series_start,
                    end: date,
                })
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Occurrence (derived, not separately persisted)
// ============================================================================

/// One concrete calendar instance of a visit.
///
/// Occurrences of a recurring series are virtual: they carry a composite id
/// (`"{series_id}-{date}"`) and inherit everything from the series root
/// except the start, which is advanced per the rule. Two expansions of the
/// same series over overlapping ranges yield identical ids for the same
/// dates.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Occurrence {
    /// Stable occurrence identity. Bare `"{series_id}"` for non-recurring
    /// visits, `"{series_id}-{ISO date}"` for recurring instances.
    pub id: String,
    /// The series root this occurrence belongs to.
    pub series_id: i64,
    /// Start of this instance.
    pub start: NaiveDateTime,
    /// Inherited from the series root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    pub status: VisitStatus,
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Whether this instance comes from a recurring series.
    pub recurring: bool,
}

impl Occurrence {
    /// The calendar date of this occurrence.
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }
}

// ============================================================================
// Exception records
// ============================================================================

/// How an exception affects its occurrence date.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExceptionKind {
    /// Suppress the occurrence entirely (single-occurrence delete).
    Skip,
    /// Override fields of the occurrence (single-occurrence edit).
    Override { changes: VisitUpdate },
}

/// A per-date override/suppression entry for one occurrence of a series.
///
/// Keyed by `(series_id, date)`; a later write for the same key replaces the
/// earlier one.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VisitException {
    /// Unique identifier for the record.
    pub id: String,
    /// The series this exception applies to.
    pub series_id: i64,
    /// The occurrence date being suppressed or overridden.
    pub date: NaiveDate,
    /// What the exception does.
    pub kind: ExceptionKind,
    /// When the exception was created.
    pub created_at: DateTime<Utc>,
}

impl VisitException {
    /// Create a suppression for one occurrence date.
    pub fn skip(series_id: i64, date: NaiveDate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            series_id,
            date,
            kind: ExceptionKind::Skip,
            created_at: Utc::now(),
        }
    }

    /// Create an override for one occurrence date.
    pub fn override_with(series_id: i64, date: NaiveDate, changes: VisitUpdate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            series_id,
            date,
            kind: ExceptionKind::Override { changes },
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Partial updates
// ============================================================================

/// Update operations for a visit. Used both for whole-series edits and as
/// the payload of a single-occurrence override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VisitUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VisitStatus>,
    /// New recurrence rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    /// Clear the recurrence rule, turning the series into a single visit.
    #[serde(default)]
    pub clear_recurrence: bool,
    /// Tags to add.
    #[serde(default)]
    pub add_tags: Vec<Tag>,
    /// Tag ids to remove.
    #[serde(default)]
    pub remove_tags: Vec<i64>,
    /// Attachment references to add.
    #[serde(default)]
    pub add_attachments: Vec<String>,
}

impl VisitUpdate {
    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.client_id.is_none()
            && self.start.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.recurrence.is_none()
            && !self.clear_recurrence
            && self.add_tags.is_empty()
            && self.remove_tags.is_empty()
            && self.add_attachments.is_empty()
    }

    /// Apply this update to a visit.
    pub fn apply_to(&self, visit: &mut Visit) {
        if let Some(client_id) = self.client_id {
            visit.client_id = Some(client_id);
        }
        if let Some(start) = self.start {
            visit.start = start;
        }
        if let Some(price) = self.price {
            visit.price = price;
        }
        if let Some(ref description) = self.description {
            visit.description = description.clone();
        }
        if let Some(status) = self.status {
            visit.status = status;
        }
        if let Some(ref recurrence) = self.recurrence {
            visit.recurrence = Some(recurrence.clone());
        }
        if self.clear_recurrence {
            visit.recurrence = None;
        }
        for tag in &self.add_tags {
            if !visit.tags.iter().any(|t| t.id == tag.id) {
                visit.tags.push(tag.clone());
            }
        }
        for tag_id in &self.remove_tags {
            visit.tags.retain(|t| t.id != *tag_id);
        }
        for attachment in &self.add_attachments {
            if !visit.attachments.contains(attachment) {
                visit.attachments.push(attachment.clone());
            }
        }
        visit.updated_at = Utc::now();
    }

    /// Apply the occurrence-visible parts of this update to an expanded
    /// occurrence. Start updates keep the occurrence's own date and move the
    /// time of day only; recurrence changes do not apply to one instance.
    pub fn apply_to_occurrence(&self, occurrence: &mut Occurrence) {
        if let Some(client_id) = self.client_id {
            occurrence.client_id = Some(client_id);
        }
        if let Some(start) = self.start {
            occurrence.start = occurrence.date().and_time(start.time());
        }
        if let Some(price) = self.price {
            occurrence.price = price;
        }
        if let Some(ref description) = self.description {
            occurrence.description = description.clone();
        }
        if let Some(status) = self.status {
            occurrence.status = status;
        }
        for tag in &self.add_tags {
            if !occurrence.tags.iter().any(|t| t.id == tag.id) {
                occurrence.tags.push(tag.clone());
            }
        }
        for tag_id in &self.remove_tags {
            occurrence.tags.retain(|t| t.id != *tag_id);
        }
    }
}

// ============================================================================
// Date ranges and statistics
// ============================================================================

/// An inclusive calendar date range for expansion queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A single-day range.
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let start = date.with_day(1).unwrap_or(date);
        let end = if start.month() == 12 {
            NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
        }
        .and_then(|d| d.pred_opt())
        .unwrap_or(date);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Statistics about stored visits.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScheduleStats {
    /// Total persisted visits (series roots and single visits).
    pub total_visits: usize,
    /// Recurring series count.
    pub recurring_series: usize,
    /// Visits by status wire string.
    pub by_status: HashMap<String, usize>,
    /// Stored exception records.
    pub exceptions: usize,
}
